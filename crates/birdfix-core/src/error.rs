#![forbid(unsafe_code)]

use std::fmt;

/// Stage of the analyze/repair pipeline, carried by [`Error::Repair`] so the
/// caller can say which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Analyze,
    Duplicates,
    NullCandidates,
    UnusedPrompts,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parse => "parse",
            Phase::Analyze => "analyze",
            Phase::Duplicates => "duplicates",
            Phase::NullCandidates => "null-candidates",
            Phase::UnusedPrompts => "unused-prompts",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the birdfix report repair tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{phase} failed: {message}")]
    Repair { phase: Phase, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error with the pipeline phase it surfaced in.
    ///
    /// Malformed input keeps its own variant so callers can tell a bad upload
    /// apart from an internal failure.
    pub fn in_phase(self, phase: Phase) -> Error {
        match self {
            Error::XmlParse(_) | Error::Repair { .. } => self,
            other => Error::Repair {
                phase,
                message: other.to_string(),
            },
        }
    }

    /// The phase this error was attributed to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Repair { phase, .. } => Some(*phase),
            Error::XmlParse(_) => Some(Phase::Parse),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
