#![forbid(unsafe_code)]

//! Shared types for the birdfix BIRD report repair tools: the error
//! taxonomy, dialect vocabulary and repair configuration.

pub mod config;
pub mod dialect;
pub mod error;

pub use config::RepairConfig;
pub use error::{Error, Phase, Result};
