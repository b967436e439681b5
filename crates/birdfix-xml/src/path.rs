#![forbid(unsafe_code)]

use std::fmt;

/// Position of an element in the tree: the child-node indices leading from
/// the root element down to it. The root element has the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementPath(Vec<usize>);

impl ElementPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Path of the child node at `index`.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Split into the parent path and this element's index within it.
    pub fn split_last(&self) -> Option<(ElementPath, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((ElementPath(parent.to_vec()), *last))
    }
}

impl From<Vec<usize>> for ElementPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}
