#![forbid(unsafe_code)]

//! Owned, mutable XML document model for BIRD report repair.
//!
//! Input is validated and walked with `roxmltree`, then copied into an owned
//! element tree that the repair passes can edit in place and write back out.

pub mod document;
pub mod path;
pub mod writer;

pub use document::{Attribute, Document, Element, Node, NsDecl};
pub use path::ElementPath;

/// Return roxmltree parsing options that allow DTD.
///
/// Reports exported by some VA releases carry an internal DTD subset;
/// roxmltree never fetches external entities, so allowing it is safe.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
