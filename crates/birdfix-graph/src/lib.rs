#![forbid(unsafe_code)]

//! Identifier analysis for BIRD report XML: classification, reference
//! scanning and the declared-versus-referenced graph.

pub mod classify;
pub mod graph;
pub mod scan;

pub use graph::{analyze, Analysis, DeclaringElement, GraphBuilder};
