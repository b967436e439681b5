#![forbid(unsafe_code)]

pub use birdfix_core as core;
pub use birdfix_xml as xml;
pub use birdfix_graph as graph;
pub use birdfix_repair as repair;
