//! Asset I/O: input scanning, artifact writing, cleaning, minification.

pub mod clean;
pub mod minify;
pub mod scan;
pub mod writer;

pub use clean::clean;
pub use writer::ArtifactWriter;
