//! Shared utilities.

pub mod exec;
pub mod mime;
pub mod path;
pub mod plural;

pub use plural::plural_count;
