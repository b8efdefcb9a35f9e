//! Shared helpers: paths, hashing, process execution.

pub mod exec;
pub mod fs;
pub mod hash;
pub mod mime;
pub mod path;
pub mod plural;
