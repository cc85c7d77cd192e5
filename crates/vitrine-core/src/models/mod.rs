//! Data models for the upload pipeline
//!
//! Profiles configure a class of upload, the remaining types describe one file
//! as it moves from selection to compressed output.

mod crop;
mod image;
mod profile;
mod stats;

pub use crop::*;
pub use image::*;
pub use profile::*;
pub use stats::*;
