//! Organize Keyence microscope exports by well condition.
//!
//! A forward run reads a well-condition YAML, maps every `XY<n>` folder of a
//! group folder to a plate well, and moves each image into a directory named
//! after its condition. Every move is recorded in a manifest so the run can
//! be reversed exactly.

pub mod commands;
pub mod error;
pub mod fs;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod wells;

pub use error::{KfmError, Result};
