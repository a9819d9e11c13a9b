//! Generation runs
//!
//! This module provides the [`Generator`] driver used by the CLI and by
//! build scripts: it takes a description file through every stage and
//! writes the rendered artifacts, leaving unchanged files untouched.

pub mod generator;

pub use generator::{
    write_artifacts, Analysis, Compilation, GenerateReport, Generator, WriteReport,
};
