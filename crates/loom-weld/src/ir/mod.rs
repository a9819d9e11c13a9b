//! Intermediate Representation (IR) for interface descriptions
//!
//! This module provides the data model a description is parsed into:
//! classes and their members, free functions, converters, and the
//! module-level configuration that ties them together.

pub mod types;
pub mod symbol;
pub mod module;

pub use types::*;
pub use symbol::*;
pub use module::*;
