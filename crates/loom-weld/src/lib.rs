//! Loom-Weld: interface-description compiler
//!
//! Reads a description of a native library's classes, members and free
//! functions and emits the glue sources that register them with a
//! reflection runtime for a host environment (Node.js, Python, or plain
//! registration).
//!
//! # Architecture
//!
//! - `ir`: the model a description is parsed into
//! - `parse`: YAML/JSON documents and the block DSL
//! - `validate`: duplicate names, unresolved bases, inheritance cycles
//! - `overload`: emission names and disambiguating casts for overloads
//! - `codegen`: one emitter per target behind the [`Emitter`] trait
//! - `build`: the [`Generator`] driver that runs every stage and writes files
//! - `diagnostics`: diagnostic records and the crate error type
//!
//! # Usage
//!
//! ```rust,ignore
//! use loom_weld::{Generator, Target};
//!
//! fn main() -> loom_weld::WeldResult<()> {
//!     let report = Generator::new("bindings")
//!         .target(Target::Python)
//!         .generate("geometry.ild")?;
//!     report.diagnostics.print(false);
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod codegen;
pub mod diagnostics;
pub mod ir;
pub mod overload;
pub mod parse;
pub mod validate;

// Re-export commonly used types
pub use build::{Analysis, GenerateReport, Generator, WriteReport};
pub use codegen::{Artifact, Emitter, Target};
pub use diagnostics::{Diagnosed, Diagnostic, Diagnostics, Severity, WeldError, WeldResult};
pub use ir::{
    Class, Constructor, Field, Function, Include, InterfaceDefinition, Method, Module, Parameter,
    TypeConverter,
};
pub use overload::{resolve, OverloadPlan, ResolveOptions};
pub use parse::{parse_file, parse_str, Format};
pub use validate::validate;
