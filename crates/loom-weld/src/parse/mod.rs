//! Description parsing
//!
//! Two surface syntaxes produce the same [`InterfaceDefinition`]:
//!
//! - structured documents (YAML or JSON), decoded section by section in [`document`]
//! - the block DSL (`module geometry { ... }`), scanned line by line in [`dsl`]
//!
//! Parsing never panics on bad input. Every problem becomes a diagnostic,
//! and the definition is withheld once any error was recorded.
//!
//! | Code | Meaning |
//! |------|---------|
//! | P001 | unsupported file extension |
//! | P002 | file cannot be read |
//! | P003 | YAML/JSON syntax error |
//! | P004 | document root is not a mapping |
//! | P005 | missing `module` section or block |
//! | P006 | invalid section or item |
//! | P007 | unknown top-level key (warning) |
//! | P010 | invalid block header |
//! | P011 | unterminated block |
//! | P012 | invalid member or entry line |
//! | P013 | unexpected line, ignored (warning) |
//! | P014 | unknown utility name (warning) |
//! | P015 | duplicate `module` block |

pub mod document;
pub mod dsl;

use crate::diagnostics::{Diagnosed, Diagnostic, WeldError, WeldResult};
use crate::ir::InterfaceDefinition;
use std::fs;
use std::path::Path;
use tracing::debug;

pub use document::{parse_document, parse_json, parse_yaml};
pub use dsl::parse_dsl;

/// Description syntax, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Dsl,
}

impl Format {
    /// Extensions accepted by [`Format::from_path`]
    pub const ACCEPTED: &'static [&'static str] = &[".yaml", ".yml", ".json", ".ild", ".loom"];

    /// Detect the format of a description file
    pub fn from_path(path: &Path) -> WeldResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            "ild" | "loom" => Ok(Format::Dsl),
            _ => Err(WeldError::UnsupportedFormat {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{}", extension)
                },
                accepted: Self::ACCEPTED.join(", "),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Dsl => "dsl",
        }
    }
}

/// Parse description text in the given format
pub fn parse_str(source: &str, format: Format) -> Diagnosed<InterfaceDefinition> {
    debug!(format = format.name(), bytes = source.len(), "parsing description");
    match format {
        Format::Yaml => parse_yaml(source),
        Format::Json => parse_json(source),
        Format::Dsl => parse_dsl(source),
    }
}

/// Read and parse a description file
pub fn parse_file(path: &Path) -> Diagnosed<InterfaceDefinition> {
    let format = match Format::from_path(path) {
        Ok(format) => format,
        Err(err) => {
            return Diagnosed::failed(
                std::iter::once(
                    Diagnostic::error(err.to_string())
                        .in_context(path.display().to_string())
                        .with_code("P001"),
                )
                .collect(),
            );
        }
    };

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(source) => {
            let err = WeldError::Read {
                path: path.to_path_buf(),
                source,
            };
            return Diagnosed::failed(
                std::iter::once(Diagnostic::error(err.to_string()).with_code("P002")).collect(),
            );
        }
    };

    parse_str(&source, format)
}

/// Shared tail of both parsers: implicit constructors, then settle on errors
pub(crate) fn finish(
    mut definition: InterfaceDefinition,
    diagnostics: crate::diagnostics::Diagnostics,
) -> Diagnosed<InterfaceDefinition> {
    for class in &mut definition.classes {
        class.ensure_default_constructor();
    }
    debug!(
        module = %definition.module.name,
        classes = definition.classes.len(),
        functions = definition.functions.len(),
        errors = diagnostics.error_count(),
        "parsed description"
    );
    Diagnosed::ok(definition, diagnostics).settle()
}
