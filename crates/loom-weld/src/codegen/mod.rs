//! Code generation for interface descriptions
//!
//! This module provides emitters for:
//! - plain registration sources plus a CMake static library (`registration`)
//! - Node.js addons: binding.cxx, binding.gyp, package.json (`javascript`)
//! - Python extension modules: binding source, CMakeLists.txt, pyproject.toml (`python`)
//!
//! Every emitter walks the model through the shared [`common::Registrar`],
//! so classes, members and converters come out in the same order and
//! vocabulary regardless of target.

pub mod common;
pub mod javascript;
pub mod python;
pub mod registration;

pub use common::Registrar;
pub use javascript::JavaScriptEmitter;
pub use python::PythonEmitter;
pub use registration::RegistrationEmitter;

use crate::diagnostics::{WeldError, WeldResult};
use crate::ir::InterfaceDefinition;
use crate::overload::OverloadPlan;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// One rendered output file, path relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// A rendering backend for one output technology
pub trait Emitter {
    /// Target this emitter renders
    fn target(&self) -> Target;

    /// Render every artifact for a validated definition and its overload plan
    fn emit(&self, definition: &InterfaceDefinition, plan: &OverloadPlan)
        -> WeldResult<Vec<Artifact>>;
}

/// Output technologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    #[default]
    Registration,
    JavaScript,
    Python,
}

impl Target {
    pub const ALL: &'static [Target] = &[Target::Registration, Target::JavaScript, Target::Python];

    /// Canonical name, also the key under `module.targets`
    pub fn name(&self) -> &'static str {
        match self {
            Target::Registration => "registration",
            Target::JavaScript => "javascript",
            Target::Python => "python",
        }
    }

    /// Emitter for this target
    pub fn emitter(&self) -> Box<dyn Emitter> {
        match self {
            Target::Registration => Box::new(RegistrationEmitter),
            Target::JavaScript => Box::new(JavaScriptEmitter),
            Target::Python => Box::new(PythonEmitter),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = WeldError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "registration" | "cpp" => Ok(Target::Registration),
            "javascript" | "js" | "node" => Ok(Target::JavaScript),
            "python" | "py" => Ok(Target::Python),
            _ => Err(WeldError::UnknownTarget {
                name: name.to_string(),
                available: Target::ALL
                    .iter()
                    .map(Target::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Module names end up in C++ symbols and macro arguments
pub(crate) fn require_identifier(target: Target, module: &str) -> WeldResult<()> {
    if IDENTIFIER.is_match(module) {
        Ok(())
    } else {
        Err(WeldError::Render {
            target: target.name(),
            message: format!("module name '{}' is not a valid identifier", module),
        })
    }
}

/// Escape text for a C++ or JavaScript string literal
pub(crate) fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Module;

    #[test]
    fn test_target_from_str() {
        assert_eq!("js".parse::<Target>().unwrap(), Target::JavaScript);
        assert_eq!("Python".parse::<Target>().unwrap(), Target::Python);
        assert_eq!("registration".parse::<Target>().unwrap(), Target::Registration);

        let err = "ruby".parse::<Target>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown target 'ruby' (available: registration, javascript, python)"
        );
    }

    #[test]
    fn test_emitters_report_their_target() {
        for target in Target::ALL {
            assert_eq!(target.emitter().target(), *target);
        }
    }

    #[test]
    fn test_invalid_module_name_fails_rendering() {
        let def = InterfaceDefinition::new(Module::new("my-lib"));
        let err = RegistrationEmitter
            .emit(&def, &OverloadPlan::default())
            .unwrap_err();
        assert!(matches!(err, WeldError::Render { target: "registration", .. }));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }
}
