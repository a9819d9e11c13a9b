//! Whole-definition checks
//!
//! Runs after parsing and never mutates the definition. Checks run in a
//! fixed order and all of them always run, so one pass reports every
//! problem:
//!
//! 1. duplicate class names (`V001`, error)
//! 2. duplicate function names (`V002`, error)
//! 3. base classes not declared in the definition (`V003`, warning)
//! 4. inheritance cycles (`V004`, error)

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::ir::{Class, InterfaceDefinition};
use std::collections::HashSet;
use tracing::debug;

/// Validate a parsed definition
pub fn validate(definition: &InterfaceDefinition) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    check_duplicate_classes(definition, &mut diagnostics);
    check_duplicate_functions(definition, &mut diagnostics);
    check_base_classes(definition, &mut diagnostics);
    check_inheritance_cycles(definition, &mut diagnostics);

    debug!(
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        "validated definition"
    );
    diagnostics
}

fn check_duplicate_classes(definition: &InterfaceDefinition, diagnostics: &mut Diagnostics) {
    let mut seen = HashSet::new();
    for class in &definition.classes {
        if !seen.insert(class.name.as_str()) {
            diagnostics.push(
                Diagnostic::error(format!("duplicate class name '{}'", class.name))
                    .in_context(format!("class {}", class.name))
                    .with_code("V001"),
            );
        }
    }
}

fn check_duplicate_functions(definition: &InterfaceDefinition, diagnostics: &mut Diagnostics) {
    let mut seen = HashSet::new();
    for function in &definition.functions {
        if !seen.insert(function.name.as_str()) {
            diagnostics.push(
                Diagnostic::error(format!("duplicate function name '{}'", function.name))
                    .in_context(format!("function {}", function.name))
                    .with_code("V002"),
            );
        }
    }
}

fn check_base_classes(definition: &InterfaceDefinition, diagnostics: &mut Diagnostics) {
    for class in &definition.classes {
        for base in &class.base_classes {
            if definition.find_class(&base.name).is_none() {
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "base class '{}' is not declared here; treating it as external",
                        base.name
                    ))
                    .in_context(format!("class {}", class.name))
                    .with_code("V003"),
                );
            }
        }
    }
}

fn check_inheritance_cycles(definition: &InterfaceDefinition, diagnostics: &mut Diagnostics) {
    for class in &definition.classes {
        if let Some(cycle) = find_cycle(definition, class) {
            diagnostics.push(
                Diagnostic::error(format!(
                    "circular inheritance detected: {}",
                    cycle.join(" -> ")
                ))
                .in_context(format!("class {}", class.name))
                .with_code("V004"),
            );
        }
    }
}

/// Depth-first walk over resolvable bases starting at `start`
///
/// The visited set is the current path only, so shared ancestors reached
/// through different branches (diamonds) are not cycles.
pub fn find_cycle<'a>(definition: &'a InterfaceDefinition, start: &'a Class) -> Option<Vec<&'a str>> {
    fn dfs<'a>(
        definition: &'a InterfaceDefinition,
        class: &'a Class,
        path: &mut Vec<&'a str>,
    ) -> bool {
        if path.contains(&class.name.as_str()) {
            path.push(&class.name);
            return true;
        }

        path.push(&class.name);
        for base in &class.base_classes {
            if let Some(base_class) = definition.find_class(&base.name) {
                if dfs(definition, base_class, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    let mut path = Vec::new();
    dfs(definition, start, &mut path).then_some(path)
}
