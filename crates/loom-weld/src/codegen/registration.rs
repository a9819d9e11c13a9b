//! Plain registration target
//!
//! Emits `<module>_registration.cpp`, which registers every class,
//! converter and function with the reflection registry, plus a
//! `CMakeLists.txt` building it as a static library.

use super::common::{banner, cmake_link_lines, section, Registrar};
use super::{require_identifier, Artifact, Emitter, Target};
use crate::diagnostics::WeldResult;
use crate::ir::InterfaceDefinition;
use crate::overload::OverloadPlan;
use tracing::debug;

/// Emitter for the `registration` target
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationEmitter;

impl Emitter for RegistrationEmitter {
    fn target(&self) -> Target {
        Target::Registration
    }

    fn emit(
        &self,
        definition: &InterfaceDefinition,
        plan: &OverloadPlan,
    ) -> WeldResult<Vec<Artifact>> {
        let module = &definition.module.name;
        require_identifier(self.target(), module)?;

        let registrar = Registrar::new(definition, plan);
        let source = format!("{}_registration.cpp", module);
        debug!(module = %module, file = %source, "rendering registration target");

        Ok(vec![
            Artifact::new(source.clone(), render_source(&registrar)),
            Artifact::new("CMakeLists.txt", render_cmake(definition, &source)),
        ])
    }
}

fn render_source(registrar: &Registrar<'_>) -> String {
    let definition = registrar.definition();
    let module = &definition.module;
    let mut out = banner(&format!(
        "{} {} - class registration",
        module.name, module.version
    ));
    if let Some(description) = &module.description {
        out.push_str(&format!("// {}\n", description));
    }
    out.push('\n');

    out.push_str("#include <rosetta/rosetta.h>\n");
    out.push_str(&registrar.includes());
    out.push('\n');

    let namespace = registrar.namespace();
    if !namespace.is_empty() {
        out.push_str(&namespace);
        out.push('\n');
    }

    out.push_str(&section("Classes"));
    out.push_str(&format!("void register_{}_classes() {{\n", module.name));
    out.push_str(&registrar.class_registrations());
    out.push_str("}\n\n");

    out.push_str(&section("Converters"));
    out.push_str(&format!(
        "void register_{}_converters(rosetta::ConverterRegistry &registry) {{\n",
        module.name
    ));
    out.push_str(&registrar.converter_registrations("registry"));
    out.push_str("}\n\n");

    out.push_str(&section("Functions"));
    out.push_str(&format!(
        "void register_{}_functions(rosetta::FunctionRegistry &registry) {{\n",
        module.name
    ));
    out.push_str(&registrar.function_bindings("registry"));
    out.push_str("}\n");
    out
}

fn render_cmake(definition: &InterfaceDefinition, source: &str) -> String {
    let module = &definition.module;
    let target = format!("{}_registration", module.name);
    let mut out = String::new();
    out.push_str("# Auto-generated by loom - DO NOT EDIT\n");
    out.push_str("cmake_minimum_required(VERSION 3.15)\n");
    out.push_str(&format!(
        "project({} VERSION {} LANGUAGES CXX)\n\n",
        target, module.version
    ));
    out.push_str("set(CMAKE_CXX_STANDARD 20)\n");
    out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n\n");
    out.push_str(&format!("add_library({} STATIC {})\n", target, source));
    out.push_str(&format!(
        "target_include_directories({} PUBLIC ${{CMAKE_CURRENT_SOURCE_DIR}})\n",
        target
    ));
    out.push_str(&cmake_link_lines(&target, definition.library.as_ref()));
    out
}
