//! Python extension target
//!
//! Emits `<module>_binding.cpp`, a pybind11 `CMakeLists.txt`, a
//! `pyproject.toml` and a `test.py` smoke test.
//!
//! `module.targets.python.module_name` overrides the importable module
//! name (default: the module name).

use super::common::{banner, cmake_link_lines, is_abstract, section, Registrar};
use super::{escape, require_identifier, Artifact, Emitter, Target};
use crate::diagnostics::{WeldError, WeldResult};
use crate::ir::InterfaceDefinition;
use crate::overload::OverloadPlan;
use tracing::debug;

/// Emitter for the `python` target
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonEmitter;

impl Emitter for PythonEmitter {
    fn target(&self) -> Target {
        Target::Python
    }

    fn emit(
        &self,
        definition: &InterfaceDefinition,
        plan: &OverloadPlan,
    ) -> WeldResult<Vec<Artifact>> {
        require_identifier(self.target(), &definition.module.name)?;
        let py_module = python_module_name(definition);
        require_identifier(self.target(), py_module).map_err(|_| WeldError::Render {
            target: self.target().name(),
            message: format!("python module name '{}' is not a valid identifier", py_module),
        })?;

        let registrar = Registrar::new(definition, plan);
        let source = format!("{}_binding.cpp", definition.module.name);
        debug!(module = %definition.module.name, python_module = %py_module, "rendering python target");

        Ok(vec![
            Artifact::new(source.clone(), render_binding(&registrar, py_module)),
            Artifact::new("CMakeLists.txt", render_cmake(definition, py_module, &source)),
            Artifact::new("pyproject.toml", render_pyproject(definition, py_module)),
            Artifact::new("test.py", render_test(&registrar, py_module)),
        ])
    }
}

/// Importable module name
pub fn python_module_name(definition: &InterfaceDefinition) -> &str {
    definition
        .module
        .target_option("python", "module_name")
        .unwrap_or(&definition.module.name)
}

fn render_binding(registrar: &Registrar<'_>, py_module: &str) -> String {
    let definition = registrar.definition();
    let module = &definition.module;
    let mut out = banner(&format!("{} - Python bindings", module.name));
    out.push('\n');

    out.push_str("#include <rosetta/generators/py/py_generator.h>\n");
    out.push_str("#include <rosetta/rosetta.h>\n");
    out.push_str(&registrar.includes());
    out.push('\n');

    out.push_str("using namespace rosetta;\n");
    out.push_str("using namespace rosetta::generators::py;\n");
    out.push_str(&registrar.namespace());
    out.push('\n');

    out.push_str(&section("Class registration"));
    out.push_str("void register_classes() {\n");
    out.push_str(&registrar.class_registrations());
    out.push_str("}\n\n");

    out.push_str(&section("Type converters"));
    out.push_str("void register_converters(PyGenerator &gen) {\n");
    out.push_str(&registrar.converter_registrations("gen"));
    out.push_str("}\n\n");

    let doc = module
        .description
        .clone()
        .unwrap_or_else(|| format!("Python bindings for {}", module.name));
    out.push_str(&section("Module initialization"));
    out.push_str(&format!(
        "BEGIN_PY_MODULE({}, \"{}\") {{\n",
        py_module,
        escape(&doc)
    ));
    out.push_str("    register_classes();\n");
    out.push_str("    register_converters(gen);\n\n");
    if !definition.classes.is_empty() {
        out.push_str(&format!(
            "    gen.bind_classes<{}>();\n\n",
            registrar.class_list()
        ));
    }
    let functions = registrar.function_bindings("gen");
    if !functions.is_empty() {
        out.push_str(&functions);
        out.push('\n');
    }

    let utilities = &definition.utilities;
    if utilities.version_info {
        out.push_str(&format!(
            "    gen.module().attr(\"__version__\") = \"{}\";\n",
            escape(&module.version)
        ));
    }
    if utilities.list_classes {
        out.push_str("    gen.add_list_classes();\n");
    }
    if utilities.type_inspection {
        out.push_str(concat!(
            "    gen.module().def(\"inspect_type\", [](pybind11::object obj) {\n",
            "        return pybind11::str(obj.get_type().attr(\"__name__\"));\n",
            "    });\n",
        ));
    }
    if utilities.class_info {
        out.push_str("    gen.add_class_info();\n");
    }
    out.push_str("}\n");
    out.push_str("END_PY_MODULE()\n");
    out
}

fn render_cmake(definition: &InterfaceDefinition, py_module: &str, source: &str) -> String {
    let module = &definition.module;
    let mut out = String::new();
    out.push_str("# Auto-generated by loom - DO NOT EDIT\n");
    out.push_str("cmake_minimum_required(VERSION 3.15)\n");
    out.push_str(&format!(
        "project({} VERSION {} LANGUAGES CXX)\n\n",
        py_module, module.version
    ));
    out.push_str("set(CMAKE_CXX_STANDARD 20)\n");
    out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n\n");
    out.push_str("find_package(Python COMPONENTS Interpreter Development.Module REQUIRED)\n");
    out.push_str("find_package(pybind11 CONFIG REQUIRED)\n\n");
    out.push_str(&format!("pybind11_add_module({} {})\n", py_module, source));
    out.push_str(&format!(
        "target_include_directories({} PRIVATE ${{CMAKE_CURRENT_SOURCE_DIR}})\n",
        py_module
    ));
    out.push_str(&cmake_link_lines(py_module, definition.library.as_ref()));
    out.push_str(&format!(
        "\ninstall(TARGETS {} LIBRARY DESTINATION .)\n",
        py_module
    ));
    out
}

fn render_pyproject(definition: &InterfaceDefinition, py_module: &str) -> String {
    let module = &definition.module;
    let description = module
        .description
        .clone()
        .unwrap_or_else(|| format!("Python bindings for {}", module.name));

    let mut out = String::new();
    out.push_str("# Auto-generated by loom - DO NOT EDIT\n");
    out.push_str("[build-system]\n");
    out.push_str("requires = [\"scikit-build-core>=0.8\", \"pybind11>=2.11\"]\n");
    out.push_str("build-backend = \"scikit_build_core.build\"\n\n");
    out.push_str("[project]\n");
    out.push_str(&format!("name = \"{}\"\n", py_module));
    out.push_str(&format!("version = \"{}\"\n", escape(&module.version)));
    out.push_str(&format!("description = \"{}\"\n", escape(&description)));
    out.push_str("requires-python = \">=3.8\"\n");
    out
}

fn render_test(registrar: &Registrar<'_>, py_module: &str) -> String {
    let definition = registrar.definition();
    let mut out = String::from("# Auto-generated smoke test - edit freely\n");
    out.push_str(&format!("import {}\n\n", py_module));
    out.push_str(&format!(
        "print(\"Testing {} {}\")\n\n",
        escape(&definition.module.name),
        escape(&definition.module.version)
    ));

    for (index, class) in definition.classes.iter().enumerate() {
        if is_abstract(class) {
            out.push_str(&format!("# {} is abstract and cannot be constructed\n\n", class.name));
            continue;
        }
        let (fields, methods) = registrar.smoke_members(index);
        let var = class.name.to_lowercase();
        out.push_str(&format!("{} = {}.{}()\n", var, py_module, class.name));
        for field in fields {
            out.push_str(&format!(
                "print(\"{}.{} =\", {}.{})\n",
                class.name, field.name, var, field.name
            ));
        }
        for method in methods {
            out.push_str(&format!(
                "print(\"{}.{}() =\", {}.{}())\n",
                class.name, method, var, method
            ));
        }
        out.push('\n');
    }

    out.push_str("print(\"All tests passed\")\n");
    out
}
