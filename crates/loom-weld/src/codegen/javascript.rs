//! Node.js addon target
//!
//! Emits the addon source (`binding.cxx`), its node-gyp descriptor, an npm
//! manifest, a loader (`index.js`) and a smoke test (`test.js`).
//!
//! `module.targets.javascript.output_name` names the compiled addon
//! (default `<module>.node`); the gyp target name is that name without the
//! `.node` suffix.

use super::common::{banner, is_abstract, section, Registrar};
use super::{escape, require_identifier, Artifact, Emitter, Target};
use crate::diagnostics::WeldResult;
use crate::ir::{InterfaceDefinition, Utilities};
use crate::overload::OverloadPlan;
use serde_json::{json, Value};
use tracing::debug;

/// Emitter for the `javascript` target
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptEmitter;

impl Emitter for JavaScriptEmitter {
    fn target(&self) -> Target {
        Target::JavaScript
    }

    fn emit(
        &self,
        definition: &InterfaceDefinition,
        plan: &OverloadPlan,
    ) -> WeldResult<Vec<Artifact>> {
        require_identifier(self.target(), &definition.module.name)?;

        let output_name = output_name(definition);
        let target_name = output_name
            .strip_suffix(".node")
            .unwrap_or(&output_name)
            .to_string();
        debug!(module = %definition.module.name, addon = %output_name, "rendering javascript target");

        let registrar = Registrar::new(definition, plan);
        Ok(vec![
            Artifact::new("binding.cxx", render_binding(&registrar)),
            Artifact::new("binding.gyp", pretty(render_gyp(definition, &target_name))?),
            Artifact::new("package.json", pretty(render_package(definition))?),
            Artifact::new("index.js", render_index(&target_name)),
            Artifact::new("test.js", render_test(&registrar)),
        ])
    }
}

/// Compiled addon file name
pub fn output_name(definition: &InterfaceDefinition) -> String {
    definition
        .module
        .target_option("javascript", "output_name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.node", definition.module.name))
}

fn pretty(value: Value) -> WeldResult<String> {
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

fn render_binding(registrar: &Registrar<'_>) -> String {
    let definition = registrar.definition();
    let module = &definition.module;
    let mut out = banner(&format!("{} - JavaScript bindings", module.name));
    out.push('\n');

    out.push_str("#include <rosetta/generators/js/js_generator.h>\n");
    out.push_str("#include <rosetta/generators/js/type_converters.h>\n");
    out.push_str("#include <rosetta/rosetta.h>\n");
    out.push_str(&registrar.includes());
    out.push('\n');

    out.push_str("using namespace rosetta;\n");
    out.push_str("using namespace rosetta::generators::js;\n");
    out.push_str(&registrar.namespace());
    out.push('\n');

    out.push_str(&section("Class registration"));
    out.push_str("void register_classes() {\n");
    out.push_str(&registrar.class_registrations());
    out.push_str("}\n\n");

    out.push_str(&section("Type converters"));
    out.push_str("void register_converters(JsGenerator &gen) {\n");
    out.push_str(&registrar.converter_registrations("gen"));
    out.push_str("}\n\n");

    out.push_str(&section("Module initialization"));
    out.push_str("BEGIN_JS_MODULE(gen) {\n");
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
    out.push_str(&render_utilities(definition, &definition.utilities));
    out.push_str("}\n");
    out.push_str("END_JS_MODULE()\n");
    out
}

fn render_utilities(definition: &InterfaceDefinition, utilities: &Utilities) -> String {
    let mut out = String::new();
    if utilities.version_info {
        out.push_str(&format!(
            "    gen.add_version_info(\"{}\", \"{}\");\n",
            escape(&definition.module.name),
            escape(&definition.module.version)
        ));
    }
    if utilities.list_classes {
        out.push_str("    gen.add_list_classes();\n");
    }
    if utilities.type_inspection {
        out.push_str(concat!(
            "    gen.add_function(\"inspectType\", [](const Napi::CallbackInfo &info) -> Napi::Value {\n",
            "        Napi::Env env = info.Env();\n",
            "        if (info.Length() < 1) {\n",
            "            return env.Undefined();\n",
            "        }\n",
            "        return Napi::String::New(env, info[0].IsObject() ? \"object\" : info[0].ToString().Utf8Value());\n",
            "    });\n",
        ));
    }
    if utilities.class_info {
        out.push_str("    gen.add_class_info();\n");
    }
    out
}

fn render_gyp(definition: &InterfaceDefinition, target_name: &str) -> Value {
    let mut include_dirs = vec![
        json!("<!@(node -p \"require('node-addon-api').include\")"),
        json!("."),
    ];
    let mut libraries = Vec::new();
    if let Some(library) = &definition.library {
        include_dirs.extend(library.include_dirs.iter().map(|dir| json!(dir)));
        libraries.extend(library.link_dirs.iter().map(|dir| json!(format!("-L{}", dir))));
        libraries.push(json!(library
            .path
            .clone()
            .unwrap_or_else(|| format!("-l{}", library.name))));
    }

    json!({
        "targets": [{
            "target_name": target_name,
            "sources": ["binding.cxx"],
            "include_dirs": include_dirs,
            "libraries": libraries,
            "cflags_cc": ["-std=c++20", "-fexceptions"],
            "defines": ["NAPI_CPP_EXCEPTIONS"],
        }]
    })
}

fn render_package(definition: &InterfaceDefinition) -> Value {
    let module = &definition.module;
    let description = module
        .description
        .clone()
        .unwrap_or_else(|| format!("JavaScript bindings for {}", module.name));

    json!({
        "name": module.name,
        "version": module.version,
        "description": description,
        "main": "index.js",
        "gypfile": true,
        "scripts": {
            "install": "node-gyp rebuild",
            "test": "node test.js",
        },
        "dependencies": {
            "node-addon-api": "^7.0.0",
        },
    })
}

fn render_index(target_name: &str) -> String {
    format!(
        "// Auto-generated by loom - DO NOT EDIT\nmodule.exports = require('./build/Release/{}.node');\n",
        target_name
    )
}

fn render_test(registrar: &Registrar<'_>) -> String {
    let definition = registrar.definition();
    let mut out = String::from("// Auto-generated smoke test - edit freely\n");
    out.push_str("const addon = require('./index.js');\n\n");
    out.push_str(&format!(
        "console.log('Testing {} {}');\n\n",
        escape(&definition.module.name),
        escape(&definition.module.version)
    ));

    for (index, class) in definition.classes.iter().enumerate() {
        if is_abstract(class) {
            out.push_str(&format!("// {} is abstract and cannot be constructed\n\n", class.name));
            continue;
        }
        let (fields, methods) = registrar.smoke_members(index);
        let var = class.name.to_lowercase();
        out.push_str(&format!("const {} = new addon.{}();\n", var, class.name));
        for field in fields {
            out.push_str(&format!(
                "console.log('{}.{} =', {}.{});\n",
                class.name, field.name, var, field.name
            ));
        }
        for method in methods {
            out.push_str(&format!(
                "console.log('{}.{}() =', {}.{}());\n",
                class.name, method, var, method
            ));
        }
        out.push('\n');
    }

    out.push_str("console.log('All tests passed');\n");
    out
}
