//! Structured document decoding (YAML and JSON)
//!
//! The text is first loaded into a generic [`serde_json::Value`]; each
//! section and each list item is then decoded on its own so that one bad
//! class produces one diagnostic while its siblings still decode.

use crate::diagnostics::{Diagnosed, Diagnostic, Diagnostics};
use crate::ir::{
    Class, Function, Include, InterfaceDefinition, LibraryConfig, Module, TypeConverter, Utilities,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Top-level keys understood in a structured document
pub const SECTIONS: &[&str] = &[
    "module",
    "includes",
    "converters",
    "classes",
    "functions",
    "utilities",
    "library",
];

/// Parse a YAML description
pub fn parse_yaml(source: &str) -> Diagnosed<InterfaceDefinition> {
    match serde_yml::from_str::<Value>(source) {
        Ok(value) => parse_document(value),
        Err(err) => syntax_error("YAML", err.to_string()),
    }
}

/// Parse a JSON description
pub fn parse_json(source: &str) -> Diagnosed<InterfaceDefinition> {
    match serde_json::from_str::<Value>(source) {
        Ok(value) => parse_document(value),
        Err(err) => syntax_error("JSON", err.to_string()),
    }
}

fn syntax_error(language: &str, detail: String) -> Diagnosed<InterfaceDefinition> {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(
        Diagnostic::error(format!("{} syntax error: {}", language, detail)).with_code("P003"),
    );
    Diagnosed::failed(diagnostics)
}

/// Build a definition from an already-loaded document
pub fn parse_document(document: Value) -> Diagnosed<InterfaceDefinition> {
    let mut diagnostics = Diagnostics::new();

    let mut root = match document {
        Value::Object(root) => root,
        other => {
            diagnostics.push(
                Diagnostic::error(format!(
                    "document root must be a mapping, found {}",
                    value_kind(&other)
                ))
                .with_code("P004"),
            );
            return Diagnosed::failed(diagnostics);
        }
    };

    for key in root.keys() {
        if !SECTIONS.contains(&key.as_str()) {
            diagnostics.push(
                Diagnostic::warning(format!("unknown top-level key '{}' ignored", key))
                    .with_code("P007"),
            );
        }
    }

    let module = match root.remove("module") {
        Some(value) => decode::<Module>(value, "module", &mut diagnostics),
        None => {
            diagnostics.push(
                Diagnostic::error("missing required 'module' section").with_code("P005"),
            );
            None
        }
    };

    let includes = decode_list::<Include>(&mut root, "includes", "include", &mut diagnostics);
    let converters =
        decode_list::<TypeConverter>(&mut root, "converters", "converter", &mut diagnostics);
    let classes = decode_list::<Class>(&mut root, "classes", "class", &mut diagnostics);
    let functions = decode_list::<Function>(&mut root, "functions", "function", &mut diagnostics);

    let utilities = match root.remove("utilities") {
        Some(Value::Null) | None => Utilities::default(),
        Some(value) => {
            decode::<Utilities>(value, "utilities", &mut diagnostics).unwrap_or_default()
        }
    };

    let library = match root.remove("library") {
        Some(Value::Null) | None => None,
        Some(value) => decode::<LibraryConfig>(value, "library", &mut diagnostics),
    };

    let Some(module) = module else {
        return Diagnosed::failed(diagnostics);
    };

    let definition = InterfaceDefinition {
        module,
        includes,
        converters,
        classes,
        functions,
        utilities,
        library,
    };
    super::finish(definition, diagnostics)
}

fn decode<T: DeserializeOwned>(
    value: Value,
    section: &str,
    diagnostics: &mut Diagnostics,
) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            diagnostics.push(
                Diagnostic::error(format!("error parsing {}: {}", section, err)).with_code("P006"),
            );
            None
        }
    }
}

fn decode_list<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    section: &str,
    item: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<T> {
    let items = match root.remove(section) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            diagnostics.push(
                Diagnostic::error(format!(
                    "'{}' must be a list, found {}",
                    section,
                    value_kind(&other)
                ))
                .with_code("P006"),
            );
            return Vec::new();
        }
    };

    let mut decoded = Vec::with_capacity(items.len());
    for value in items {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        match serde_json::from_value::<T>(value) {
            Ok(entry) => decoded.push(entry),
            Err(err) => diagnostics.push(
                Diagnostic::error(format!("error parsing {} '{}': {}", item, name, err))
                    .with_code("P006"),
            ),
        }
    }
    decoded
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AccessMode, ConverterKind, InheritanceKind, LinkKind};
    use pretty_assertions::assert_eq;

    const GEOMETRY: &str = r#"
module:
  name: geometry
  version: 2.0.0
  namespace: geo
  targets:
    javascript:
      output_name: geometry.node
includes:
  - "<vector>"
  - mylib/Vector3D.h
converters:
  - std::vector<Vector3D>
  - type: Eigen::Matrix3d
    custom_converter: register_matrix3d
classes:
  - name: Vector3D
    fields:
      - name: x
        type: double
      - name: id
        type: int
        access: ro
        getter: getId
    methods:
      - name: length
        returns: double
        const: true
  - name: Rectangle
    base_classes:
      - Shape
      - name: Node
        inheritance: virtual
    constructors:
      - parameters:
          - { name: w, type: double }
          - { name: h, type: double, default: "1.0" }
functions:
  - name: dot
    returns: double
    parameters:
      - { name: a, type: "const Vector3D&" }
      - { name: b, type: "const Vector3D&" }
utilities:
  type_inspection: false
library:
  name: geometry
  link: shared
"#;

    #[test]
    fn test_parse_full_document() {
        let result = parse_yaml(GEOMETRY);
        assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics);
        let def = result.value.unwrap();

        assert_eq!(def.module.version, "2.0.0");
        assert_eq!(def.module.namespace.as_deref(), Some("geo"));
        assert_eq!(
            def.module.target_option("javascript", "output_name"),
            Some("geometry.node")
        );

        assert!(def.includes[0].system);
        assert!(!def.includes[1].system);

        assert_eq!(def.converters[0].kind(), ConverterKind::Sequence);
        assert_eq!(
            def.converters[1].custom_converter.as_deref(),
            Some("register_matrix3d")
        );

        let vector = &def.classes[0];
        assert_eq!(vector.fields[0].access, AccessMode::ReadWrite);
        assert_eq!(vector.fields[1].access, AccessMode::ReadOnly);
        assert!(vector.methods[0].is_const);
        assert_eq!(vector.constructors.len(), 1);

        let rectangle = &def.classes[1];
        assert_eq!(rectangle.base_classes[1].inheritance, InheritanceKind::Virtual);
        assert_eq!(rectangle.constructors.len(), 1);
        assert_eq!(
            rectangle.constructors[0].parameters[1].default.as_deref(),
            Some("1.0")
        );

        assert!(!def.utilities.type_inspection);
        assert!(def.utilities.version_info);
        assert_eq!(def.library.map(|lib| lib.link), Some(LinkKind::Shared));
    }

    #[test]
    fn test_unquoted_scalars_keep_their_text() {
        let source = r#"
module:
  name: geo
  version: 1.2
  targets:
    javascript:
      debug: true
      abi: 9
    python:
classes:
  - name: Counter
    fields:
      - { name: step, type: int, default: 1 }
      - { name: enabled, type: bool, default: false }
functions:
  - name: f
    parameters:
      - { name: x, type: double, default: 0.0 }
"#;
        let result = parse_yaml(source);
        assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics);
        let def = result.value.unwrap();

        assert_eq!(def.module.version, "1.2");
        assert_eq!(def.module.target_option("javascript", "debug"), Some("true"));
        assert_eq!(def.module.target_option("javascript", "abi"), Some("9"));
        assert!(def.module.targets["python"].is_empty());

        let fields = &def.classes[0].fields;
        assert_eq!(fields[0].default.as_deref(), Some("1"));
        assert_eq!(fields[1].default.as_deref(), Some("false"));
        assert_eq!(
            def.functions[0].parameters[0].default.as_deref(),
            Some("0.0")
        );
    }

    #[test]
    fn test_non_scalar_default_is_rejected() {
        let source = r#"{
            "module": {"name": "m", "version": 3},
            "functions": [{"name": "f", "parameters": [{"name": "x", "type": "int", "default": [1]}]}]
        }"#;
        let result = parse_json(source);
        assert!(result.value.is_none());
        assert_eq!(result.diagnostics.error_count(), 1);
        let message = &result.diagnostics.errors().next().unwrap().message;
        assert!(message.starts_with("error parsing function 'f'"), "{}", message);
    }

    #[test]
    fn test_missing_module_is_blocking() {
        let result = parse_yaml("classes:\n  - name: Point\n");
        assert!(result.value.is_none());
        assert_eq!(result.diagnostics.error_count(), 1);
        assert_eq!(result.diagnostics.errors().next().unwrap().code, Some("P005"));
    }

    #[test]
    fn test_bad_items_are_reported_individually() {
        let source = r#"{
            "module": {"name": "m"},
            "classes": [
                {"name": "Good"},
                {"name": "Broken", "fields": [{"name": "x"}]},
                {"fields": []}
            ],
            "functions": [{"name": "f", "parameters": [{"type": "int"}]}]
        }"#;
        let result = parse_json(source);
        assert!(result.value.is_none());
        assert_eq!(result.diagnostics.error_count(), 3);

        let messages: Vec<_> = result.diagnostics.errors().map(|d| d.message.clone()).collect();
        assert!(messages[0].starts_with("error parsing class 'Broken'"));
        assert!(messages[1].starts_with("error parsing class '?'"));
        assert!(messages[2].starts_with("error parsing function 'f'"));
    }

    #[test]
    fn test_unknown_key_warns() {
        let result = parse_yaml("module:\n  name: m\nplugins: []\n");
        assert!(result.value.is_some());
        assert_eq!(result.diagnostics.warning_count(), 1);
        assert_eq!(result.diagnostics.warnings().next().unwrap().code, Some("P007"));
    }

    #[test]
    fn test_non_mapping_root() {
        let result = parse_yaml("- just\n- a list\n");
        assert!(result.value.is_none());
        assert_eq!(result.diagnostics.errors().next().unwrap().code, Some("P004"));

        let syntax = parse_json("{ not json");
        assert_eq!(syntax.diagnostics.errors().next().unwrap().code, Some("P003"));
    }

    #[test]
    fn test_document_round_trip() {
        let first = parse_yaml(GEOMETRY).value.unwrap();
        let document = first.to_document().unwrap();
        let second = parse_document(document).value.unwrap();
        assert_eq!(first, second);
    }
}
