//! Module-level metadata and the root interface definition
//!
//! [`InterfaceDefinition`] is the aggregate every later stage reads. It is
//! built once by the parser and never mutated afterwards.

use crate::diagnostics::WeldResult;
use crate::ir::symbol::{scalar_text, Class, Function, ScalarText};
use crate::ir::types::{outer_name, split_top_level, template_args};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_true() -> bool {
    true
}

/// Options for one target, in declaration order
pub type TargetOptions = IndexMap<String, String>;

/// Target option tables with unquoted numbers and booleans kept as text
fn target_tables<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, TargetOptions>, D::Error> {
    let tables = IndexMap::<String, Option<IndexMap<String, ScalarText>>>::deserialize(deserializer)?;
    Ok(tables
        .into_iter()
        .map(|(target, options)| {
            let options = options
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect();
            (target, options)
        })
        .collect())
}

/// Metadata for the generated module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module name (e.g., "geometry")
    pub name: String,

    /// Semantic version
    #[serde(default = "default_version", deserialize_with = "scalar_text")]
    pub version: String,

    /// Native namespace brought into scope by emitted code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Module documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Per-target options (e.g., `javascript.output_name`)
    #[serde(
        default,
        deserialize_with = "target_tables",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub targets: IndexMap<String, TargetOptions>,
}

impl Module {
    /// Create a new module at version 1.0.0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            namespace: None,
            description: None,
            targets: IndexMap::new(),
        }
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set one target option
    pub fn with_target_option(
        mut self,
        target: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.targets
            .entry(target.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Look up a target option
    pub fn target_option(&self, target: &str, key: &str) -> Option<&str> {
        self.targets
            .get(target)
            .and_then(|options| options.get(key))
            .map(String::as_str)
    }
}

/// Header reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Include {
    /// Path without surrounding brackets or quotes
    pub path: String,
    /// `<...>` style when true, `"..."` style otherwise
    pub system: bool,
}

impl Include {
    /// Create an include, inferring the style from `<...>` notation
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.starts_with('<') && trimmed.ends_with('>') {
            Self {
                path: trimmed.trim_start_matches('<').trim_end_matches('>').to_string(),
                system: true,
            }
        } else {
            Self {
                path: trimmed.trim_matches('"').to_string(),
                system: false,
            }
        }
    }

    /// Preprocessor line for this include
    pub fn formatted(&self) -> String {
        if self.system {
            format!("#include <{}>", self.path)
        } else {
            format!("#include \"{}\"", self.path)
        }
    }
}

impl Serialize for Include {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.system {
            serializer.serialize_str(&format!("<{}>", self.path))
        } else {
            serializer.serialize_str(&self.path)
        }
    }
}

impl<'de> Deserialize<'de> for Include {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Path(String),
            Full {
                path: String,
                #[serde(default)]
                system: bool,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Path(path) => Include::new(path),
            Repr::Full { path, system } => {
                let include = Include::new(path);
                Include {
                    system: system || include.system,
                    ..include
                }
            }
        })
    }
}

/// Category of a parameterized type needing a generated adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterKind {
    /// `vector<T>`, `list<T>`, `deque<T>`
    Sequence,
    /// `optional<T>`
    Optional,
    /// `map<K, V>`, `unordered_map<K, V>`
    Mapping,
    /// `array<T, N>`
    FixedArray,
    /// Anything else; needs a user-supplied converter function
    Custom,
}

impl ConverterKind {
    /// Classify by outer type name
    pub fn of(ty: &str) -> Self {
        match outer_name(ty).as_str() {
            "vector" | "list" | "deque" => ConverterKind::Sequence,
            "optional" => ConverterKind::Optional,
            "map" | "unordered_map" => ConverterKind::Mapping,
            "array" => ConverterKind::FixedArray,
            _ => ConverterKind::Custom,
        }
    }

    /// Registration call emitted for this kind
    pub fn registration_fn(&self) -> Option<&'static str> {
        match self {
            ConverterKind::Sequence => Some("register_vector_converter"),
            ConverterKind::Optional => Some("register_optional_converter"),
            ConverterKind::Mapping => Some("register_map_converter"),
            ConverterKind::FixedArray => Some("register_array_converter"),
            ConverterKind::Custom => None,
        }
    }

    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ConverterKind::Sequence => "sequence",
            ConverterKind::Optional => "optional",
            ConverterKind::Mapping => "mapping",
            ConverterKind::FixedArray => "array",
            ConverterKind::Custom => "custom",
        }
    }
}

/// Declared type converter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeConverter {
    /// Full parameterized type (e.g., `std::vector<Vector3D>`)
    pub ty: String,
    /// User-supplied registration function for custom kinds
    pub custom_converter: Option<String>,
}

impl TypeConverter {
    /// Create a converter for `ty`
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            custom_converter: None,
        }
    }

    /// Set the custom converter function
    pub fn with_custom(mut self, function: impl Into<String>) -> Self {
        self.custom_converter = Some(function.into());
        self
    }

    pub fn kind(&self) -> ConverterKind {
        ConverterKind::of(&self.ty)
    }

    /// Bracketed template arguments split on top-level commas
    pub fn type_args(&self) -> Vec<&str> {
        template_args(&self.ty)
            .map(split_top_level)
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
struct ConverterEntry {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_converter: Option<String>,
}

impl Serialize for TypeConverter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.custom_converter {
            None => serializer.serialize_str(&self.ty),
            Some(custom) => ConverterEntry {
                ty: self.ty.clone(),
                custom_converter: Some(custom.clone()),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TypeConverter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Type(String),
            Entry(ConverterEntry),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Type(ty) => TypeConverter::new(ty),
            Repr::Entry(entry) => TypeConverter {
                ty: entry.ty,
                custom_converter: entry.custom_converter,
            },
        })
    }
}

/// Helper exports toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilities {
    /// Version string export
    #[serde(default = "default_true")]
    pub version_info: bool,
    /// Registered class listing
    #[serde(default = "default_true")]
    pub list_classes: bool,
    /// Type introspection helper
    #[serde(default = "default_true", alias = "inspect_type")]
    pub type_inspection: bool,
    /// Per-class metadata query
    #[serde(default = "default_true", alias = "get_class_info")]
    pub class_info: bool,
}

impl Default for Utilities {
    fn default() -> Self {
        Self {
            version_info: true,
            list_classes: true,
            type_inspection: true,
            class_info: true,
        }
    }
}

impl Utilities {
    /// Every toggle off
    pub fn none() -> Self {
        Self {
            version_info: false,
            list_classes: false,
            type_inspection: false,
            class_info: false,
        }
    }

    /// Turn one toggle on by name; false when the name is unknown
    pub fn enable(&mut self, name: &str) -> bool {
        match name {
            "version_info" => self.version_info = true,
            "list_classes" => self.list_classes = true,
            "type_inspection" | "inspect_type" => self.type_inspection = true,
            "class_info" | "get_class_info" => self.class_info = true,
            _ => return false,
        }
        true
    }

    fn is_default(&self) -> bool {
        *self == Utilities::default()
    }
}

/// How the native library is linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Static,
    #[serde(alias = "dynamic")]
    Shared,
}

/// Native library the bindings link against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library name without prefix or extension
    pub name: String,
    /// Explicit library file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub link: LinkKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_dirs: Vec<String>,
}

impl LibraryConfig {
    /// Statically linked library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            link: LinkKind::Static,
            include_dirs: Vec::new(),
            link_dirs: Vec::new(),
        }
    }

    /// File name a build system would look for
    pub fn file_name(&self) -> String {
        match self.link {
            LinkKind::Static => format!("lib{}.a", self.name),
            LinkKind::Shared => format!("lib{}.so", self.name),
        }
    }
}

/// Root of a parsed interface description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceDefinition {
    pub module: Module,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Include>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub converters: Vec<TypeConverter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<Class>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Function>,
    #[serde(skip_serializing_if = "Utilities::is_default")]
    pub utilities: Utilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,
}

impl InterfaceDefinition {
    /// Create an empty definition for `module`
    pub fn new(module: Module) -> Self {
        Self {
            module,
            includes: Vec::new(),
            converters: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            utilities: Utilities::default(),
            library: None,
        }
    }

    /// Add a class
    pub fn class(mut self, class: Class) -> Self {
        self.classes.push(class);
        self
    }

    /// Add a function
    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Add a converter
    pub fn converter(mut self, converter: TypeConverter) -> Self {
        self.converters.push(converter);
        self
    }

    /// Add an include
    pub fn include(mut self, include: Include) -> Self {
        self.includes.push(include);
        self
    }

    /// Find a class by public or native name
    pub fn find_class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|class| class.is_named(name))
    }

    /// Find a function by public or native name
    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.is_named(name))
    }

    /// Native class names in declaration order
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(Class::cpp_name).collect()
    }

    /// Re-serialize into the structured document layout
    pub fn to_document(&self) -> WeldResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_include_inference() {
        let system = Include::new("<vector>");
        assert!(system.system);
        assert_eq!(system.path, "vector");
        assert_eq!(system.formatted(), "#include <vector>");

        let local = Include::new("mylib/Vector3D.h");
        assert!(!local.system);
        assert_eq!(local.formatted(), "#include \"mylib/Vector3D.h\"");

        let explicit: Include =
            serde_json::from_value(serde_json::json!({"path": "string", "system": true})).unwrap();
        assert_eq!(explicit.formatted(), "#include <string>");
    }

    #[test]
    fn test_converter_kinds() {
        assert_eq!(ConverterKind::of("std::vector<Vector3D>"), ConverterKind::Sequence);
        assert_eq!(ConverterKind::of("std::deque<int>"), ConverterKind::Sequence);
        assert_eq!(ConverterKind::of("std::optional<double>"), ConverterKind::Optional);
        assert_eq!(
            ConverterKind::of("std::unordered_map<std::string, Color>"),
            ConverterKind::Mapping
        );
        assert_eq!(ConverterKind::of("std::array<float, 3>"), ConverterKind::FixedArray);
        assert_eq!(ConverterKind::of("Eigen::Matrix3d"), ConverterKind::Custom);
    }

    #[test]
    fn test_converter_type_args() {
        let map = TypeConverter::new("std::map<std::string, Color>");
        assert_eq!(map.type_args(), vec!["std::string", "Color"]);

        let nested = TypeConverter::new("std::vector<std::pair<int, int>>");
        assert_eq!(nested.type_args(), vec!["std::pair<int, int>"]);
    }

    #[test]
    fn test_utilities_enable() {
        let mut utilities = Utilities::none();
        assert!(utilities.enable("inspect_type"));
        assert!(!utilities.enable("make_coffee"));
        assert!(utilities.type_inspection);
        assert!(!utilities.version_info);
    }

    #[test]
    fn test_find_class_by_either_name() {
        let def = InterfaceDefinition::new(Module::new("geometry"))
            .class(Class::new("Vec3").with_cpp_class("Vector3D"))
            .function(Function::new("dot", "double").with_cpp_name("dot_product"));

        assert_eq!(def.find_class("Vec3").map(|c| c.cpp_name()), Some("Vector3D"));
        assert_eq!(def.find_class("Vector3D").map(|c| c.name.as_str()), Some("Vec3"));
        assert!(def.find_class("Matrix").is_none());
        assert!(def.find_function("dot_product").is_some());
    }

    #[test]
    fn test_module_target_option() {
        let module = Module::new("geometry").with_target_option("javascript", "output_name", "geo.node");
        assert_eq!(module.target_option("javascript", "output_name"), Some("geo.node"));
        assert_eq!(module.target_option("python", "output_name"), None);
    }

    #[test]
    fn test_library_file_name_follows_link_kind() {
        let mut library = LibraryConfig::new("geometry");
        assert_eq!(library.file_name(), "libgeometry.a");
        library.link = LinkKind::Shared;
        assert_eq!(library.file_name(), "libgeometry.so");
    }
}
