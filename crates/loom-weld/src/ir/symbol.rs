//! Class-level symbols: parameters, fields, methods, constructors, bases
//!
//! Field names and serde renames follow the structured document layout, so
//! a parsed class re-serializes to the same keys it was read from.

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn default_return() -> String {
    "void".to_string()
}

/// Accept an unquoted number or boolean wherever a text scalar is expected
///
/// `version: 1.2` and `default: 0.0` reach the decoder as numbers; they keep
/// their written form.
pub(crate) fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Err(D::Error::invalid_type(Unexpected::Unit, &"a scalar")),
        Value::Array(_) => Err(D::Error::invalid_type(Unexpected::Seq, &"a scalar")),
        Value::Object(_) => Err(D::Error::invalid_type(Unexpected::Map, &"a scalar")),
    }
}

/// [`scalar_text`] for optional keys; `null` reads as absent
pub(crate) fn optional_scalar_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<ScalarText>::deserialize(deserializer).map(|text| text.map(|text| text.0))
}

/// Text scalar usable as a collection element
pub(crate) struct ScalarText(pub(crate) String);

impl<'de> Deserialize<'de> for ScalarText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        scalar_text(deserializer).map(ScalarText)
    }
}

/// Function, method, or constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared native type, verbatim
    #[serde(rename = "type")]
    pub ty: String,
    /// Default value expression
    #[serde(
        default,
        deserialize_with = "optional_scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Create a new parameter
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: None,
            description: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// How a field may be accessed from the host side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccessMode {
    #[default]
    #[serde(rename = "rw", alias = "read-write", alias = "read_write")]
    ReadWrite,
    #[serde(rename = "ro", alias = "read-only", alias = "read_only")]
    ReadOnly,
    #[serde(rename = "wo", alias = "write-only", alias = "write_only")]
    WriteOnly,
}

impl AccessMode {
    fn is_default(&self) -> bool {
        *self == AccessMode::ReadWrite
    }
}

/// How a field is bound, derived from its getter/setter/access combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldBinding<'a> {
    /// Getter and setter: synthesized read-write property
    Property { getter: &'a str, setter: &'a str },
    /// Getter on a read-only field
    ReadOnly { getter: &'a str },
    /// Setter on a write-only field
    WriteOnly { setter: &'a str },
    /// Direct member binding
    Direct { member: &'a str },
}

/// Class field or synthesized property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Exposed name
    pub name: String,
    /// Declared native type
    #[serde(rename = "type")]
    pub ty: String,
    /// Access mode
    #[serde(default, skip_serializing_if = "AccessMode::is_default")]
    pub access: AccessMode,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value expression
    #[serde(
        default,
        deserialize_with = "optional_scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    /// Native member name when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_name: Option<String>,
    /// Getter method name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<String>,
    /// Setter method name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
}

impl Field {
    /// Create a read-write field
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            access: AccessMode::ReadWrite,
            description: None,
            default: None,
            cpp_name: None,
            getter: None,
            setter: None,
        }
    }

    /// Set the access mode
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Set the native member name
    pub fn with_cpp_name(mut self, cpp_name: impl Into<String>) -> Self {
        self.cpp_name = Some(cpp_name.into());
        self
    }

    /// Set the getter method
    pub fn with_getter(mut self, getter: impl Into<String>) -> Self {
        self.getter = Some(getter.into());
        self
    }

    /// Set the setter method
    pub fn with_setter(mut self, setter: impl Into<String>) -> Self {
        self.setter = Some(setter.into());
        self
    }

    /// Native member name
    pub fn cpp_name(&self) -> &str {
        self.cpp_name.as_deref().unwrap_or(&self.name)
    }

    /// Select the binding shape
    pub fn binding(&self) -> FieldBinding<'_> {
        match (self.getter.as_deref(), self.setter.as_deref(), self.access) {
            (Some(getter), Some(setter), _) => FieldBinding::Property { getter, setter },
            (Some(getter), None, AccessMode::ReadOnly) => FieldBinding::ReadOnly { getter },
            (None, Some(setter), AccessMode::WriteOnly) => FieldBinding::WriteOnly { setter },
            _ => FieldBinding::Direct {
                member: self.cpp_name(),
            },
        }
    }
}

/// Identity of a method for overload purposes
///
/// Return type and static-ness are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentity {
    pub name: String,
    pub param_types: Vec<String>,
    pub is_const: bool,
}

/// Class method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// Exposed name
    pub name: String,
    /// Declared return type
    #[serde(default = "default_return")]
    pub returns: String,
    /// Ordered parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "const", default, skip_serializing_if = "is_false")]
    pub is_const: bool,
    #[serde(rename = "virtual", default, skip_serializing_if = "is_false")]
    pub is_virtual: bool,
    #[serde(rename = "pure_virtual", default, skip_serializing_if = "is_false")]
    pub is_pure_virtual: bool,
    #[serde(rename = "override", default, skip_serializing_if = "is_false")]
    pub is_override: bool,
    #[serde(rename = "static", default, skip_serializing_if = "is_false")]
    pub is_static: bool,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Native method name when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_name: Option<String>,
}

impl Method {
    /// Create a non-const instance method returning `returns`
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: returns.into(),
            parameters: Vec::new(),
            is_const: false,
            is_virtual: false,
            is_pure_virtual: false,
            is_override: false,
            is_static: false,
            description: None,
            cpp_name: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Mark as const
    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Mark as static
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as virtual
    pub fn virtual_method(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Mark as pure virtual
    pub fn pure_virtual(mut self) -> Self {
        self.is_virtual = true;
        self.is_pure_virtual = true;
        self
    }

    /// Mark as override
    pub fn override_method(mut self) -> Self {
        self.is_override = true;
        self
    }

    /// Set the native method name
    pub fn with_cpp_name(mut self, cpp_name: impl Into<String>) -> Self {
        self.cpp_name = Some(cpp_name.into());
        self
    }

    /// Native method name
    pub fn cpp_name(&self) -> &str {
        self.cpp_name.as_deref().unwrap_or(&self.name)
    }

    /// Declared parameter types in order
    pub fn param_types(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.ty.as_str()).collect()
    }

    /// Overload identity tuple
    pub fn identity(&self) -> MethodIdentity {
        MethodIdentity {
            name: self.name.clone(),
            param_types: self.parameters.iter().map(|p| p.ty.clone()).collect(),
            is_const: self.is_const,
        }
    }
}

/// Class constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Constructor {
    /// Ordered parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Constructor {
    /// Zero-parameter constructor
    pub fn default_constructor() -> Self {
        Self::default()
    }

    /// Constructor with the given parameters
    pub fn with_params(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            description: None,
        }
    }

    /// Declared parameter types in order
    pub fn param_types(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.ty.as_str()).collect()
    }
}

/// Inheritance kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceKind {
    #[default]
    Normal,
    Virtual,
}

/// Access specifier on a base class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessSpecifier {
    #[default]
    Public,
    Protected,
    Private,
}

/// Reference to a base class by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BaseClass {
    /// Base class name (public or native)
    pub name: String,
    /// Inheritance kind
    #[serde(rename = "inheritance")]
    pub inheritance: InheritanceKind,
    /// Access specifier
    pub access: AccessSpecifier,
}

impl BaseClass {
    /// Public, non-virtual base
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inheritance: InheritanceKind::Normal,
            access: AccessSpecifier::Public,
        }
    }

    /// Virtual base
    pub fn virtual_base(mut self) -> Self {
        self.inheritance = InheritanceKind::Virtual;
        self
    }

    /// Set the access specifier
    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = access;
        self
    }
}

impl<'de> Deserialize<'de> for BaseClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full {
                name: String,
                #[serde(default)]
                inheritance: InheritanceKind,
                #[serde(default)]
                access: AccessSpecifier,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Name(name) => BaseClass::new(name),
            Repr::Full {
                name,
                inheritance,
                access,
            } => BaseClass {
                name,
                inheritance,
                access,
            },
        })
    }
}

/// Class description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Exposed name
    pub name: String,
    /// Native class name when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_class: Option<String>,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Method>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<Constructor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_classes: Vec<BaseClass>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_polymorphic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_detect_properties: bool,
}

impl Class {
    /// Create an empty class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpp_class: None,
            description: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            base_classes: Vec::new(),
            is_abstract: false,
            is_polymorphic: false,
            auto_detect_properties: false,
        }
    }

    /// Add a field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a base class
    pub fn base(mut self, base: BaseClass) -> Self {
        self.base_classes.push(base);
        self
    }

    /// Set the native class name
    pub fn with_cpp_class(mut self, cpp_class: impl Into<String>) -> Self {
        self.cpp_class = Some(cpp_class.into());
        self
    }

    /// Mark as abstract
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Native class name
    pub fn cpp_name(&self) -> &str {
        self.cpp_class.as_deref().unwrap_or(&self.name)
    }

    /// True when `name` is either the public or the native name
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.cpp_name() == name
    }

    /// Give a class without constructors its implicit default constructor
    pub fn ensure_default_constructor(&mut self) {
        if self.constructors.is_empty() {
            self.constructors.push(Constructor::default_constructor());
        }
    }
}

/// Free function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Exposed name
    pub name: String,
    /// Native function name when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_name: Option<String>,
    /// Declared return type
    #[serde(default = "default_return")]
    pub returns: String,
    /// Ordered parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Function {
    /// Create a function returning `returns`
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpp_name: None,
            returns: returns.into(),
            parameters: Vec::new(),
            description: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Set the native function name
    pub fn with_cpp_name(mut self, cpp_name: impl Into<String>) -> Self {
        self.cpp_name = Some(cpp_name.into());
        self
    }

    /// Native function name
    pub fn cpp_function_name(&self) -> &str {
        self.cpp_name.as_deref().unwrap_or(&self.name)
    }

    /// True when `name` is either the public or the native name
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.cpp_function_name() == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_binding_shapes() {
        let property = Field::new("name", "std::string")
            .with_getter("getName")
            .with_setter("setName");
        assert_eq!(
            property.binding(),
            FieldBinding::Property {
                getter: "getName",
                setter: "setName"
            }
        );

        let readonly = Field::new("id", "int")
            .with_access(AccessMode::ReadOnly)
            .with_getter("getId");
        assert_eq!(readonly.binding(), FieldBinding::ReadOnly { getter: "getId" });

        let writeonly = Field::new("secret", "int")
            .with_access(AccessMode::WriteOnly)
            .with_setter("setSecret");
        assert_eq!(
            writeonly.binding(),
            FieldBinding::WriteOnly {
                setter: "setSecret"
            }
        );

        // A getter on a read-write field without a setter stays a direct binding
        let direct = Field::new("x", "double").with_getter("getX").with_cpp_name("x_");
        assert_eq!(direct.binding(), FieldBinding::Direct { member: "x_" });
    }

    #[test]
    fn test_method_identity_ignores_return_and_static() {
        let a = Method::new("area", "double").constant();
        let b = Method::new("area", "float").constant().static_method();
        assert_eq!(a.identity(), b.identity());

        let c = Method::new("area", "double");
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_base_class_from_string_or_map() {
        let plain: BaseClass = serde_json::from_value(serde_json::json!("Shape")).unwrap();
        assert_eq!(plain, BaseClass::new("Shape"));

        let full: BaseClass = serde_json::from_value(serde_json::json!({
            "name": "Node",
            "inheritance": "virtual",
            "access": "protected"
        }))
        .unwrap();
        assert_eq!(full.inheritance, InheritanceKind::Virtual);
        assert_eq!(full.access, AccessSpecifier::Protected);
    }

    #[test]
    fn test_method_document_defaults() {
        let method: Method = serde_json::from_value(serde_json::json!({
            "name": "reset",
            "const": true
        }))
        .unwrap();
        assert_eq!(method.returns, "void");
        assert!(method.is_const);
        assert!(!method.is_static);
        assert!(method.parameters.is_empty());
    }

    #[test]
    fn test_default_constructor_added_once() {
        let mut class = Class::new("Point");
        class.ensure_default_constructor();
        class.ensure_default_constructor();
        assert_eq!(class.constructors.len(), 1);
        assert!(class.constructors[0].parameters.is_empty());
    }
}
