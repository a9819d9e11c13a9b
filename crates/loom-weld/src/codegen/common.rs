//! Shared registration traversal
//!
//! Every target registers the same entities in the same order through the
//! same registration vocabulary; only the surrounding file differs. The
//! [`Registrar`] renders those shared pieces.

use crate::diagnostics::Diagnostics;
use crate::ir::{
    AccessSpecifier, Class, ConverterKind, Field, FieldBinding, InheritanceKind,
    InterfaceDefinition, LibraryConfig, TypeConverter,
};
use crate::overload::{
    resolve_class, ClassPlan, EmissionForm, MethodPlan, OverloadPlan, ResolveOptions,
};
use std::borrow::Cow;

/// Horizontal rule used in generated file banners
pub const RULE: &str =
    "// ============================================================================";

/// Banner at the top of every generated source file
pub fn banner(title: &str) -> String {
    format!(
        "{rule}\n// {title}\n// Auto-generated by loom - DO NOT EDIT\n{rule}\n",
        rule = RULE,
        title = title
    )
}

/// Section heading inside a generated source file
pub fn section(title: &str) -> String {
    format!("{rule}\n// {title}\n{rule}\n\n", rule = RULE, title = title)
}

/// Renders the registration pieces shared by all targets
pub struct Registrar<'a> {
    definition: &'a InterfaceDefinition,
    plan: &'a OverloadPlan,
}

impl<'a> Registrar<'a> {
    /// Create a new registrar
    pub fn new(definition: &'a InterfaceDefinition, plan: &'a OverloadPlan) -> Self {
        Self { definition, plan }
    }

    pub fn definition(&self) -> &'a InterfaceDefinition {
        self.definition
    }

    /// Plan for the class at `index`, resolved on the spot if the plan lacks it
    pub fn class_plan(&self, index: usize) -> Cow<'a, ClassPlan> {
        match self.plan.class(index) {
            Some(plan) => Cow::Borrowed(plan),
            None => match self.definition.classes.get(index) {
                Some(class) => Cow::Owned(resolve_class(
                    class,
                    ResolveOptions::default(),
                    &mut Diagnostics::new(),
                )),
                None => Cow::Owned(ClassPlan::default()),
            },
        }
    }

    /// `#include` lines for the description's headers
    pub fn includes(&self) -> String {
        self.definition
            .includes
            .iter()
            .map(|include| format!("{}\n", include.formatted()))
            .collect()
    }

    /// `using namespace` line when the module declares one
    pub fn namespace(&self) -> String {
        match &self.definition.module.namespace {
            Some(namespace) => format!("using namespace {};\n", namespace),
            None => String::new(),
        }
    }

    /// Native class names, comma separated
    pub fn class_list(&self) -> String {
        self.definition.class_names().join(", ")
    }

    /// One `ROSETTA_REGISTER_CLASS` chain per class, in declaration order
    pub fn class_registrations(&self) -> String {
        self.definition
            .classes
            .iter()
            .enumerate()
            .map(|(index, class)| self.class_registration(class, &self.class_plan(index)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn class_registration(&self, class: &Class, plan: &ClassPlan) -> String {
        let cls = class.cpp_name();
        let mut out = format!("    // Register {}\n", class.name);
        if let Some(description) = &class.description {
            out.push_str(&format!("    // {}\n", description));
        }
        out.push_str(&format!("    ROSETTA_REGISTER_CLASS({})\n", cls));

        if !is_abstract(class) {
            for constructor in &class.constructors {
                out.push_str(&format!(
                    "        .constructor<{}>()\n",
                    constructor.param_types().join(", ")
                ));
            }
        }

        for base in &class.base_classes {
            let base_name = self
                .definition
                .find_class(&base.name)
                .map_or(base.name.as_str(), Class::cpp_name);
            match (base.access, base.inheritance) {
                (AccessSpecifier::Public, InheritanceKind::Normal) => {
                    out.push_str(&format!("        .inherits_from<{}>()\n", base_name));
                }
                (AccessSpecifier::Public, InheritanceKind::Virtual) => {
                    out.push_str(&format!(
                        "        .virtually_inherits_from<{}>()\n",
                        base_name
                    ));
                }
                (access, _) => {
                    out.push_str(&format!(
                        "        // {} base {} is not exposed\n",
                        access_label(access),
                        base_name
                    ));
                }
            }
        }

        for field in &class.fields {
            out.push_str(&field_registration(cls, field));
        }

        for method_plan in &plan.methods {
            if let Some(method) = class.methods.get(method_plan.method_index) {
                out.push_str(&method_registration(method_plan, method));
            }
        }

        if class.auto_detect_properties {
            out.push_str("        .auto_detect_properties()\n");
        }
        out.push_str("        ;\n");
        out
    }

    /// Converter registration calls against `receiver`
    pub fn converter_registrations(&self, receiver: &str) -> String {
        self.definition
            .converters
            .iter()
            .map(|converter| format!("    {}\n", converter_registration(converter, receiver)))
            .collect()
    }

    /// Free function bindings against `receiver`
    pub fn function_bindings(&self, receiver: &str) -> String {
        self.definition
            .functions
            .iter()
            .map(|function| {
                format!(
                    "    {}.bind_function(\"{}\", &{});\n",
                    receiver,
                    function.name,
                    function.cpp_function_name()
                )
            })
            .collect()
    }

    /// Members a smoke test may touch: up to three fields and two
    /// zero-argument instance methods (by emission name)
    pub fn smoke_members(&self, index: usize) -> (Vec<&'a Field>, Vec<String>) {
        let Some(class) = self.definition.classes.get(index) else {
            return (Vec::new(), Vec::new());
        };
        let plan = self.class_plan(index);

        let fields = class
            .fields
            .iter()
            .filter(|field| !matches!(field.binding(), FieldBinding::WriteOnly { .. }))
            .take(3)
            .collect();
        let methods = plan
            .methods
            .iter()
            .filter(|method_plan| {
                class.methods.get(method_plan.method_index).is_some_and(|method| {
                    method.parameters.is_empty() && !method.is_static && !method.is_pure_virtual
                })
            })
            .take(2)
            .map(|method_plan| method_plan.emission_name.clone())
            .collect();
        (fields, methods)
    }
}

/// CMake include, link-directory and link lines for the native library
pub fn cmake_link_lines(target: &str, library: Option<&LibraryConfig>) -> String {
    let Some(library) = library else {
        return String::new();
    };
    let mut out = String::new();
    if !library.include_dirs.is_empty() {
        out.push_str(&format!(
            "target_include_directories({} PRIVATE {})\n",
            target,
            library.include_dirs.join(" ")
        ));
    }
    if !library.link_dirs.is_empty() {
        out.push_str(&format!(
            "target_link_directories({} PRIVATE {})\n",
            target,
            library.link_dirs.join(" ")
        ));
    }
    let linked = library.path.as_deref().unwrap_or(&library.name);
    out.push_str(&format!("target_link_libraries({} PRIVATE {})\n", target, linked));
    out
}

/// Abstract classes have no registered constructors
pub fn is_abstract(class: &Class) -> bool {
    class.is_abstract || class.methods.iter().any(|method| method.is_pure_virtual)
}

fn access_label(access: AccessSpecifier) -> &'static str {
    match access {
        AccessSpecifier::Public => "public",
        AccessSpecifier::Protected => "protected",
        AccessSpecifier::Private => "private",
    }
}

fn field_registration(cls: &str, field: &Field) -> String {
    match field.binding() {
        FieldBinding::Property { getter, setter } => format!(
            "        .property<{}>(\"{}\", &{cls}::{}, &{cls}::{})\n",
            field.ty,
            field.name,
            getter,
            setter,
            cls = cls
        ),
        FieldBinding::ReadOnly { getter } => format!(
            "        .readonly_property<{}>(\"{}\", &{}::{})\n",
            field.ty, field.name, cls, getter
        ),
        FieldBinding::WriteOnly { setter } => format!(
            "        .writeonly_property<{}>(\"{}\", &{}::{})\n",
            field.ty, field.name, cls, setter
        ),
        FieldBinding::Direct { member } => {
            format!("        .field(\"{}\", &{}::{})\n", field.name, cls, member)
        }
    }
}

fn method_registration(plan: &MethodPlan, method: &crate::ir::Method) -> String {
    match plan.form {
        EmissionForm::PureVirtual => {
            let mut signature = vec![method.returns.as_str()];
            signature.extend(method.param_types());
            format!(
                "        .pure_virtual_method<{}>(\"{}\")\n",
                signature.join(", "),
                plan.emission_name
            )
        }
        EmissionForm::Static => format!(
            "        .static_method(\"{}\", {})\n",
            plan.emission_name, plan.pointer
        ),
        EmissionForm::Override => format!(
            "        .override_method(\"{}\", {})\n",
            plan.emission_name, plan.pointer
        ),
        EmissionForm::Virtual => format!(
            "        .virtual_method(\"{}\", {})\n",
            plan.emission_name, plan.pointer
        ),
        EmissionForm::Plain => format!(
            "        .method(\"{}\", {})\n",
            plan.emission_name, plan.pointer
        ),
    }
}

/// Registration line for one converter
pub fn converter_registration(converter: &TypeConverter, receiver: &str) -> String {
    let args = converter.type_args();
    match (converter.kind().registration_fn(), &converter.custom_converter) {
        (_, Some(custom)) => format!(
            "register_custom_converter<{}>({}, &{});",
            converter.ty, receiver, custom
        ),
        (Some(_), None) if args.is_empty() => format!(
            "// cannot register {}: missing template arguments",
            converter.ty
        ),
        (Some(function), None) => {
            let args = match converter.kind() {
                ConverterKind::FixedArray | ConverterKind::Mapping => args.join(", "),
                _ => args[0].to_string(),
            };
            format!("{}<{}>({});", function, args, receiver)
        }
        (None, None) => format!(
            "// no converter for {}: declare a custom_converter",
            converter.ty
        ),
    }
}
