//! Overload resolution
//!
//! Host environments register methods by name, so every method of a class
//! needs an emission name that is unique within the class, and a pointer
//! expression that selects exactly one native overload.
//!
//! Methods sharing a declared name get a suffix derived from their
//! parameter types (`area()` becomes `area_void`, `area(double)` becomes
//! `area_double`). Plain and static overloads are additionally wrapped in a
//! `static_cast` to the exact member or function pointer type, as is any
//! plain or static method whose native name another method shares. Virtual,
//! override and pure-virtual members are registered through their own
//! calls and never cast.
//!
//! A method declared twice with the same `(name, parameter types, const)`
//! identity is kept once; later copies are recorded as skipped. With
//! [`ResolveOptions::strict`] each skip is also reported as `O001`.

use crate::diagnostics::{Diagnosed, Diagnostic, Diagnostics};
use crate::ir::{overload_token, Class, InterfaceDefinition, Method, MethodIdentity};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Resolver settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Warn when a duplicate declaration is collapsed
    pub strict: bool,
}

impl ResolveOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// How a method is registered, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmissionForm {
    PureVirtual,
    Static,
    Override,
    Virtual,
    Plain,
}

impl EmissionForm {
    /// Select the form from method flags
    pub fn of(method: &Method) -> Self {
        if method.is_pure_virtual {
            EmissionForm::PureVirtual
        } else if method.is_static {
            EmissionForm::Static
        } else if method.is_override {
            EmissionForm::Override
        } else if method.is_virtual {
            EmissionForm::Virtual
        } else {
            EmissionForm::Plain
        }
    }

    /// Forms that may receive a disambiguating cast
    pub fn is_castable(&self) -> bool {
        matches!(self, EmissionForm::Static | EmissionForm::Plain)
    }
}

/// Emission plan for one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPlan {
    /// Index into `Class::methods`
    pub method_index: usize,
    /// Name the method is registered under
    pub emission_name: String,
    /// True when another kept method shares the declared name
    pub overloaded: bool,
    pub form: EmissionForm,
    /// Exact pointer type when a cast is needed (e.g. `double (Rectangle::*)(double) const`)
    pub signature: Option<String>,
    /// Expression naming the native member, cast when `signature` is set
    pub pointer: String,
}

/// Emission plan for one class, methods in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPlan {
    pub methods: Vec<MethodPlan>,
    /// Indices of duplicate declarations that are not emitted
    pub skipped: Vec<usize>,
}

impl ClassPlan {
    /// Plan for the method at `method_index`, `None` if it was skipped
    pub fn method(&self, method_index: usize) -> Option<&MethodPlan> {
        self.methods
            .iter()
            .find(|plan| plan.method_index == method_index)
    }

    /// Overloaded declared names with their emission names
    pub fn overload_groups<'a>(&'a self, class: &'a Class) -> IndexMap<&'a str, Vec<&'a str>> {
        let mut groups: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for plan in self.methods.iter().filter(|plan| plan.overloaded) {
            if let Some(method) = class.methods.get(plan.method_index) {
                groups
                    .entry(method.name.as_str())
                    .or_default()
                    .push(plan.emission_name.as_str());
            }
        }
        groups
    }
}

/// Emission plans for every class, aligned with `InterfaceDefinition::classes`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverloadPlan {
    pub classes: Vec<ClassPlan>,
}

impl OverloadPlan {
    /// Plan for the class at `class_index`
    pub fn class(&self, class_index: usize) -> Option<&ClassPlan> {
        self.classes.get(class_index)
    }

    /// Total number of duplicate declarations collapsed
    pub fn skipped_count(&self) -> usize {
        self.classes.iter().map(|plan| plan.skipped.len()).sum()
    }
}

/// Resolve every class of a definition
pub fn resolve(
    definition: &InterfaceDefinition,
    options: ResolveOptions,
) -> Diagnosed<OverloadPlan> {
    let mut diagnostics = Diagnostics::new();
    let classes = definition
        .classes
        .iter()
        .map(|class| resolve_class(class, options, &mut diagnostics))
        .collect();

    Diagnosed::ok(OverloadPlan { classes }, diagnostics)
}

/// Resolve one class
pub fn resolve_class(
    class: &Class,
    options: ResolveOptions,
    diagnostics: &mut Diagnostics,
) -> ClassPlan {
    let mut seen: HashSet<MethodIdentity> = HashSet::new();
    let mut kept = Vec::new();
    let mut skipped = Vec::new();

    for (index, method) in class.methods.iter().enumerate() {
        if seen.insert(method.identity()) {
            kept.push(index);
            continue;
        }
        skipped.push(index);
        if options.strict {
            diagnostics.push(
                Diagnostic::warning(format!(
                    "duplicate declaration of '{}' skipped",
                    describe(method)
                ))
                .in_context(format!("class {}", class.name))
                .with_code("O001"),
            );
        }
    }

    let mut by_name: IndexMap<&str, usize> = IndexMap::new();
    let mut by_native: IndexMap<&str, usize> = IndexMap::new();
    for &index in &kept {
        let method = &class.methods[index];
        *by_name.entry(method.name.as_str()).or_default() += 1;
        *by_native.entry(method.cpp_name()).or_default() += 1;
    }

    let methods: Vec<MethodPlan> = kept
        .into_iter()
        .map(|index| {
            let method = &class.methods[index];
            let overloaded = by_name.get(method.name.as_str()).copied().unwrap_or(0) > 1;
            let ambiguous = by_native.get(method.cpp_name()).copied().unwrap_or(0) > 1;
            plan_method(class, method, index, overloaded, ambiguous)
        })
        .collect();

    debug!(
        class = %class.name,
        methods = methods.len(),
        overloaded = methods.iter().filter(|plan| plan.overloaded).count(),
        skipped = skipped.len(),
        "resolved overloads"
    );

    ClassPlan { methods, skipped }
}

fn plan_method(
    class: &Class,
    method: &Method,
    method_index: usize,
    overloaded: bool,
    ambiguous: bool,
) -> MethodPlan {
    let form = EmissionForm::of(method);
    let emission_name = if overloaded {
        format!("{}_{}", method.name, overload_suffix(method))
    } else {
        method.name.clone()
    };

    let address = format!("&{}::{}", class.cpp_name(), method.cpp_name());
    let signature =
        ((overloaded || ambiguous) && form.is_castable()).then(|| pointer_signature(class, method));
    let pointer = match &signature {
        Some(signature) => format!("static_cast<{}>({})", signature, address),
        None => address,
    };

    MethodPlan {
        method_index,
        emission_name,
        overloaded,
        form,
        signature,
        pointer,
    }
}

/// Suffix appended to an overloaded method's name
pub fn overload_suffix(method: &Method) -> String {
    if method.parameters.is_empty() {
        return "void".to_string();
    }
    method
        .parameters
        .iter()
        .map(|param| overload_token(&param.ty))
        .collect::<Vec<_>>()
        .join("_")
}

/// Member or function pointer type selecting exactly this method
pub fn pointer_signature(class: &Class, method: &Method) -> String {
    let params = method.param_types().join(", ");
    if method.is_static {
        format!("{} (*)({})", method.returns, params)
    } else {
        format!(
            "{} ({}::*)({}){}",
            method.returns,
            class.cpp_name(),
            params,
            if method.is_const { " const" } else { "" }
        )
    }
}

fn describe(method: &Method) -> String {
    format!(
        "{}({}){}",
        method.name,
        method.param_types().join(", "),
        if method.is_const { " const" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Module, Parameter};
    use pretty_assertions::assert_eq;

    fn rectangle() -> Class {
        Class::new("Rectangle")
            .method(Method::new("area", "double").constant())
            .method(
                Method::new("area", "double")
                    .constant()
                    .param(Parameter::new("scale", "double")),
            )
            .method(Method::new("width", "double").constant())
    }

    #[test]
    fn test_rectangle_area_overloads() {
        let plan = resolve_class(&rectangle(), ResolveOptions::default(), &mut Diagnostics::new());

        let names: Vec<_> = plan.methods.iter().map(|m| m.emission_name.as_str()).collect();
        assert_eq!(names, vec!["area_void", "area_double", "width"]);

        assert_eq!(
            plan.methods[0].pointer,
            "static_cast<double (Rectangle::*)() const>(&Rectangle::area)"
        );
        assert_eq!(
            plan.methods[1].pointer,
            "static_cast<double (Rectangle::*)(double) const>(&Rectangle::area)"
        );
        assert_eq!(plan.methods[2].pointer, "&Rectangle::width");
        assert!(!plan.methods[2].overloaded);
    }

    #[test]
    fn test_suffix_strips_qualifiers_and_namespaces() {
        let method = Method::new("set", "void")
            .param(Parameter::new("v", "const geo::Vector3D&"))
            .param(Parameter::new("items", "std::vector<int>*"))
            .param(Parameter::new("n", "unsigned int"));
        assert_eq!(overload_suffix(&method), "vector3d_vector_unsigned_int");
    }

    #[test]
    fn test_distinct_signatures_give_distinct_names() {
        let class = Class::new("Canvas")
            .method(Method::new("draw", "void"))
            .method(Method::new("draw", "void").param(Parameter::new("x", "int")))
            .method(Method::new("draw", "void").param(Parameter::new("x", "double")))
            .method(
                Method::new("draw", "void")
                    .param(Parameter::new("x", "int"))
                    .param(Parameter::new("y", "int")),
            );
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());

        let names: HashSet<_> = plan.methods.iter().map(|m| m.emission_name.clone()).collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_static_overload_uses_function_pointer() {
        let class = Class::new("Factory")
            .method(Method::new("make", "Factory").static_method())
            .method(
                Method::new("make", "Factory")
                    .static_method()
                    .param(Parameter::new("seed", "int")),
            );
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());
        assert_eq!(plan.methods[0].form, EmissionForm::Static);
        assert_eq!(
            plan.methods[1].pointer,
            "static_cast<Factory (*)(int)>(&Factory::make)"
        );
    }

    #[test]
    fn test_virtual_overloads_are_not_cast() {
        let class = Class::new("Shape")
            .method(Method::new("draw", "void").pure_virtual())
            .method(
                Method::new("draw", "void")
                    .virtual_method()
                    .param(Parameter::new("scale", "double")),
            );
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());

        assert_eq!(plan.methods[0].form, EmissionForm::PureVirtual);
        assert_eq!(plan.methods[0].emission_name, "draw_void");
        assert_eq!(plan.methods[0].signature, None);
        assert_eq!(plan.methods[1].form, EmissionForm::Virtual);
        assert_eq!(plan.methods[1].pointer, "&Shape::draw");
    }

    #[test]
    fn test_flag_precedence() {
        let both = Method::new("f", "void").static_method().override_method();
        assert_eq!(EmissionForm::of(&both), EmissionForm::Static);

        let overriding_virtual = Method::new("f", "void").virtual_method().override_method();
        assert_eq!(EmissionForm::of(&overriding_virtual), EmissionForm::Override);
    }

    #[test]
    fn test_duplicates_collapse_before_grouping() {
        let class = Class::new("Point")
            .method(Method::new("norm", "double").constant())
            .method(Method::new("norm", "double").constant());

        let mut diagnostics = Diagnostics::new();
        let plan = resolve_class(&class, ResolveOptions::default(), &mut diagnostics);
        assert_eq!(plan.methods.len(), 1);
        assert_eq!(plan.methods[0].emission_name, "norm");
        assert_eq!(plan.skipped, vec![1]);
        assert!(plan.method(1).is_none());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_strict_mode_warns_on_collapse() {
        let class = Class::new("Point")
            .method(Method::new("norm", "double").constant())
            .method(Method::new("norm", "float").constant());
        let def = InterfaceDefinition::new(Module::new("m")).class(class);

        let result = resolve(&def, ResolveOptions::strict());
        assert_eq!(result.diagnostics.warning_count(), 1);
        let warning = result.diagnostics.warnings().next().unwrap();
        assert_eq!(warning.code, Some("O001"));
        assert_eq!(warning.message, "duplicate declaration of 'norm() const' skipped");
        assert_eq!(result.value.unwrap().skipped_count(), 1);
    }

    #[test]
    fn test_aliased_overloads_still_cast() {
        let class = Class::new("Rectangle")
            .method(Method::new("area0", "double").with_cpp_name("area"))
            .method(
                Method::new("area1", "double")
                    .with_cpp_name("area")
                    .param(Parameter::new("scale", "double")),
            );
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());
        assert_eq!(plan.methods[0].emission_name, "area0");
        assert!(!plan.methods[0].overloaded);
        assert_eq!(
            plan.methods[0].pointer,
            "static_cast<double (Rectangle::*)()>(&Rectangle::area)"
        );
    }

    #[test]
    fn test_overloads_with_distinct_native_names_still_cast() {
        let class = Class::new("Sprite")
            .method(
                Method::new("scale", "void")
                    .with_cpp_name("scaleUniform")
                    .param(Parameter::new("factor", "double")),
            )
            .method(
                Method::new("scale", "void")
                    .with_cpp_name("scaleAxes")
                    .param(Parameter::new("x", "double"))
                    .param(Parameter::new("y", "double")),
            )
            .method(Method::new("reset", "void"));
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());

        assert_eq!(plan.methods[0].emission_name, "scale_double");
        assert_eq!(
            plan.methods[0].pointer,
            "static_cast<void (Sprite::*)(double)>(&Sprite::scaleUniform)"
        );
        assert_eq!(
            plan.methods[1].pointer,
            "static_cast<void (Sprite::*)(double, double)>(&Sprite::scaleAxes)"
        );
        assert_eq!(plan.methods[2].signature, None);
        assert_eq!(plan.methods[2].pointer, "&Sprite::reset");
    }

    #[test]
    fn test_dsl_getter_overload_casts_to_const_member() {
        let source = "module m {\n}\nclass C {\n    method length(): double\n    method length(int axis): double\n    mutable method length(double scale): double\n}\n";
        let def = crate::parse::parse_str(source, crate::parse::Format::Dsl)
            .value
            .unwrap();
        let plan = resolve(&def, ResolveOptions::default()).value.unwrap();
        let methods = &plan.class(0).unwrap().methods;

        assert_eq!(methods[0].signature.as_deref(), Some("double (C::*)() const"));
        assert_eq!(methods[1].signature.as_deref(), Some("double (C::*)(int) const"));
        assert_eq!(methods[2].signature.as_deref(), Some("double (C::*)(double)"));
    }

    #[test]
    fn test_overload_groups() {
        let class = rectangle();
        let plan = resolve_class(&class, ResolveOptions::default(), &mut Diagnostics::new());
        let groups = plan.overload_groups(&class);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["area"], vec!["area_void", "area_double"]);
    }
}
