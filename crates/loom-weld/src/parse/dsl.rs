//! Block DSL parser
//!
//! ```text
//! module geometry {
//!     version: "1.2.0"
//!     targets {
//!         javascript {
//!             output_name: "geometry.node"
//!         }
//!     }
//! }
//!
//! include "mylib/Vector3D.h"
//!
//! class Circle : public Shape {
//!     constructor(double radius)
//!     field radius: double
//!     method area(): double
//!     mutable method resize(double radius)
//!     static method unit(): Circle
//! }
//!
//! function distance(const Vector3D& a, const Vector3D& b): double
//! ```
//!
//! The source is reduced to non-blank, comment-stripped lines and scanned
//! once with a [`LineCursor`]. Each block parser takes the cursor by
//! mutable reference and either returns its entity or a diagnostic; on
//! failure the top-level loop rewinds to the block header and skips the
//! whole block by brace counting, then carries on with the next block.
//!
//! Instance methods are const unless prefixed with `mutable`; static
//! methods never are.

use crate::diagnostics::{Diagnosed, Diagnostic, Diagnostics};
use crate::ir::{
    AccessSpecifier, BaseClass, Class, Constructor, Field, Function, Include, InheritanceKind,
    InterfaceDefinition, LibraryConfig, LinkKind, Method, Module, Parameter, TargetOptions,
    TypeConverter, Utilities,
};
use crate::ir::{brackets_balanced, split_top_level};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();
    static ref MODULE_HEADER: Regex =
        Regex::new(r"^module\s+([A-Za-z_]\w*)\s*\{\s*(\})?$").unwrap();
    static ref TARGETS_HEADER: Regex = Regex::new(r"^targets\s*\{\s*(\})?$").unwrap();
    static ref TARGET_HEADER: Regex = Regex::new(r"^([A-Za-z_][\w-]*)\s*\{\s*(\})?$").unwrap();
    static ref CLASS_HEADER: Regex = Regex::new(
        r"^((?:(?:abstract|polymorphic)\s+)*)class\s+([A-Za-z_]\w*)\s*(?::\s*([^{]*?))?\s*\{\s*(\})?$"
    )
    .unwrap();
    static ref CONVERTERS_HEADER: Regex = Regex::new(r"^converters\s*\{\s*(\})?$").unwrap();
    static ref UTILITIES_HEADER: Regex = Regex::new(r"^utilities\s*\{\s*(\})?$").unwrap();
    static ref LIBRARY_HEADER: Regex =
        Regex::new(r"^library\s+([A-Za-z_][\w-]*)\s*\{\s*(\})?$").unwrap();
    static ref INCLUDE_LINE: Regex =
        Regex::new(r#"^include\s+(?:"([^"]+)"|(<[^>]+>))$"#).unwrap();
    static ref KEY_VALUE: Regex = Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.*)$").unwrap();
    static ref BASE_SPEC: Regex = Regex::new(
        r"^((?:(?:virtual|public|protected|private)\s+)*)([A-Za-z_][\w:]*(?:<.*>)?)$"
    )
    .unwrap();
    static ref FIELD_LINE: Regex = Regex::new(
        r"^field\s+([A-Za-z_]\w*)\s*:\s*(.+?)(?:\s+as\s+([A-Za-z_]\w*))?$"
    )
    .unwrap();
    static ref METHOD_LINE: Regex =
        Regex::new(r"^((?:(?:static|virtual|override|pure|mutable)\s+)*)method\s+(.+)$").unwrap();
    static ref SIGNATURE_TAIL: Regex = Regex::new(
        r"^(const\b)?\s*(?::\s*(.+?))?\s*(?:\bas\s+([A-Za-z_]\w*))?$"
    )
    .unwrap();
}

/// Builtin type words that are never a parameter name
const BUILTIN_WORDS: &[&str] = &[
    "int", "char", "short", "long", "float", "double", "bool", "signed", "unsigned", "void",
    "const", "volatile",
];

/// One significant source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-indexed line number in the original text
    pub number: usize,
    /// Comment-stripped, trimmed text
    pub text: String,
}

/// Forward cursor over significant lines
#[derive(Debug, Clone)]
pub struct LineCursor {
    lines: Vec<SourceLine>,
    pos: usize,
}

impl LineCursor {
    /// Create a cursor, dropping comments and blank lines
    pub fn new(source: &str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let code = match raw.find('#') {
                    Some(pos) => &raw[..pos],
                    None => raw,
                };
                let code = code.trim().trim_end_matches(';').trim_end();
                (!code.is_empty()).then(|| SourceLine {
                    number: idx + 1,
                    text: code.to_string(),
                })
            })
            .collect();

        Self { lines, pos: 0 }
    }

    pub fn peek(&self) -> Option<&SourceLine> {
        self.lines.get(self.pos)
    }

    pub fn advance(&mut self) {
        if self.pos < self.lines.len() {
            self.pos += 1;
        }
    }

    /// Take the current line and move past it
    pub fn next_line(&mut self) -> Option<SourceLine> {
        let line = self.lines.get(self.pos).cloned();
        self.advance();
        line
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos.min(self.lines.len());
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Skip the block opened by the current line, nested blocks included
    pub fn skip_block(&mut self) {
        if let Some(opener) = self.next_line() {
            self.skip_remainder(&opener);
        }
    }

    /// Skip what is left of a block whose opening line was already taken
    pub fn skip_remainder(&mut self, opener: &SourceLine) {
        let mut depth = brace_balance(&opener.text);
        while depth > 0 {
            let Some(line) = self.next_line() else {
                break;
            };
            depth += brace_balance(&line.text);
        }
    }
}

fn brace_balance(text: &str) -> i64 {
    text.matches('{').count() as i64 - text.matches('}').count() as i64
}

/// Parse DSL source text
pub fn parse_dsl(source: &str) -> Diagnosed<InterfaceDefinition> {
    let mut cursor = LineCursor::new(source);
    let mut diagnostics = Diagnostics::new();

    let mut module: Option<Module> = None;
    let mut includes = Vec::new();
    let mut converters: Vec<TypeConverter> = Vec::new();
    let mut classes = Vec::new();
    let mut functions = Vec::new();
    let mut utilities = Utilities::default();
    let mut library = None;

    while let Some(line) = cursor.peek().cloned() {
        let start = cursor.position();
        let outcome = match leading_keyword(&line.text) {
            "module" => parse_module(&mut cursor, &mut diagnostics).map(|parsed| {
                if module.is_some() {
                    diagnostics.push(
                        Diagnostic::error(format!("duplicate module block '{}'", parsed.name))
                            .at_line(line.number)
                            .with_code("P015"),
                    );
                } else {
                    module = Some(parsed);
                }
            }),
            "include" => parse_include(&mut cursor).map(|include| includes.push(include)),
            "converters" => parse_converters(&mut cursor).map(|parsed| {
                for converter in parsed {
                    if !converters.contains(&converter) {
                        converters.push(converter);
                    }
                }
            }),
            "class" => parse_class(&mut cursor, &mut diagnostics).map(|class| classes.push(class)),
            "function" => parse_function(&mut cursor).map(|function| functions.push(function)),
            "utilities" => parse_utilities(&mut cursor, &mut diagnostics)
                .map(|parsed| utilities = parsed),
            "library" => parse_library(&mut cursor).map(|parsed| library = Some(parsed)),
            _ => {
                diagnostics.push(unexpected(&line, "top level"));
                cursor.skip_block();
                Ok(())
            }
        };

        if let Err(diagnostic) = outcome {
            diagnostics.push(diagnostic);
            cursor.rewind(start);
            cursor.skip_block();
        }
    }

    let Some(module) = module else {
        diagnostics.push(Diagnostic::error("missing required 'module' block").with_code("P005"));
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

/// First word of a line, skipping class modifiers
fn leading_keyword(text: &str) -> &str {
    text.split(|c: char| c.is_whitespace() || c == '{' || c == '(')
        .find(|word| !word.is_empty() && *word != "abstract" && *word != "polymorphic")
        .unwrap_or("")
}

fn unexpected(line: &SourceLine, context: &str) -> Diagnostic {
    Diagnostic::warning(format!("unexpected line '{}' ignored", line.text))
        .in_context(context)
        .at_line(line.number)
        .with_code("P013")
}

/// Warn about a line that was just taken; an unknown block goes with it
fn ignore_line(
    cursor: &mut LineCursor,
    line: &SourceLine,
    context: &str,
    diagnostics: &mut Diagnostics,
) {
    diagnostics.push(unexpected(line, context));
    cursor.skip_remainder(line);
}

fn invalid_header(what: &str, expected: &str, line: &SourceLine) -> Diagnostic {
    Diagnostic::error(format!(
        "invalid {} header '{}', expected '{}'",
        what, line.text, expected
    ))
    .at_line(line.number)
    .with_code("P010")
}

fn invalid_line(context: &str, message: String, line: &SourceLine) -> Diagnostic {
    Diagnostic::error(message)
        .in_context(context)
        .at_line(line.number)
        .with_code("P012")
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Consume block lines up to the closing brace
///
/// `on_line` must consume at least the line it is handed.
fn block_body<F>(
    cursor: &mut LineCursor,
    header: &SourceLine,
    context: &str,
    mut on_line: F,
) -> Result<(), Diagnostic>
where
    F: FnMut(&mut LineCursor, SourceLine) -> Result<(), Diagnostic>,
{
    loop {
        let Some(line) = cursor.peek().cloned() else {
            return Err(Diagnostic::error("unterminated block, expected '}'")
                .in_context(context)
                .at_line(header.number)
                .with_code("P011"));
        };
        if line.text == "}" {
            cursor.advance();
            return Ok(());
        }
        on_line(cursor, line)?;
    }
}

fn take_header(cursor: &mut LineCursor) -> Result<SourceLine, Diagnostic> {
    cursor.next_line().ok_or_else(|| {
        Diagnostic::error("unexpected end of input").with_code("P011")
    })
}

/// `module NAME { ... }`
pub fn parse_module(
    cursor: &mut LineCursor,
    diagnostics: &mut Diagnostics,
) -> Result<Module, Diagnostic> {
    let header = take_header(cursor)?;
    let caps = MODULE_HEADER
        .captures(&header.text)
        .ok_or_else(|| invalid_header("module", "module NAME {", &header))?;

    let mut module = Module::new(&caps[1]);
    if caps.get(2).is_some() {
        return Ok(module);
    }

    let context = format!("module {}", module.name);
    block_body(cursor, &header, &context, |cursor, line| {
        if TARGETS_HEADER.is_match(&line.text) {
            module.targets = parse_targets(cursor, &context, diagnostics)?;
            return Ok(());
        }
        cursor.advance();
        match KEY_VALUE.captures(&line.text) {
            Some(kv) => match &kv[1] {
                "name" => module.name = unquote(&kv[2]),
                "version" => module.version = unquote(&kv[2]),
                "description" => module.description = Some(unquote(&kv[2])),
                "namespace" => module.namespace = Some(unquote(&kv[2])),
                other => {
                    diagnostics.push(
                        Diagnostic::warning(format!("unknown module key '{}' ignored", other))
                            .in_context(context.as_str())
                            .at_line(line.number)
                            .with_code("P013"),
                    );
                    cursor.skip_remainder(&line);
                }
            },
            None => ignore_line(cursor, &line, &context, diagnostics),
        }
        Ok(())
    })?;

    Ok(module)
}

/// `targets { NAME { key: value } ... }`, nested inside a module block
pub fn parse_targets(
    cursor: &mut LineCursor,
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Result<IndexMap<String, TargetOptions>, Diagnostic> {
    let header = take_header(cursor)?;
    let mut targets = IndexMap::new();
    if TARGETS_HEADER
        .captures(&header.text)
        .is_some_and(|caps| caps.get(1).is_some())
    {
        return Ok(targets);
    }

    let context = format!("{} targets", context);
    block_body(cursor, &header, &context, |cursor, line| {
        let Some(caps) = TARGET_HEADER.captures(&line.text) else {
            cursor.advance();
            ignore_line(cursor, &line, &context, diagnostics);
            return Ok(());
        };
        let name = caps[1].to_string();
        cursor.advance();

        let mut options = TargetOptions::new();
        if caps.get(2).is_none() {
            let target_context = format!("target {}", name);
            block_body(cursor, &line, &target_context, |cursor, entry| {
                cursor.advance();
                match KEY_VALUE.captures(&entry.text) {
                    Some(kv) => {
                        options.insert(kv[1].to_string(), unquote(&kv[2]));
                    }
                    None => ignore_line(cursor, &entry, &target_context, diagnostics),
                }
                Ok(())
            })?;
        }
        targets.insert(name, options);
        Ok(())
    })?;

    Ok(targets)
}

/// `include "path"` or `include <path>`
pub fn parse_include(cursor: &mut LineCursor) -> Result<Include, Diagnostic> {
    let line = take_header(cursor)?;
    let caps = INCLUDE_LINE.captures(&line.text).ok_or_else(|| {
        invalid_line(
            "include",
            format!(
                "invalid include '{}', expected 'include \"path\"' or 'include <path>'",
                line.text
            ),
            &line,
        )
    })?;

    Ok(match (caps.get(1), caps.get(2)) {
        (Some(local), _) => Include::new(local.as_str()),
        (None, Some(system)) => Include::new(system.as_str()),
        (None, None) => Include::new(""),
    })
}

/// `converters { TYPE ... }`
pub fn parse_converters(cursor: &mut LineCursor) -> Result<Vec<TypeConverter>, Diagnostic> {
    let header = take_header(cursor)?;
    let caps = CONVERTERS_HEADER
        .captures(&header.text)
        .ok_or_else(|| invalid_header("converters", "converters {", &header))?;

    let mut converters = Vec::new();
    if caps.get(1).is_some() {
        return Ok(converters);
    }

    block_body(cursor, &header, "converters", |cursor, line| {
        cursor.advance();
        let ty = line.text.trim_end_matches(',').trim();
        if !brackets_balanced(ty) {
            return Err(invalid_line(
                "converters",
                format!("unbalanced brackets in converter type '{}'", ty),
                &line,
            ));
        }
        converters.push(TypeConverter::new(ty));
        Ok(())
    })?;

    Ok(converters)
}

/// `utilities { NAME ... }`; listed names are enabled, everything else is off
pub fn parse_utilities(
    cursor: &mut LineCursor,
    diagnostics: &mut Diagnostics,
) -> Result<Utilities, Diagnostic> {
    let header = take_header(cursor)?;
    let caps = UTILITIES_HEADER
        .captures(&header.text)
        .ok_or_else(|| invalid_header("utilities", "utilities {", &header))?;

    let mut utilities = Utilities::none();
    if caps.get(1).is_some() {
        return Ok(utilities);
    }

    block_body(cursor, &header, "utilities", |cursor, line| {
        cursor.advance();
        for name in line
            .text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|name| !name.is_empty())
        {
            if !utilities.enable(name) {
                diagnostics.push(
                    Diagnostic::warning(format!("unknown utility '{}' ignored", name))
                        .in_context("utilities")
                        .at_line(line.number)
                        .with_code("P014"),
                );
            }
        }
        Ok(())
    })?;

    Ok(utilities)
}

/// `library NAME { path: ..., link: static|shared, include_dirs: ..., link_dirs: ... }`
pub fn parse_library(cursor: &mut LineCursor) -> Result<LibraryConfig, Diagnostic> {
    let header = take_header(cursor)?;
    let caps = LIBRARY_HEADER
        .captures(&header.text)
        .ok_or_else(|| invalid_header("library", "library NAME {", &header))?;

    let mut library = LibraryConfig::new(&caps[1]);
    if caps.get(2).is_some() {
        return Ok(library);
    }

    let context = format!("library {}", library.name);
    block_body(cursor, &header, &context, |cursor, line| {
        cursor.advance();
        let kv = KEY_VALUE.captures(&line.text).ok_or_else(|| {
            invalid_line(&context, format!("expected 'key: value', found '{}'", line.text), &line)
        })?;
        let list = || {
            kv[2]
                .split(',')
                .map(unquote)
                .filter(|entry| !entry.is_empty())
                .collect::<Vec<_>>()
        };
        match &kv[1] {
            "path" => library.path = Some(unquote(&kv[2])),
            "link" => {
                library.link = match unquote(&kv[2]).as_str() {
                    "static" => LinkKind::Static,
                    "shared" | "dynamic" => LinkKind::Shared,
                    other => {
                        return Err(invalid_line(
                            &context,
                            format!("unknown link kind '{}', expected static or shared", other),
                            &line,
                        ))
                    }
                }
            }
            "include_dirs" => library.include_dirs = list(),
            "link_dirs" => library.link_dirs = list(),
            other => {
                return Err(invalid_line(
                    &context,
                    format!("unknown library key '{}'", other),
                    &line,
                ))
            }
        }
        Ok(())
    })?;

    Ok(library)
}

/// `[abstract] [polymorphic] class NAME [: BASES] { ... }`
pub fn parse_class(
    cursor: &mut LineCursor,
    diagnostics: &mut Diagnostics,
) -> Result<Class, Diagnostic> {
    let header = take_header(cursor)?;
    let caps = CLASS_HEADER
        .captures(&header.text)
        .ok_or_else(|| invalid_header("class", "class NAME [: BASE, ...] {", &header))?;

    let mut class = Class::new(&caps[2]);
    let context = format!("class {}", class.name);

    let modifiers = caps.get(1).map_or("", |m| m.as_str());
    class.is_abstract = modifiers.split_whitespace().any(|m| m == "abstract");
    class.is_polymorphic = modifiers.split_whitespace().any(|m| m == "polymorphic");

    if let Some(bases) = caps.get(3) {
        class.base_classes = parse_bases(bases.as_str(), &context, &header)?;
    }
    if caps.get(4).is_some() {
        return Ok(class);
    }

    block_body(cursor, &header, &context, |cursor, line| {
        cursor.advance();
        let text = line.text.as_str();

        if text == "constructor" || text.starts_with("constructor(") || text.starts_with("constructor ") {
            class.constructors.push(parse_constructor(text, &context, &line)?);
        } else if text.starts_with("field ") {
            class.fields.push(parse_field(text, &context, &line)?);
        } else if let Some(method) = METHOD_LINE.captures(text) {
            class
                .methods
                .push(parse_method(&method[1], &method[2], &context, &line)?);
        } else if let Some(kv) = KEY_VALUE.captures(text) {
            match &kv[1] {
                "description" => class.description = Some(unquote(&kv[2])),
                "cpp_class" => class.cpp_class = Some(unquote(&kv[2])),
                _ => ignore_line(cursor, &line, &context, diagnostics),
            }
        } else if text == "auto_detect_properties" {
            class.auto_detect_properties = true;
        } else {
            ignore_line(cursor, &line, &context, diagnostics);
        }
        Ok(())
    })?;

    Ok(class)
}

fn parse_bases(
    text: &str,
    context: &str,
    line: &SourceLine,
) -> Result<Vec<BaseClass>, Diagnostic> {
    let specs = split_top_level(text);
    if specs.is_empty() {
        return Err(invalid_line(context, "empty base class list".to_string(), line));
    }

    specs
        .into_iter()
        .map(|spec| {
            let caps = BASE_SPEC.captures(spec).ok_or_else(|| {
                invalid_line(context, format!("invalid base class '{}'", spec), line)
            })?;
            let mut base = BaseClass::new(&caps[2]);
            for modifier in caps[1].split_whitespace() {
                match modifier {
                    "virtual" => base.inheritance = InheritanceKind::Virtual,
                    "protected" => base.access = AccessSpecifier::Protected,
                    "private" => base.access = AccessSpecifier::Private,
                    _ => base.access = AccessSpecifier::Public,
                }
            }
            Ok(base)
        })
        .collect()
}

fn parse_constructor(
    text: &str,
    context: &str,
    line: &SourceLine,
) -> Result<Constructor, Diagnostic> {
    let rest = text["constructor".len()..].trim();
    if rest.is_empty() {
        return Ok(Constructor::default_constructor());
    }
    let signature = format!("constructor{}", rest);
    let (_, params, tail) = split_signature(&signature).ok_or_else(|| {
        invalid_line(
            context,
            format!("invalid constructor '{}', expected 'constructor(PARAMS)'", text),
            line,
        )
    })?;
    if !tail.is_empty() {
        return Err(invalid_line(
            context,
            format!("unexpected '{}' after constructor parameters", tail),
            line,
        ));
    }
    Ok(Constructor::with_params(parse_params(params, context, line)?))
}

fn parse_field(text: &str, context: &str, line: &SourceLine) -> Result<Field, Diagnostic> {
    let caps = FIELD_LINE.captures(text).ok_or_else(|| {
        invalid_line(
            context,
            format!(
                "invalid field '{}', expected 'field NAME: TYPE [as ALIAS]'",
                text
            ),
            line,
        )
    })?;

    let field = match caps.get(3) {
        Some(alias) => Field::new(alias.as_str(), caps[2].trim()).with_cpp_name(&caps[1]),
        None => Field::new(&caps[1], caps[2].trim()),
    };
    Ok(field)
}

fn parse_method(
    modifiers: &str,
    signature: &str,
    context: &str,
    line: &SourceLine,
) -> Result<Method, Diagnostic> {
    let invalid = || {
        invalid_line(
            context,
            format!(
                "invalid method '{}', expected 'method NAME(PARAMS) [const] [: RETURN] [as ALIAS]'",
                line.text
            ),
            line,
        )
    };

    let (name, params, tail) = split_signature(signature).ok_or_else(invalid)?;
    let tail = SIGNATURE_TAIL.captures(tail).ok_or_else(invalid)?;

    let returns = tail.get(2).map_or("void", |m| m.as_str().trim());
    let mut method = match tail.get(3) {
        Some(alias) => Method::new(alias.as_str(), returns).with_cpp_name(name),
        None => Method::new(name, returns),
    };
    method.parameters = parse_params(params, context, line)?;
    let explicit_const = tail.get(1).is_some();

    let mut mutable = false;
    for modifier in modifiers.split_whitespace() {
        match modifier {
            "static" => method.is_static = true,
            "virtual" => method.is_virtual = true,
            "override" => method.is_override = true,
            "pure" => {
                method.is_virtual = true;
                method.is_pure_virtual = true;
            }
            "mutable" => mutable = true,
            _ => {}
        }
    }

    if method.is_static && (method.is_virtual || method.is_override || explicit_const || mutable) {
        return Err(invalid_line(
            context,
            format!(
                "static method '{}' cannot be const, mutable, virtual, or override",
                method.name
            ),
            line,
        ));
    }
    if mutable && explicit_const {
        return Err(invalid_line(
            context,
            format!("method '{}' cannot be both mutable and const", method.name),
            line,
        ));
    }
    method.is_const = !method.is_static && !mutable;

    Ok(method)
}

/// `function NAME(PARAMS) [: RETURN] [as ALIAS]`
pub fn parse_function(cursor: &mut LineCursor) -> Result<Function, Diagnostic> {
    let line = take_header(cursor)?;
    let invalid = || {
        invalid_line(
            "function",
            format!(
                "invalid function '{}', expected 'function NAME(PARAMS) [: RETURN] [as ALIAS]'",
                line.text
            ),
            &line,
        )
    };

    let signature = line
        .text
        .strip_prefix("function")
        .map(str::trim)
        .ok_or_else(invalid)?;
    let (name, params, tail) = split_signature(signature).ok_or_else(invalid)?;
    let tail = SIGNATURE_TAIL.captures(tail).ok_or_else(invalid)?;
    if tail.get(1).is_some() {
        return Err(invalid());
    }

    let context = format!("function {}", name);
    let returns = tail.get(2).map_or("void", |m| m.as_str().trim());
    let mut function = match tail.get(3) {
        Some(alias) => Function::new(alias.as_str(), returns).with_cpp_name(name),
        None => Function::new(name, returns),
    };
    function.parameters = parse_params(params, &context, &line)?;
    Ok(function)
}

/// Split `NAME(PARAMS) TAIL`, honoring nested parentheses inside PARAMS
pub fn split_signature(text: &str) -> Option<(&str, &str, &str)> {
    let open = text.find('(')?;
    let name = text[..open].trim();
    if !IDENT.is_match(name) {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + idx;
                    return Some((name, &text[open + 1..close], text[close + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a comma-separated `TYPE [NAME] [= DEFAULT]` list
///
/// Unnamed parameters are called `arg<index>`.
pub fn parse_params(
    text: &str,
    context: &str,
    line: &SourceLine,
) -> Result<Vec<Parameter>, Diagnostic> {
    let text = text.trim();
    if text.is_empty() || text == "void" {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    for (index, item) in split_top_level(text).into_iter().enumerate() {
        if item.is_empty() {
            return Err(invalid_line(
                context,
                format!("empty parameter at position {}", index + 1),
                line,
            ));
        }

        let (declaration, default) = match split_default(item) {
            Some((declaration, default)) => (declaration, Some(default)),
            None => (item, None),
        };

        let (ty, name) = split_type_and_name(declaration);
        if ty.is_empty() {
            return Err(invalid_line(
                context,
                format!("parameter '{}' has no type", item),
                line,
            ));
        }

        let param = Parameter::new(name.unwrap_or_else(|| format!("arg{}", index)), ty);
        params.push(match default {
            Some(default) => param.with_default(default),
            None => param,
        });
    }
    Ok(params)
}

fn split_default(item: &str) -> Option<(&str, &str)> {
    let mut depth: i32 = 0;
    for (idx, c) in item.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            '=' if depth == 0 => return Some((item[..idx].trim(), item[idx + 1..].trim())),
            _ => {}
        }
    }
    None
}

/// Separate a trailing parameter name from its type
///
/// Reference and pointer markers glued to the name stay with the type.
fn split_type_and_name(declaration: &str) -> (String, Option<String>) {
    let declaration = declaration.trim();
    let Some(split) = declaration.rfind(char::is_whitespace) else {
        return (declaration.to_string(), None);
    };

    let head = declaration[..split].trim_end();
    let candidate = declaration[split..].trim();
    let markers_len = candidate.len() - candidate.trim_start_matches(['&', '*']).len();
    let (markers, name) = candidate.split_at(markers_len);

    let head_is_only_qualifiers = head
        .split_whitespace()
        .all(|word| word == "const" || word == "volatile");

    if !IDENT.is_match(name) || BUILTIN_WORDS.contains(&name) || head_is_only_qualifiers {
        return (declaration.to_string(), None);
    }

    (format!("{}{}", head, markers), Some(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ConverterKind;
    use pretty_assertions::assert_eq;

    const GEOMETRY: &str = r#"
# Geometry bindings
module geometry {
    version: "2.1.0"
    description: "Geometry primitives"
    targets {
        javascript {
            output_name: "geometry.node"
        }
        python {
        }
    }
}

include "mylib/Vector3D.h"
include <vector>

converters {
    std::vector<Vector3D>
    std::map<std::string, Color>
    std::vector<Vector3D>
}

class Vector3D {
    constructor()
    constructor(double x, double y, double z)
    field x: double
    field y: double
    field z_: double as z
    method length(): double          # euclidean norm
    mutable method scale(double factor)
    method dot(const Vector3D& other) const : double
    mutable method normalize(): void as normalized
}

abstract class Shape {
    pure method area() const : double
}

class Circle : public Shape, virtual Node {
    field radius: double
    override method area() const : double
    static method unit(): Circle
}

function distance(const Vector3D& a, const Vector3D& b): double
function make_vec(double, double): Vector3D as makeVector

utilities {
    version_info
    list_classes, inspect_type
}
"#;

    fn line(number: usize) -> SourceLine {
        SourceLine {
            number,
            text: String::new(),
        }
    }

    #[test]
    fn test_parse_geometry() {
        let result = parse_dsl(GEOMETRY);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let def = result.value.unwrap();

        assert_eq!(def.module.name, "geometry");
        assert_eq!(def.module.version, "2.1.0");
        assert_eq!(def.module.description.as_deref(), Some("Geometry primitives"));
        assert_eq!(
            def.module.target_option("javascript", "output_name"),
            Some("geometry.node")
        );
        assert!(def.module.targets.contains_key("python"));

        assert_eq!(def.includes.len(), 2);
        assert!(def.includes[1].system);

        assert_eq!(def.converters.len(), 2);
        assert_eq!(def.converters[1].kind(), ConverterKind::Mapping);

        let vector = &def.classes[0];
        assert_eq!(vector.constructors.len(), 2);
        assert_eq!(vector.constructors[1].param_types(), vec!["double"; 3]);
        assert_eq!(vector.fields[2].name, "z");
        assert_eq!(vector.fields[2].cpp_name(), "z_");
        assert_eq!(vector.methods[1].returns, "void");
        assert!(vector.methods[0].is_const);
        assert!(!vector.methods[1].is_const);
        assert!(vector.methods[2].is_const);
        assert!(!vector.methods[3].is_const);
        assert_eq!(vector.methods[2].param_types(), vec!["const Vector3D&"]);
        assert_eq!(vector.methods[3].name, "normalized");
        assert_eq!(vector.methods[3].cpp_name(), "normalize");

        let shape = &def.classes[1];
        assert!(shape.is_abstract);
        assert!(shape.methods[0].is_pure_virtual);
        assert_eq!(shape.constructors.len(), 1);

        let circle = &def.classes[2];
        assert_eq!(circle.base_classes[0], BaseClass::new("Shape"));
        assert_eq!(circle.base_classes[1].inheritance, InheritanceKind::Virtual);
        assert!(circle.methods[0].is_override);
        assert!(circle.methods[0].is_const);
        assert!(circle.methods[1].is_static);
        assert!(!circle.methods[1].is_const);

        let make_vec = &def.functions[1];
        assert_eq!(make_vec.name, "makeVector");
        assert_eq!(make_vec.cpp_function_name(), "make_vec");
        assert_eq!(make_vec.parameters[0].name, "arg0");
        assert_eq!(make_vec.parameters[1].name, "arg1");

        assert!(def.utilities.version_info);
        assert!(def.utilities.type_inspection);
        assert!(!def.utilities.class_info);
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(
            "const std::string& name, int, Vector3D *p, double scale = 1.0, unsigned int, std::map<int, int> m",
            "test",
            &line(1),
        )
        .unwrap();

        let shape: Vec<(&str, &str)> = params
            .iter()
            .map(|p| (p.ty.as_str(), p.name.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("const std::string&", "name"),
                ("int", "arg1"),
                ("Vector3D*", "p"),
                ("double", "scale"),
                ("unsigned int", "arg4"),
                ("std::map<int, int>", "m"),
            ]
        );
        assert_eq!(params[3].default.as_deref(), Some("1.0"));
        assert!(parse_params("void", "test", &line(1)).unwrap().is_empty());
        assert!(parse_params("int a, , int b", "test", &line(1)).is_err());
    }

    #[test]
    fn test_error_aborts_only_its_class() {
        let source = r#"
module m {
}
class Broken {
    field x double
    method ok(): void
}
class Fine {
    field y: int
}
class AlsoBroken {
    method (int): void
}
"#;
        let result = parse_dsl(source);
        assert!(result.value.is_none());

        let errors: Vec<_> = result.diagnostics.errors().collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, Some(5));
        assert_eq!(errors[0].context.as_deref(), Some("class Broken"));
        assert_eq!(errors[1].line, Some(12));
    }

    #[test]
    fn test_missing_module_block() {
        let result = parse_dsl("class Point {\n}\n");
        assert!(result.value.is_none());
        assert_eq!(result.diagnostics.errors().next().unwrap().code, Some("P005"));
    }

    #[test]
    fn test_unterminated_block() {
        let result = parse_dsl("module m {\n}\nclass Point {\n    field x: double\n");
        let error = result.diagnostics.errors().next().unwrap();
        assert_eq!(error.code, Some("P011"));
        assert_eq!(error.line, Some(3));
    }

    #[test]
    fn test_warnings_do_not_block() {
        let source = "module m {\n    colour: blue\n}\nutilities {\n    teleport\n}\nclass P {\n    frobnicate\n}\n";
        let result = parse_dsl(source);
        assert!(result.value.is_some());
        let codes: Vec<_> = result.diagnostics.warnings().map(|d| d.code).collect();
        assert_eq!(codes, vec![Some("P013"), Some("P014"), Some("P013")]);
    }

    #[test]
    fn test_method_constness() {
        let context = "class C";
        let parsed = |modifiers: &str, signature: &str| {
            parse_method(modifiers, signature, context, &line(1))
        };

        assert!(parsed("", "size(): int").unwrap().is_const);
        assert!(parsed("virtual ", "draw()").unwrap().is_const);
        assert!(!parsed("mutable ", "clear()").unwrap().is_const);
        assert!(!parsed("static ", "make(): C").unwrap().is_const);

        for (modifiers, signature) in [
            ("static ", "make() const : C"),
            ("static mutable ", "make(): C"),
            ("mutable ", "clear() const"),
        ] {
            let err = parsed(modifiers, signature).unwrap_err();
            assert_eq!(err.code, Some("P012"), "{}{}", modifiers, signature);
        }
    }

    #[test]
    fn test_unknown_nested_blocks_are_skipped() {
        let source = r#"
module m {
    extras {
        colour: blue
    }
    version: 2.0.0
    targets {
        python {
            flags {
                fast: yes
            }
            module_name: pym
        }
    }
}
class P {
    extras {
        nested {
        }
    }
    field x: int
    method f(): void
}
"#;
        let result = parse_dsl(source);
        assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics);
        let def = result.value.unwrap();

        assert_eq!(def.module.version, "2.0.0");
        assert_eq!(def.module.target_option("python", "module_name"), Some("pym"));
        assert_eq!(def.module.target_option("python", "fast"), None);

        assert_eq!(def.classes.len(), 1);
        assert_eq!(def.classes[0].fields.len(), 1);
        assert_eq!(def.classes[0].methods.len(), 1);

        let contexts: Vec<_> = result
            .diagnostics
            .warnings()
            .map(|d| (d.code, d.context.clone()))
            .collect();
        assert_eq!(
            contexts,
            vec![
                (Some("P013"), Some("module m".to_string())),
                (Some("P013"), Some("target python".to_string())),
                (Some("P013"), Some("class P".to_string())),
            ]
        );
    }

    #[test]
    fn test_skip_block_counts_nested_braces() {
        let mut cursor = LineCursor::new("a {\n b {\n }\n}\nnext\n");
        cursor.skip_block();
        assert_eq!(cursor.peek().map(|l| l.text.as_str()), Some("next"));
        cursor.advance();
        assert!(cursor.is_done());

        let mut cursor = LineCursor::new("a {\n b {\n }\n}\nnext\n");
        let opener = cursor.next_line().unwrap();
        cursor.skip_remainder(&opener);
        assert_eq!(cursor.peek().map(|l| l.text.as_str()), Some("next"));
    }

    #[test]
    fn test_split_signature() {
        assert_eq!(
            split_signature("apply(std::function<void(int)> f) const : void"),
            Some(("apply", "std::function<void(int)> f", "const : void"))
        );
        assert_eq!(split_signature("(int)"), None);
        assert_eq!(split_signature("f(int"), None);
    }
}
