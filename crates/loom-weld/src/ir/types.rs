//! Textual type handling
//!
//! Declared types are opaque strings copied verbatim into emitted code.
//! Nothing here interprets them semantically; the helpers only slice the
//! text the way the overload resolver and converter emission need:
//!
//! | Helper | `const std::vector<geo::Point>&` |
//! |--------|----------------------------------|
//! | [`strip_qualifiers`] | `std::vector<geo::Point>` |
//! | [`outer_name`] | `vector` |
//! | [`template_args`] | `Some("geo::Point")` |
//! | [`overload_token`] | `vector` |

/// Qualifier keywords removed before a type is reduced to an identifier
const QUALIFIERS: &[&str] = &["const", "volatile", "mutable", "struct", "class", "typename"];

/// Remove cv-qualifiers and reference/pointer markers, keeping everything else
pub fn strip_qualifiers(ty: &str) -> String {
    let without_markers: String = ty
        .chars()
        .map(|c| if c == '&' || c == '*' { ' ' } else { c })
        .collect();

    without_markers
        .split_whitespace()
        .filter(|word| !QUALIFIERS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The identifier before any template bracket, with namespace qualification removed
pub fn outer_name(ty: &str) -> String {
    let stripped = strip_qualifiers(ty);
    let head = match stripped.find('<') {
        Some(pos) => &stripped[..pos],
        None => stripped.as_str(),
    };
    let head = head.trim();
    let unqualified = match head.rfind("::") {
        Some(pos) => &head[pos + 2..],
        None => head,
    };
    unqualified.trim().to_string()
}

/// Token contributed by one parameter type to an overload suffix
///
/// Multi-word builtins (`unsigned int`) join their words with `_`.
pub fn overload_token(ty: &str) -> String {
    outer_name(ty)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Text between the first `<` and the last `>`, trimmed
pub fn template_args(ty: &str) -> Option<&str> {
    let start = ty.find('<')?;
    let end = ty.rfind('>')?;
    if end <= start {
        return None;
    }
    Some(ty[start + 1..end].trim())
}

/// Split on commas that are not nested inside `<>`, `()` or `[]`
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

/// True when every opened bracket in `text` is closed again
pub fn brackets_balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    for c in text.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_qualifiers() {
        assert_eq!(strip_qualifiers("const std::string&"), "std::string");
        assert_eq!(strip_qualifiers("Vector3D *"), "Vector3D");
        assert_eq!(strip_qualifiers("const char* const"), "char");
        assert_eq!(strip_qualifiers("unsigned int"), "unsigned int");
    }

    #[test]
    fn test_outer_name() {
        assert_eq!(outer_name("const std::vector<geo::Point>&"), "vector");
        assert_eq!(outer_name("geo::Vector3D"), "Vector3D");
        assert_eq!(outer_name("double"), "double");
    }

    #[test]
    fn test_overload_token() {
        assert_eq!(overload_token("const Vector3D&"), "vector3d");
        assert_eq!(overload_token("std::map<std::string, int>"), "map");
        assert_eq!(overload_token("unsigned int"), "unsigned_int");
    }

    #[test]
    fn test_template_args() {
        assert_eq!(template_args("std::vector<Vector3D>"), Some("Vector3D"));
        assert_eq!(
            template_args("std::map<std::string, std::vector<int>>"),
            Some("std::string, std::vector<int>")
        );
        assert_eq!(template_args("double"), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("std::string, std::vector<int>"),
            vec!["std::string", "std::vector<int>"]
        );
        assert_eq!(
            split_top_level("std::map<int, double> m, int n"),
            vec!["std::map<int, double> m", "int n"]
        );
        assert!(split_top_level("").is_empty());
        assert!(split_top_level("   ").is_empty());
    }

    #[test]
    fn test_brackets_balanced() {
        assert!(brackets_balanced("std::map<int, std::vector<int>>"));
        assert!(!brackets_balanced("std::map<int,"));
        assert!(!brackets_balanced("double>"));
    }
}
