//! Splitting statement attribute values into their parts.

use std::sync::LazyLock;

use regex::Regex;

/// Leading word, whitespace, then the rest with surrounding whitespace trimmed.
pub static TRIM_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(\S+)\s+(.*?)\s*$").expect("statement split pattern is valid")
});

/// Marker `;;` is swapped to while splitting a statement list. Tabs are normalized to spaces
/// first, so none survive in the input.
const ESCAPED_SEMICOLON: char = '\t';

/// How `content` and `replace` treat their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Insert as a text node
    #[default]
    Text,
    /// Parse as markup and insert the resulting nodes
    Structure,
}

/// Split `value` into a leading name and the rest, e.g. `"item items"` into `("item", "items")`.
///
/// Returns `None` when there is no whitespace-separated remainder.
pub fn split_key_expression<'a>(regex: &Regex, value: &'a str) -> Option<(&'a str, &'a str)> {
    let captures = regex.captures(value)?;
    let key = captures.get(1)?.as_str();
    let rest = captures.get(2)?.as_str();
    Some((key, rest))
}

/// Split an optional `text`/`structure` keyword off the front of a `content` or `replace` value.
pub fn split_expression_prefix<'a>(regex: &Regex, value: &'a str) -> (ContentMode, &'a str) {
    match split_key_expression(regex, value) {
        Some(("structure", expression)) => (ContentMode::Structure, expression),
        Some(("text", expression)) => (ContentMode::Text, expression),
        _ => (ContentMode::Text, value),
    }
}

/// Split a `;`-separated statement list. `;;` stands for a literal semicolon and a single
/// trailing `;` is ignored.
pub fn split_statement_list(value: &str) -> Vec<String> {
    let normalized: String = value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    let trimmed = normalized.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);

    trimmed
        .replace(";;", &ESCAPED_SEMICOLON.to_string())
        .split(';')
        .map(|item| item.replace(ESCAPED_SEMICOLON, ";"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_expression() {
        assert_eq!(
            split_key_expression(&TRIM_SPACE, "  item  items.slice(1) "),
            Some(("item", "items.slice(1)"))
        );
        assert_eq!(
            split_key_expression(&TRIM_SPACE, "x a\nb"),
            Some(("x", "a\nb"))
        );
        assert_eq!(split_key_expression(&TRIM_SPACE, "lonely"), None);
        assert_eq!(split_key_expression(&TRIM_SPACE, "x "), Some(("x", "")));
    }

    #[test]
    fn expression_prefix() {
        assert_eq!(
            split_expression_prefix(&TRIM_SPACE, "structure body"),
            (ContentMode::Structure, "body")
        );
        assert_eq!(
            split_expression_prefix(&TRIM_SPACE, "text  body"),
            (ContentMode::Text, "body")
        );
        assert_eq!(
            split_expression_prefix(&TRIM_SPACE, "a + b"),
            (ContentMode::Text, "a + b")
        );
        assert_eq!(
            split_expression_prefix(&TRIM_SPACE, "structure"),
            (ContentMode::Text, "structure")
        );
    }

    #[test]
    fn statement_lists() {
        assert_eq!(split_statement_list("x 2; y x+3"), ["x 2", " y x+3"]);
        assert_eq!(split_statement_list("x 2;\n y 3;  "), ["x 2", "  y 3"]);
        assert_eq!(
            split_statement_list("title 'a;;b'; alt 'c'"),
            ["title 'a;b'", " alt 'c'"]
        );
        assert_eq!(split_statement_list("single"), ["single"]);
    }
}
