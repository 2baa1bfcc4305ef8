//! Tag header parsing.

/// Split a tag header on runs of commas and spaces, dropping empty tokens.
/// Order is preserved and duplicates are kept.
pub fn parse_tags(header: &str) -> Vec<String> {
    header
        .split([' ', ','])
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("a, b,,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_tags("Unknown"), vec!["Unknown"]);
        assert_eq!(parse_tags(" x  y , x "), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" ,, ").is_empty());
    }
}
