//! LIKE pattern compilation.

use regex::Regex;

use crate::error::FilterError;

/// A compiled LIKE pattern: `.` matches exactly one character, `.*` any run
/// of characters, everything else matches literally and case-sensitively.
#[derive(Debug, Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    pub fn compile(pattern: &str) -> Result<Self, FilterError> {
        let mut body = String::with_capacity(pattern.len() + 8);
        let mut chars = pattern.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '.' {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    body.push_str(".*");
                } else {
                    body.push('.');
                }
            } else {
                body.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            }
        }

        let regex = Regex::new(&format!("^(?s:{})$", body)).map_err(|e| {
            FilterError::malformed(pattern, format!("invalid like pattern: {}", e))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(pattern: &str) -> LikePattern {
        LikePattern::compile(pattern).unwrap()
    }

    #[test]
    fn test_multi_wildcard() {
        let p = like("A.*");
        assert!(p.is_match("Andalucia"));
        assert!(p.is_match("A1"));
        assert!(p.is_match("A"));
        assert!(!p.is_match("Ba"));
    }

    #[test]
    fn test_single_wildcard() {
        let p = like("A.n");
        assert!(p.is_match("Ann"));
        assert!(!p.is_match("Anna"));
        assert!(!p.is_match("An"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!like("a.*").is_match("Andalucia"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = like("(a+b)?.*");
        assert!(p.is_match("(a+b)? and more"));
        assert!(!p.is_match("aab"));
        assert!(like("1*2").is_match("1*2"));
        assert!(!like("1*2").is_match("112"));
    }

    #[test]
    fn test_wildcards_match_non_ascii() {
        assert!(like("C.diz").is_match("Cádiz"));
        assert!(like(".*diz").is_match("Cádiz"));
    }
}
