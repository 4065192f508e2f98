//! Banned-term detection that tolerates leetspeak and symbol substitution.
//!
//! Text is normalized first (lower-case, `a-z0-9` and single spaces only), then
//! each banned root is matched as a whole word where the usual substitutes for
//! `a e i o u s t` are accepted in place of the letter.

use regex::Regex;

/// Canonicalize raw message text for matching.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Character class accepted in place of a letter.
fn substitutes(c: char) -> Option<&'static str> {
    match c {
        'a' => Some("[a@4]"),
        'e' => Some("[e3]"),
        'i' => Some("[i1!|]"),
        'o' => Some("[o0]"),
        'u' => Some("[uv]"),
        's' => Some("[s$5z]"),
        't' => Some("[t7+]"),
        _ => None,
    }
}

/// Build the pattern for one banned root.
fn term_pattern(term: &str) -> String {
    let mut pattern = String::from(r"(?i)\b");
    for c in term.chars() {
        match substitutes(c) {
            Some(class) => pattern.push_str(class),
            None => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push_str(r"\b");
    pattern
}

/// Compiled set of banned roots. Built once at start-up, never mutated.
#[derive(Debug, Clone, Default)]
pub struct BannedTerms {
    patterns: Vec<(String, Regex)>,
}

impl BannedTerms {
    /// Compile the given roots. Roots are normalized before compiling; roots that
    /// normalize to nothing are skipped.
    pub fn new<I, S>(terms: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for term in terms {
            let root = normalize(term.as_ref());
            if root.is_empty() {
                continue;
            }
            let regex = Regex::new(&term_pattern(&root))?;
            patterns.push((root, regex));
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// First banned root found in `normalized`, if any.
    pub fn first_match(&self, normalized: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(normalized))
            .map(|(root, _)| root.as_str())
    }
}

/// True if any banned root appears in the normalized text.
pub fn contains_banned_term(normalized: &str, terms: &BannedTerms) -> bool {
    terms.first_match(normalized).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> BannedTerms {
        BannedTerms::new(list.iter().copied()).unwrap()
    }

    #[test]
    fn test_normalize_lowercases_and_strips() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("That's WRONG"), "thats wrong");
        assert_eq!(normalize("<@123> hi"), "123 hi");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  a \t\n  b   c  "), "a b c");
        assert_eq!(normalize("line1\nline2"), "line1 line2");
    }

    #[test]
    fn test_normalize_drops_symbols_between_words() {
        assert_eq!(normalize("a - b"), "a b");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_plain_match() {
        let t = terms(&["scam"]);
        assert!(contains_banned_term(&normalize("this is a SCAM"), &t));
    }

    #[test]
    fn test_digit_substitution_matches() {
        let t = terms(&["toast"]);
        assert!(contains_banned_term(&normalize("what a 70457 move"), &t));
        assert!(contains_banned_term(&normalize("t0a5t"), &t));
    }

    #[test]
    fn test_symbol_substitution_in_raw_pattern() {
        let t = terms(&["bad"]);
        // Symbols are stripped by normalization, but the pattern still accepts them.
        assert!(t.patterns[0].1.is_match("b@d"));
        assert!(contains_banned_term(&normalize("b4d"), &t));
    }

    #[test]
    fn test_word_boundary_enforced() {
        let t = terms(&["ass"]);
        assert!(!contains_banned_term(&normalize("a classic passage"), &t));
        assert!(!contains_banned_term(&normalize("assistant"), &t));
        assert!(contains_banned_term(&normalize("you 455"), &t));
    }

    #[test]
    fn test_insertion_evasion_is_missed() {
        let t = terms(&["scam"]);
        assert!(!contains_banned_term(&normalize("scaam"), &t));
    }

    #[test]
    fn test_first_match_reports_root() {
        let t = terms(&["foo", "bar"]);
        assert_eq!(t.first_match("b4r"), Some("bar"));
        assert_eq!(t.first_match("nothing here"), None);
    }

    #[test]
    fn test_empty_roots_skipped() {
        let t = terms(&["", "!!", "ok"]);
        assert_eq!(t.len(), 1);
        assert!(!t.is_empty());
    }

    #[test]
    fn test_empty_set_never_matches() {
        let t = BannedTerms::default();
        assert!(!contains_banned_term("anything at all", &t));
    }
}
