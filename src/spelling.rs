//! Dictionary-based correction of OCR'd entity names.
//!
//! The vision service garbles creature and ant names often enough that exact
//! lookups fail. The corrector maps a noisy token to the first canonical
//! dictionary entry within a small edit distance, leaving everything else
//! untouched.

use anyhow::{Context, Result};
use std::path::Path;

/// Maximum edit distance at which a dictionary entry is accepted.
const MAX_EDIT_DISTANCE: usize = 3;

/// Tokens of this many characters or fewer pass through uncorrected.
/// Short tokens are too ambiguous; correcting them trades one wrong name
/// for another.
const MAX_UNCORRECTED_CHARS: usize = 3;

/// Ordered list of canonical entity names.
///
/// Scan order is part of the contract: the first entry within
/// [`MAX_EDIT_DISTANCE`] wins, so ties between entries are broken by file
/// order, not by closeness.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Vec<String>,
}

impl Dictionary {
    /// Builds a dictionary from an ordered list of canonical names.
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    /// Loads a dictionary from a flat newline-delimited file.
    ///
    /// Entries keep file order; surrounding whitespace and blank lines are
    /// dropped. Reload requires a restart.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read dictionary: {}", path.display()))?;
        let words = contents
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        Ok(Self { words })
    }

    /// Number of canonical entries.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the canonical spelling for a noisy token.
    ///
    /// Tokens of up to [`MAX_UNCORRECTED_CHARS`] characters (not bytes —
    /// the names are Cyrillic) and tokens with no dictionary entry within
    /// [`MAX_EDIT_DISTANCE`] come back unchanged.
    pub fn correct(&self, token: &str) -> String {
        if token.chars().count() <= MAX_UNCORRECTED_CHARS {
            return token.to_string();
        }
        for word in &self.words {
            if levenshtein(token, word) <= MAX_EDIT_DISTANCE {
                return word.clone();
            }
        }
        token.to_string()
    }
}

/// Levenshtein distance over characters, unit cost for insertion, deletion,
/// and substitution.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_dictionary(words: &[&str]) -> Dictionary {
        Dictionary::new(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("скорпион", "скорпион"), 0);
        // One OCR'd latin letter inserted into a Cyrillic name
        assert_eq!(levenshtein("скоwрпион", "скорпион"), 1);
    }

    #[test]
    fn test_short_tokens_pass_through() {
        let dict = make_dictionary(&["жук"]);
        assert_eq!(dict.correct(""), "");
        assert_eq!(dict.correct("жук"), "жук");
        assert_eq!(dict.correct("жyк"), "жyк"); // 3 chars, never corrected
    }

    #[test]
    fn test_corrects_within_distance() {
        let dict = make_dictionary(&["скорпион", "гигантский богомол"]);
        assert_eq!(dict.correct("скоwрпион"), "скорпион");
        assert_eq!(dict.correct("гигантскии богомоп"), "гигантский богомол");
    }

    #[test]
    fn test_unmatched_token_unchanged() {
        let dict = make_dictionary(&["скорпион"]);
        assert_eq!(dict.correct("паук скакун"), "паук скакун");
    }

    #[test]
    fn test_distance_boundary() {
        let dict = make_dictionary(&["abcdefgh"]);
        // distance 3: accepted
        assert_eq!(dict.correct("abcdexyz"), "abcdefgh");
        // distance 4: rejected
        assert_eq!(dict.correct("abcdwxyz"), "abcdwxyz");
    }

    #[test]
    fn test_first_match_wins_over_closer_match() {
        // "abcdx" is distance 1 from "abcdy" but distance 2 from "abczz";
        // scan order decides, not closeness.
        let dict = make_dictionary(&["abczy", "abcdx"]);
        assert_eq!(dict.correct("abcdx"), "abczy");
    }

    #[test]
    fn test_correct_is_idempotent() {
        let dict = make_dictionary(&["скорпион", "паук скакун", "жук атлас"]);
        for token in ["скоwрпион", "паук скакун", "муравей", "аб", ""] {
            let once = dict.correct(token);
            assert_eq!(dict.correct(&once), once);
        }
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "скорпион\n\n  жук атлас  \n").unwrap();

        let dict = Dictionary::load(file.path()).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.correct("жук атлac"), "жук атлас");
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Dictionary::load(Path::new("no/such/dictionary.txt")).is_err());
    }
}
