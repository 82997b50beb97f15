//! Natural-order string comparison
//!
//! Digit runs compare by numeric value and letters compare with accents and
//! case folded away. Strings that are equal under that folding are separated
//! by their accents, then by case (lowercase first), then by code points, so
//! two distinct strings never compare equal.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Primary collation key. Variant order is the class order:
/// whitespace and punctuation, then numbers, then letters.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Symbol(char),
    Number(String),
    Letter(char),
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Symbol(a), Key::Symbol(b)) | (Key::Letter(a), Key::Letter(b)) => a.cmp(b),
            (Key::Number(a), Key::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Symbol(_) => 0,
            Key::Number(_) => 1,
            Key::Letter(_) => 2,
        }
    }
}

/// Collation data for one string
struct Collation {
    primary: Vec<Key>,
    /// Combining marks per source character
    accents: Vec<Vec<char>>,
    /// Uppercase flag per source character
    case: Vec<bool>,
}

impl Collation {
    fn new(value: &str) -> Self {
        let mut primary = Vec::new();
        let mut accents = Vec::new();
        let mut case = Vec::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                let mut digits = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    digits.push(next);
                    chars.next();
                }
                let trimmed = digits.trim_start_matches('0');
                primary.push(Key::Number(if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }));
                // Leading zeros only matter as a last resort
                accents.push(Vec::new());
                case.push(false);
                continue;
            }

            let mut marks = Vec::new();
            for decomposed in std::iter::once(c).nfd() {
                if is_combining_mark(decomposed) {
                    marks.push(decomposed);
                    continue;
                }
                for folded in decomposed.to_lowercase() {
                    primary.push(if folded.is_alphanumeric() {
                        Key::Letter(folded)
                    } else {
                        Key::Symbol(folded)
                    });
                }
            }
            accents.push(marks);
            case.push(c.is_uppercase());
        }

        Self {
            primary,
            accents,
            case,
        }
    }
}

/// Compare two strings the way a human sorts a sidebar
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let left = Collation::new(a);
    let right = Collation::new(b);

    left.primary
        .cmp(&right.primary)
        .then_with(|| left.accents.cmp(&right.accents))
        .then_with(|| left.case.cmp(&right.case))
        .then_with(|| a.cmp(b))
}
