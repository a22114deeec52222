/// Splits text into search terms.
///
/// Terms are runs of letters and digits. A single `.`, `:` or apostrophe
/// between two letters, or a single `.`, `,` or `;` between two digits,
/// stays inside the term, so `foo.com` and `1,000` are one term each while
/// `foo.1` and `foo/bar` are two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    lowercase: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Lower-casing tokenizer.
    pub fn new() -> Self {
        Self { lowercase: true }
    }

    /// Tokenizer that keeps the original case.
    pub fn case_sensitive() -> Self {
        Self { lowercase: false }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            let keep = c.is_alphanumeric()
                || (!current.is_empty()
                    && i > 0
                    && joins(chars[i - 1], c, chars.get(i + 1).copied()));
            if keep {
                current.push(c);
            } else {
                self.flush(&mut current, &mut tokens);
            }
        }
        self.flush(&mut current, &mut tokens);
        tokens
    }

    fn flush(&self, current: &mut String, tokens: &mut Vec<String>) {
        if current.is_empty() {
            return;
        }
        let term = std::mem::take(current);
        tokens.push(if self.lowercase {
            term.to_lowercase()
        } else {
            term
        });
    }
}

fn joins(prev: char, c: char, next: Option<char>) -> bool {
    let Some(next) = next else {
        return false;
    };
    if prev.is_alphabetic() && next.is_alphabetic() {
        matches!(c, '.' | ':' | '\'' | '\u{2019}')
    } else if prev.is_numeric() && next.is_numeric() {
        matches!(c, '.' | ',' | ';')
    } else {
        false
    }
}
