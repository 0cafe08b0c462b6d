//! Deterministic tokenization used to bound chunk sizes.
//!
//! Tokens here only measure and cut text; they are never fed to the
//! embedding model, so any stable scheme works as long as ingestion always
//! uses the same one.

/// A token is a slice of the source text, kept verbatim.
pub type Token = String;

pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<Token>;
    fn decode(&self, tokens: &[Token]) -> String;
}

/// Splits on whitespace boundaries without discarding anything.
///
/// Each token is a run of non-whitespace characters followed by the
/// whitespace after it. Whitespace before the first word belongs to the
/// first token, so concatenating the tokens reproduces the input. Text with
/// no visible characters yields no tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut seen_word = false;
        let mut in_trailing_space = false;

        for ch in text.chars() {
            if ch.is_whitespace() {
                if seen_word {
                    in_trailing_space = true;
                }
                current.push(ch);
            } else {
                if in_trailing_space {
                    tokens.push(std::mem::take(&mut current));
                    in_trailing_space = false;
                }
                seen_word = true;
                current.push(ch);
            }
        }

        if seen_word {
            tokens.push(current);
        }
        tokens
    }

    fn decode(&self, tokens: &[Token]) -> String {
        tokens.concat()
    }
}
