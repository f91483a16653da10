//! Token cursor over the whitespace-separated words of one input line.

/// An ordered sequence of tokens with a read position.
///
/// Cloning yields an independent cursor, which is what lets the parser
/// combinators try a parse on a copy and only keep the advanced copy when it
/// succeeds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    tokens: Vec<String>,
    position: usize,
}

impl Arguments {
    /// Create a cursor over already split tokens.
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens, position: 0 }
    }

    /// Split `text` on any whitespace.
    pub fn tokenize(text: &str) -> Self {
        Self::new(text.split_whitespace().map(str::to_string).collect())
    }

    /// Take the next token. An exhausted cursor yields an empty string.
    pub fn pop(&mut self) -> String {
        match self.tokens.get(self.position) {
            Some(token) => {
                self.position += 1;
                token.clone()
            }
            None => String::new(),
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    /// True when every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Number of tokens left.
    pub fn len(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    /// The tokens not consumed yet.
    pub fn remaining(&self) -> &[String] {
        &self.tokens[self.position.min(self.tokens.len())..]
    }
}

impl<S: Into<String>> FromIterator<S> for Arguments {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
