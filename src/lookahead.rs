use std::collections::VecDeque;

use tracing::trace;

use crate::token::{Position, Token, TokenSource};

/// FIFO over a [`TokenSource`] that lets the parser inspect upcoming tokens
/// without committing to them. Tokens are pulled from the source only as far
/// as a request needs.
pub struct Lookahead<S> {
    source: S,
    buffer: VecDeque<Token>,
    last: Option<Token>,
}

impl<S: TokenSource> Lookahead<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            last: None,
        }
    }

    /// Pull from the source until `n` tokens are buffered or it runs dry.
    fn fill(&mut self, n: usize) {
        while self.buffer.len() < n {
            match self.source.next_token() {
                Some(token) => self.buffer.push_back(token),
                None => break,
            }
        }
    }

    /// The token `k` places ahead (0 is the next one), if the stream reaches
    /// that far.
    pub fn peek(&mut self, k: usize) -> Option<&Token> {
        self.fill(k + 1);
        self.buffer.get(k)
    }

    /// Up to `n` upcoming tokens, fewer if the stream ends first.
    pub fn peek_many(&mut self, n: usize) -> Vec<&Token> {
        self.fill(n);
        self.buffer.iter().take(n).collect()
    }

    /// Consume the next token.
    pub fn read(&mut self) -> Option<Token> {
        self.fill(1);
        let token = self.buffer.pop_front()?;
        trace!(kind = ?token.kind, position = %token.position, "consumed token");
        self.last = Some(token.clone());
        Some(token)
    }

    /// The most recently consumed token.
    pub fn last(&self) -> Option<&Token> {
        self.last.as_ref()
    }

    /// Best position for an end-of-input diagnostic: the source's own
    /// position, or the last consumed token's when the source has not
    /// advanced past the start.
    pub fn end_position(&self) -> Position {
        let position = self.source.position();
        match &self.last {
            Some(last) if position < last.position => last.position,
            _ => position,
        }
    }
}
