//! Token model and the pull-source contract the parser consumes.
//!
//! Tokenizing raw text is someone else's job: the parser only needs a
//! forward-only source of classified, positioned tokens. Any
//! `Iterator<Item = Token>` can be adapted with [`TokenStream`].

use std::fmt;

/// A line/column location in the source text (both 1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    VarAssignsStart,
    VarAssignsEnd,
    Eol,
    Variable(String),
    Assign, // =
    RawLine(String),
    PredicateStart,
    PredicateEnd,

    // Connectives
    Or,
    And,
    Not,

    // Comparisons
    Equals,    // ==
    NotEquals, // !=
    In,

    LParen,
    RParen,
    StringLit(String),
    ListStart, // [
    ListEnd,   // ]
    Comma,
    True,
    False,
}

impl TokenKind {
    /// True when both kinds are the same variant, ignoring any payload.
    pub fn same_kind(&self, other: &TokenKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Short human-readable name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::VarAssignsStart => "start of assignment block",
            TokenKind::VarAssignsEnd => "end of assignment block",
            TokenKind::Eol => "end of line",
            TokenKind::Variable(_) => "variable",
            TokenKind::Assign => "'='",
            TokenKind::RawLine(_) => "raw line",
            TokenKind::PredicateStart => "start of predicate",
            TokenKind::PredicateEnd => "end of predicate",
            TokenKind::Or => "'or'",
            TokenKind::And => "'and'",
            TokenKind::Not => "'not'",
            TokenKind::Equals => "'=='",
            TokenKind::NotEquals => "'!='",
            TokenKind::In => "'in'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::StringLit(_) => "string literal",
            TokenKind::ListStart => "'['",
            TokenKind::ListEnd => "']'",
            TokenKind::Comma => "','",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Variable(name) => write!(f, "variable `{name}`"),
            TokenKind::StringLit(value) => write!(f, "string literal {value:?}"),
            TokenKind::RawLine(line) => write!(f, "raw line {line:?}"),
            other => f.write_str(other.describe()),
        }
    }
}

/// A classified lexical unit. Equality and ordering include the position,
/// so two references to the same name at different places stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub position: Position,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { position, kind }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.position)
    }
}

/// Forward-only, non-restartable supply of tokens.
pub trait TokenSource {
    /// Pull the next token, or `None` once the source is exhausted.
    fn next_token(&mut self) -> Option<Token>;

    /// Where the producer currently is. Used to position errors that occur
    /// at end of input.
    fn position(&self) -> Position;
}

/// Adapts any token iterator into a [`TokenSource`].
#[derive(Debug, Clone)]
pub struct TokenStream<I> {
    tokens: I,
    position: Position,
    end: Option<Position>,
    exhausted: bool,
}

impl<I: Iterator<Item = Token>> TokenStream<I> {
    pub fn new(tokens: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            position: Position::new(1, 1),
            end: None,
            exhausted: false,
        }
    }

    /// Report `end` as the position once the stream runs dry, instead of the
    /// last token's position.
    pub fn ending_at(mut self, end: Position) -> Self {
        self.end = Some(end);
        self
    }
}

impl TokenStream<std::vec::IntoIter<Token>> {
    /// Build a stream from bare kinds, laid out by [`positioned`].
    pub fn from_kinds(kinds: impl IntoIterator<Item = TokenKind>) -> Self {
        let (tokens, end) = layout(kinds);
        TokenStream::new(tokens).ending_at(end)
    }
}

impl<I: Iterator<Item = Token>> TokenSource for TokenStream<I> {
    fn next_token(&mut self) -> Option<Token> {
        match self.tokens.next() {
            Some(token) => {
                self.position = token.position;
                Some(token)
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    fn position(&self) -> Position {
        match self.end {
            Some(end) if self.exhausted => end,
            _ => self.position,
        }
    }
}

/// Assign synthetic positions to a sequence of kinds: one column per token,
/// and each `Eol` moves to the start of the next line.
pub fn positioned(kinds: impl IntoIterator<Item = TokenKind>) -> Vec<Token> {
    layout(kinds).0
}

fn layout(kinds: impl IntoIterator<Item = TokenKind>) -> (Vec<Token>, Position) {
    let mut at = Position::new(1, 1);
    let mut tokens = Vec::new();
    for kind in kinds {
        let newline = matches!(kind, TokenKind::Eol);
        tokens.push(Token::new(kind, at));
        if newline {
            at = Position::new(at.line + 1, 1);
        } else {
            at.column += 1;
        }
    }
    (tokens, at)
}
