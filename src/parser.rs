use tracing::{debug, trace};

use crate::ast::*;
use crate::error::ParseError;
use crate::lookahead::Lookahead;
use crate::simplify::simplify_root;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind, TokenSource};

/// Knobs for [`parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Collapse single-operand `or`/`and` nodes after parsing.
    pub simplify: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { simplify: true }
    }
}

/// Parse a full unit and simplify it.
pub fn parse<S: TokenSource>(source: S) -> Result<Root, ParseError> {
    parse_with(source, ParseOptions::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(simplify = options.simplify))]
pub fn parse_with<S: TokenSource>(source: S, options: ParseOptions) -> Result<Root, ParseError> {
    let root = Parser::new(source).parse_root()?;
    debug!(
        assignments = root.assignments.items.len(),
        default_lines = root.config.default_lines.len(),
        sections = root.config.sections.len(),
        "parsed unit"
    );
    Ok(if options.simplify {
        simplify_root(root)
    } else {
        root
    })
}

/// LL(1) recursive-descent parser. Every production commits on the next
/// token alone; nothing is ever backtracked.
pub struct Parser<S> {
    tokens: Lookahead<S>,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Self {
            tokens: Lookahead::new(source),
        }
    }

    fn peek_kind(&mut self) -> Option<&TokenKind> {
        self.tokens.peek(0).map(|t| &t.kind)
    }

    fn at(&mut self, kind: &TokenKind) -> bool {
        self.peek_kind().is_some_and(|k| k.same_kind(kind))
    }

    /// Error describing whatever sits at the head of the stream.
    fn unexpected(&mut self, expected: impl Into<String>) -> ParseError {
        let expected = expected.into();
        match self.tokens.peek(0) {
            Some(token) => ParseError::UnexpectedToken {
                position: token.position,
                expected,
                found: token.kind.clone(),
            },
            None => ParseError::UnexpectedEof {
                position: self.tokens.end_position(),
                expected,
            },
        }
    }

    fn match_one(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(&kind) {
            if let Some(token) = self.tokens.read() {
                return Ok(token);
            }
        }
        Err(self.unexpected(kind.describe()))
    }

    fn match_zero_or_more(&mut self, kind: TokenKind) -> Vec<Token> {
        let mut matched = Vec::new();
        while self.at(&kind) {
            match self.tokens.read() {
                Some(token) => matched.push(token),
                None => break,
            }
        }
        matched
    }

    fn match_one_or_more(&mut self, kind: TokenKind) -> Result<Vec<Token>, ParseError> {
        let matched = self.match_zero_or_more(kind.clone());
        if matched.is_empty() {
            return Err(self.unexpected(kind.describe()));
        }
        Ok(matched)
    }

    /// `root := [varAssignments] config`, and the stream must then be empty.
    pub fn parse_root(&mut self) -> Result<Root, ParseError> {
        let assignments = if self.at(&TokenKind::VarAssignsStart) {
            self.parse_var_assignments()?
        } else {
            VarAssignments::default()
        };
        let config = self.parse_config()?;
        if self.tokens.peek(0).is_some() {
            return Err(self.unexpected("raw line, start of predicate or end of input"));
        }
        Ok(Root {
            assignments,
            config,
        })
    }

    fn parse_var_assignments(&mut self) -> Result<VarAssignments, ParseError> {
        self.match_one(TokenKind::VarAssignsStart)?;
        self.match_zero_or_more(TokenKind::Eol);

        let mut items = Vec::new();
        while self.at(&TokenKind::Variable(String::new())) {
            let lhs = self.parse_variable()?;
            self.match_one(TokenKind::Assign)?;
            let rhs = self.parse_or()?;
            trace!(name = %lhs.name, "assignment");
            items.push(Assignment { lhs, rhs });
            // The last assignment may run straight into the block end.
            if !self.at(&TokenKind::VarAssignsEnd) {
                self.match_one_or_more(TokenKind::Eol)?;
            }
        }

        self.match_one(TokenKind::VarAssignsEnd)?;
        self.match_one_or_more(TokenKind::Eol)?;
        Ok(VarAssignments { items })
    }

    fn parse_config(&mut self) -> Result<Config, ParseError> {
        let default_lines = self.parse_raw_lines();
        let mut sections = Vec::new();
        while self.at(&TokenKind::PredicateStart) {
            sections.push(self.parse_section()?);
        }
        Ok(Config {
            default_lines,
            sections,
        })
    }

    fn parse_raw_lines(&mut self) -> Vec<String> {
        self.match_zero_or_more(TokenKind::RawLine(String::new()))
            .into_iter()
            .filter_map(|token| match token.kind {
                TokenKind::RawLine(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn parse_section(&mut self) -> Result<Section, ParseError> {
        let start_marker = self.match_one(TokenKind::PredicateStart)?;
        let predicate = self.parse_or()?;
        self.match_one(TokenKind::PredicateEnd)?;
        self.match_one_or_more(TokenKind::Eol)?;
        let raw_lines = self.parse_raw_lines();
        Ok(Section {
            start_marker,
            predicate,
            raw_lines,
        })
    }

    // Always builds an `Or` node, even around a single operand; the
    // simplifier removes the redundant wrappers.
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut operands = Operands::single(self.parse_and()?);
        while self.at(&TokenKind::Or) {
            self.tokens.read();
            operands.push(self.parse_and()?);
        }
        Ok(Expr::Or(operands))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut operands = Operands::single(self.parse_not()?);
        while self.at(&TokenKind::And) {
            self.tokens.read();
            operands.push(self.parse_not()?);
        }
        Ok(Expr::And(operands))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| {
            if self.at(&TokenKind::Not) {
                self.tokens.read();
                Ok(Expr::not(self.parse_not()?))
            } else {
                self.parse_atomic_bool()
            }
        })
    }

    /// All three comparisons begin with `expr`, so eat that first and let
    /// the following token pick the node.
    fn parse_atomic_bool(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_expr()?;
        let build: fn(BinaryTest) -> Expr = match self.peek_kind() {
            Some(TokenKind::Equals) => Expr::Equals,
            Some(TokenKind::NotEquals) => Expr::NotEquals,
            Some(TokenKind::In) => Expr::In,
            _ => return Ok(left),
        };
        let Some(op_token) = self.tokens.read() else {
            return Err(self.unexpected("comparison operator"));
        };
        let right = self.parse_expr()?;
        Ok(build(BinaryTest::new(op_token, left, right)))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| match self.peek_kind() {
            Some(TokenKind::Variable(_)) => Ok(Expr::Variable(self.parse_variable()?)),
            Some(TokenKind::LParen) => {
                self.tokens.read();
                let inner = self.parse_or()?;
                self.match_one(TokenKind::RParen)?;
                Ok(inner)
            }
            Some(TokenKind::ListStart) => self.parse_list(),
            Some(TokenKind::StringLit(_) | TokenKind::True | TokenKind::False) => {
                match self.tokens.read().map(|t| t.kind) {
                    Some(TokenKind::StringLit(value)) => Ok(Expr::StringLit(value)),
                    Some(TokenKind::True) => Ok(Expr::BoolLit(true)),
                    Some(TokenKind::False) => Ok(Expr::BoolLit(false)),
                    _ => Err(self.unexpected("literal")),
                }
            }
            _ => Err(self.unexpected("variable, '(' or literal")),
        })
    }

    fn parse_variable(&mut self) -> Result<Variable, ParseError> {
        let token = self.match_one(TokenKind::Variable(String::new()))?;
        Variable::from_token(token).ok_or_else(|| self.unexpected("variable"))
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        self.match_one(TokenKind::ListStart)?;
        let mut items = Vec::new();
        if self.at(&TokenKind::ListEnd) {
            self.tokens.read();
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.parse_or()?);
            if self.at(&TokenKind::Comma) {
                self.tokens.read();
            } else {
                self.match_one(TokenKind::ListEnd)?;
                return Ok(Expr::List(items));
            }
        }
    }
}
