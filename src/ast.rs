use std::fmt;

use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

/// The whole parsed unit: an optional assignment block and the config body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Root {
    pub assignments: VarAssignments,
    pub config: Config,
}

/// Ordered `name = expr` bindings. Later entries may refer to earlier ones,
/// never the other way round; that is left to the author of the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarAssignments {
    pub items: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub lhs: Variable,
    pub rhs: Expr,
}

/// Unconditional lines followed by the guarded sections. Lines are stored
/// verbatim and never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub default_lines: Vec<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub start_marker: Token,
    pub predicate: Expr,
    pub raw_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub token: Token,
    pub name: String,
}

impl Variable {
    /// Wrap a `Variable` token; any other kind yields `None`.
    pub fn from_token(token: Token) -> Option<Self> {
        match &token.kind {
            TokenKind::Variable(name) => Some(Self {
                name: name.clone(),
                token,
            }),
            _ => None,
        }
    }
}

/// Shared shape of `==`, `!=` and `in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryTest {
    pub op_token: Token,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl BinaryTest {
    pub fn new(op_token: Token, left: Expr, right: Expr) -> Self {
        Self {
            op_token,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Operand list of an `or`/`and` chain. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operands(Vec<Expr>);

#[allow(clippy::len_without_is_empty)]
impl Operands {
    pub fn new(first: Expr, rest: impl IntoIterator<Item = Expr>) -> Self {
        let mut operands = vec![first];
        operands.extend(rest);
        Self(operands)
    }

    pub fn single(expr: Expr) -> Self {
        Self(vec![expr])
    }

    pub fn push(&mut self, expr: Expr) {
        self.0.push(expr);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.0.iter()
    }

    pub fn last(&self) -> &Expr {
        // Non-empty by construction.
        &self.0[self.0.len() - 1]
    }

    /// The sole operand, or the list back when there is more than one.
    pub fn into_single(mut self) -> Result<Expr, Self> {
        if self.0.len() == 1 {
            if let Some(expr) = self.0.pop() {
                return Ok(expr);
            }
        }
        Err(self)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Expr> {
        self.0.iter_mut()
    }

    /// Remove and return the sole operand. Leaves the list empty, so the
    /// caller must discard it straight away.
    pub(crate) fn take_single(&mut self) -> Option<Expr> {
        if self.0.len() == 1 {
            self.0.pop()
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a Operands {
    type Item = &'a Expr;
    type IntoIter = std::slice::Iter<'a, Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Predicate and right-hand-side expressions.
///
/// `Clone`, `PartialEq` and `Drop` are written by hand so that none of them
/// recurse on the native stack for deeply nested input.
#[derive(Debug)]
pub enum Expr {
    Or(Operands),
    And(Operands),
    Not(Box<Expr>),
    Equals(BinaryTest),
    NotEquals(BinaryTest),
    In(BinaryTest),
    Variable(Variable),
    StringLit(String),
    BoolLit(bool),
    List(Vec<Expr>),
}

impl Expr {
    pub fn not(operand: Expr) -> Self {
        Expr::Not(Box::new(operand))
    }

    /// Binding strength when printed; higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(_) => 1,
            Expr::And(_) => 2,
            Expr::Not(_) => 3,
            Expr::Equals(_) | Expr::NotEquals(_) | Expr::In(_) => 4,
            Expr::Variable(_) | Expr::StringLit(_) | Expr::BoolLit(_) | Expr::List(_) => 5,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        ensure_sufficient_stack(|| self.fmt_inner(f, min))
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            f.write_str("(")?;
            self.fmt_at(f, 0)?;
            return f.write_str(")");
        }
        match self {
            Expr::Or(operands) => fmt_chain(f, operands, " or ", 2),
            Expr::And(operands) => fmt_chain(f, operands, " and ", 3),
            Expr::Not(operand) => {
                f.write_str("not ")?;
                operand.fmt_at(f, 3)
            }
            Expr::Equals(test) => fmt_binary(f, test, "=="),
            Expr::NotEquals(test) => fmt_binary(f, test, "!="),
            Expr::In(test) => fmt_binary(f, test, "in"),
            Expr::Variable(var) => f.write_str(&var.name),
            Expr::StringLit(value) => write!(f, "{value:?}"),
            Expr::BoolLit(value) => write!(f, "{value}"),
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_at(f, 0)?;
                }
                f.write_str("]")
            }
        }
    }
}

fn fmt_chain(
    f: &mut fmt::Formatter<'_>,
    operands: &Operands,
    sep: &str,
    min: u8,
) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        operand.fmt_at(f, min)?;
    }
    Ok(())
}

fn fmt_binary(f: &mut fmt::Formatter<'_>, test: &BinaryTest, op: &str) -> fmt::Result {
    test.left.fmt_at(f, 5)?;
    write!(f, " {op} ")?;
    test.right.fmt_at(f, 5)
}

impl Expr {
    /// Move every direct child onto `out`, leaving cheap placeholders.
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        match self {
            Expr::Or(operands) | Expr::And(operands) => out.append(&mut operands.0),
            Expr::Not(operand) => {
                out.push(std::mem::replace(&mut **operand, Expr::BoolLit(false)));
            }
            Expr::Equals(test) | Expr::NotEquals(test) | Expr::In(test) => {
                out.push(std::mem::replace(&mut *test.left, Expr::BoolLit(false)));
                out.push(std::mem::replace(&mut *test.right, Expr::BoolLit(false)));
            }
            Expr::List(items) => out.append(items),
            Expr::Variable(_) | Expr::StringLit(_) | Expr::BoolLit(_) => {}
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut child) = pending.pop() {
            child.take_children(&mut pending);
        }
    }
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        ensure_sufficient_stack(|| match self {
            Expr::Or(operands) => Expr::Or(operands.clone()),
            Expr::And(operands) => Expr::And(operands.clone()),
            Expr::Not(operand) => Expr::Not(operand.clone()),
            Expr::Equals(test) => Expr::Equals(test.clone()),
            Expr::NotEquals(test) => Expr::NotEquals(test.clone()),
            Expr::In(test) => Expr::In(test.clone()),
            Expr::Variable(var) => Expr::Variable(var.clone()),
            Expr::StringLit(value) => Expr::StringLit(value.clone()),
            Expr::BoolLit(value) => Expr::BoolLit(*value),
            Expr::List(items) => Expr::List(items.clone()),
        })
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        ensure_sufficient_stack(|| match (self, other) {
            (Expr::Or(a), Expr::Or(b)) | (Expr::And(a), Expr::And(b)) => a == b,
            (Expr::Not(a), Expr::Not(b)) => a == b,
            (Expr::Equals(a), Expr::Equals(b))
            | (Expr::NotEquals(a), Expr::NotEquals(b))
            | (Expr::In(a), Expr::In(b)) => a == b,
            (Expr::Variable(a), Expr::Variable(b)) => a == b,
            (Expr::StringLit(a), Expr::StringLit(b)) => a == b,
            (Expr::BoolLit(a), Expr::BoolLit(b)) => a == b,
            (Expr::List(a), Expr::List(b)) => a == b,
            _ => false,
        })
    }
}

impl Eq for Expr {}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, 0)
    }
}
