use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::{debug, trace};

use crate::ast::*;
use crate::error::{EvalError, TypeError};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    String(String),
    Bool(bool),
    List(Vec<Value>),
}

/// Variable bindings an expression is evaluated against.
pub type Context = HashMap<String, Value>;

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// Membership of `item` in `self`: element of a list, or substring of a
    /// string. Anything else is not a container.
    pub fn contains(&self, item: &Value) -> Result<bool, TypeError> {
        match (self, item) {
            (Value::List(items), _) => Ok(items.contains(item)),
            (Value::String(haystack), Value::String(needle)) => {
                Ok(haystack.contains(needle.as_str()))
            }
            (Value::String(_), other) => Err(TypeError::new(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
            (Value::Bool(_), _) => Err(TypeError::new(format!(
                "argument of type '{}' is not a container",
                self.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Evaluate `expr` against `context`.
pub fn evaluate(expr: &Expr, context: &Context) -> Result<Value, EvalError> {
    expr.evaluate(context)
}

impl Expr {
    pub fn evaluate(&self, context: &Context) -> Result<Value, EvalError> {
        ensure_sufficient_stack(|| match self {
            // Both connectives yield the deciding operand itself, not a bool.
            Expr::Or(operands) => short_circuit(operands, context, true),
            Expr::And(operands) => short_circuit(operands, context, false),
            Expr::Not(operand) => Ok(Value::Bool(!operand.evaluate(context)?.is_truthy())),
            Expr::Equals(test) => {
                let (left, right) = test.operands(context)?;
                Ok(Value::Bool(left == right))
            }
            Expr::NotEquals(test) => {
                let (left, right) = test.operands(context)?;
                Ok(Value::Bool(left != right))
            }
            Expr::In(test) => {
                let (item, container) = test.operands(context)?;
                container
                    .contains(&item)
                    .map(Value::Bool)
                    .map_err(|source| EvalError::InTestType {
                        position: test.op_token.position,
                        source,
                    })
            }
            Expr::Variable(var) => context.get(&var.name).cloned().ok_or_else(|| {
                EvalError::UndefinedVariable {
                    name: var.name.clone(),
                    position: var.token.position,
                }
            }),
            Expr::StringLit(s) => Ok(Value::String(s.clone())),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::List(items) => items
                .iter()
                .map(|item| item.evaluate(context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        })
    }
}

/// Stop at the first operand whose truthiness equals `stop_when`.
fn short_circuit(
    operands: &Operands,
    context: &Context,
    stop_when: bool,
) -> Result<Value, EvalError> {
    let mut iter = operands.iter();
    let mut value = match iter.next() {
        Some(first) => first.evaluate(context)?,
        None => return Ok(Value::Bool(!stop_when)),
    };
    for operand in iter {
        if value.is_truthy() == stop_when {
            break;
        }
        value = operand.evaluate(context)?;
    }
    Ok(value)
}

impl BinaryTest {
    fn operands(&self, context: &Context) -> Result<(Value, Value), EvalError> {
        Ok((self.left.evaluate(context)?, self.right.evaluate(context)?))
    }
}

/// Anything that can hold variable references.
pub trait References {
    /// Push every variable reference in the subtree, in source order.
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>);
}

/// Every reference in `node` whose name is not in `known`. Nothing is
/// evaluated, so references behind a short-circuit are reported too.
pub fn undefined_variables<N: References + ?Sized>(
    node: &N,
    known: &HashSet<String>,
) -> BTreeSet<Token> {
    let mut refs = Vec::new();
    node.collect_references(&mut refs);
    refs.into_iter()
        .filter(|var| !known.contains(&var.name))
        .map(|var| var.token.clone())
        .collect()
}

impl References for Expr {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        ensure_sufficient_stack(move || match self {
            Expr::Or(operands) | Expr::And(operands) => {
                for operand in operands {
                    operand.collect_references(out);
                }
            }
            Expr::Not(operand) => operand.collect_references(out),
            Expr::Equals(test) | Expr::NotEquals(test) | Expr::In(test) => {
                test.left.collect_references(out);
                test.right.collect_references(out);
            }
            Expr::Variable(var) => out.push(var),
            Expr::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Expr::StringLit(_) | Expr::BoolLit(_) => {}
        });
    }
}

impl References for Assignment {
    // The left-hand side is a binding, not a reference.
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        self.rhs.collect_references(out);
    }
}

impl References for VarAssignments {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        for item in &self.items {
            item.collect_references(out);
        }
    }
}

impl References for Section {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        self.predicate.collect_references(out);
    }
}

impl References for Config {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        for section in &self.sections {
            section.collect_references(out);
        }
    }
}

impl References for Root {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        self.assignments.collect_references(out);
        self.config.collect_references(out);
    }
}

impl VarAssignments {
    /// Evaluate the assignments in order on top of `context`. Each one sees
    /// the caller's bindings plus every earlier assignment.
    #[tracing::instrument(level = "debug", skip_all, fields(count = self.items.len()))]
    pub fn bind(&self, context: &Context) -> Result<Context, EvalError> {
        let mut bound = context.clone();
        for Assignment { lhs, rhs } in &self.items {
            let value = rhs.evaluate(&bound)?;
            trace!(name = %lhs.name, %value, "bound");
            bound.insert(lhs.name.clone(), value);
        }
        Ok(bound)
    }
}

impl Config {
    /// Sections whose predicate is truthy under `context`, in order.
    pub fn active_sections(&self, context: &Context) -> Result<Vec<&Section>, EvalError> {
        let mut active = Vec::new();
        for section in &self.sections {
            let value = section.predicate.evaluate(context)?;
            trace!(at = %section.start_marker.position, %value, "section predicate");
            if value.is_truthy() {
                active.push(section);
            }
        }
        Ok(active)
    }

    /// Default lines followed by the lines of every active section.
    #[tracing::instrument(level = "debug", skip_all, fields(sections = self.sections.len()))]
    pub fn render(&self, context: &Context) -> Result<Vec<String>, EvalError> {
        let mut lines = self.default_lines.clone();
        let active = self.active_sections(context)?;
        debug!(active = active.len(), "selected sections");
        for section in active {
            lines.extend(section.raw_lines.iter().cloned());
        }
        Ok(lines)
    }
}

impl Root {
    /// Bind the assignment block on top of `context`, then render the config.
    pub fn render(&self, context: &Context) -> Result<Vec<String>, EvalError> {
        let bound = self.assignments.bind(context)?;
        self.config.render(&bound)
    }

    /// Undefined references across the whole unit. Names assigned in the
    /// block count as known for every later assignment and for the config.
    pub fn check(&self, known: &HashSet<String>) -> BTreeSet<Token> {
        let mut known = known.clone();
        let mut undefined = BTreeSet::new();
        for item in &self.assignments.items {
            undefined.extend(undefined_variables(item, &known));
            known.insert(item.lhs.name.clone());
        }
        undefined.extend(undefined_variables(&self.config, &known));
        undefined
    }
}
