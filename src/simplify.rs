//! Removes the single-operand `or`/`and` wrappers the grammar builds around
//! every operand. Purely structural: evaluation results are unchanged.

use crate::ast::*;
use crate::stack::ensure_sufficient_stack;

/// Walk `expr` bottom-up, replacing any one-operand `Or`/`And` with its
/// operand. Chains of such wrappers collapse completely.
pub fn simplify(mut expr: Expr) -> Expr {
    collapse(&mut expr);
    expr
}

// `Expr` has a custom `Drop`, so children are taken by swapping them out
// rather than by destructuring.
fn collapse(expr: &mut Expr) {
    ensure_sufficient_stack(|| {
        let replacement = match expr {
            Expr::Or(operands) | Expr::And(operands) => {
                operands.iter_mut().for_each(collapse);
                operands.take_single()
            }
            Expr::Not(operand) => {
                collapse(operand);
                None
            }
            Expr::Equals(test) | Expr::NotEquals(test) | Expr::In(test) => {
                collapse(&mut test.left);
                collapse(&mut test.right);
                None
            }
            Expr::List(items) => {
                items.iter_mut().for_each(collapse);
                None
            }
            Expr::Variable(_) | Expr::StringLit(_) | Expr::BoolLit(_) => None,
        };
        if let Some(only) = replacement {
            *expr = only;
        }
    });
}

/// Simplify every expression in the unit.
pub fn simplify_root(root: Root) -> Root {
    let items = root
        .assignments
        .items
        .into_iter()
        .map(|a| Assignment {
            lhs: a.lhs,
            rhs: simplify(a.rhs),
        })
        .collect();
    let sections = root
        .config
        .sections
        .into_iter()
        .map(|s| Section {
            start_marker: s.start_marker,
            predicate: simplify(s.predicate),
            raw_lines: s.raw_lines,
        })
        .collect();
    Root {
        assignments: VarAssignments { items },
        config: Config {
            default_lines: root.config.default_lines,
            sections,
        },
    }
}
