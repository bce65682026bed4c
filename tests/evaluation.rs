use std::collections::HashSet;

use condconf::{
    evaluate, parse, undefined_variables, BinaryTest, Context, EvalError, Expr, Position, Root,
    Token, TokenKind, TokenStream, Value,
};
use rstest::rstest;
use TokenKind as K;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn v(name: &str) -> TokenKind {
    K::Variable(name.into())
}

fn s(value: &str) -> TokenKind {
    K::StringLit(value.into())
}

/// Parse a single predicate and return it.
fn predicate(kinds: Vec<TokenKind>) -> Expr {
    let mut stream = vec![K::PredicateStart];
    stream.extend(kinds);
    stream.extend([K::PredicateEnd, K::Eol]);
    let root = parse(TokenStream::from_kinds(stream)).unwrap_or_else(|err| panic!("{err}"));
    root.config.sections[0].predicate.clone()
}

fn context(pairs: &[(&str, Value)]) -> Context {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

fn known(names: &[&str]) -> HashSet<String> {
    names.iter().map(ToString::to_string).collect()
}

fn names(tokens: impl IntoIterator<Item = Token>) -> Vec<String> {
    tokens
        .into_iter()
        .filter_map(|t| match t.kind {
            K::Variable(name) => Some(name),
            _ => None,
        })
        .collect()
}

fn op(kind: TokenKind) -> Token {
    Token::new(kind, Position::new(1, 2))
}

#[test]
fn equal_strings_compare_true() {
    let expr = Expr::Equals(BinaryTest::new(
        op(K::Equals),
        Expr::StringLit("x".into()),
        Expr::StringLit("x".into()),
    ));
    assert_eq!(evaluate(&expr, &Context::new()), Ok(Value::Bool(true)));
}

#[test]
fn string_is_member_of_list() {
    let expr = Expr::In(BinaryTest::new(
        op(K::In),
        Expr::StringLit("a".into()),
        Expr::List(vec![Expr::StringLit("a".into()), Expr::StringLit("b".into())]),
    ));
    assert_eq!(evaluate(&expr, &Context::new()), Ok(Value::Bool(true)));
}

#[test]
fn membership_in_bool_is_a_type_error() {
    let expr = Expr::In(BinaryTest::new(
        op(K::In),
        Expr::StringLit("a".into()),
        Expr::BoolLit(true),
    ));
    let err = evaluate(&expr, &Context::new()).unwrap_err();
    match err {
        EvalError::InTestType { position, source } => {
            assert_eq!(position, Position::new(1, 2));
            assert_eq!(source.to_string(), "argument of type 'bool' is not a container");
        }
        other => panic!("expected in-test type error, got {other:?}"),
    }
}

#[test]
fn or_skips_operands_after_a_truthy_one() {
    let expr = predicate(vec![K::True, K::Or, v("undefined")]);
    assert_eq!(evaluate(&expr, &Context::new()), Ok(Value::Bool(true)));
}

#[test]
fn and_skips_operands_after_a_falsy_one() {
    let expr = predicate(vec![s(""), K::And, v("undefined")]);
    assert_eq!(evaluate(&expr, &Context::new()), Ok(Value::from("")));
}

#[test]
fn evaluation_reaches_later_operand_when_needed() {
    let expr = predicate(vec![K::False, K::Or, v("undefined")]);
    let err = evaluate(&expr, &Context::new()).unwrap_err();
    assert_eq!(
        err,
        EvalError::UndefinedVariable {
            name: "undefined".into(),
            position: Position::new(1, 4),
        }
    );
}

#[rstest]
#[case(vec![v("os"), K::Equals, s("linux")], true)]
#[case(vec![v("os"), K::NotEquals, s("linux")], false)]
#[case(vec![s("x86"), K::In, v("arches")], true)]
#[case(vec![s("lin"), K::In, v("os")], true)]
#[case(vec![K::Not, v("debug")], true)]
#[case(vec![K::Not, K::LParen, v("os"), K::Equals, s("mac"), K::Or, v("debug"), K::RParen], true)]
#[case(vec![v("arches"), K::Equals, K::ListStart, s("x86"), K::Comma, s("arm"), K::ListEnd], true)]
#[case(vec![K::ListStart, v("debug"), K::ListEnd, K::And, v("os")], true)]
fn predicates_against_environment(#[case] kinds: Vec<TokenKind>, #[case] expected: bool) {
    let env = context(&[
        ("os", Value::from("linux")),
        ("arches", Value::from(vec!["x86", "arm"])),
        ("debug", Value::Bool(false)),
    ]);
    let value = evaluate(&predicate(kinds), &env).unwrap();
    assert_eq!(value.is_truthy(), expected, "value was {value}");
}

#[test]
fn undefined_variables_ignores_short_circuit() {
    let expr = predicate(vec![v("x"), K::Or, v("y"), K::And, K::Not, v("z")]);
    let undefined = undefined_variables(&expr, &known(&["x"]));
    assert_eq!(names(undefined), vec!["y".to_string(), "z".to_string()]);
}

#[test]
fn undefined_variables_keeps_every_occurrence() {
    let expr = predicate(vec![v("y"), K::Or, v("y")]);
    let undefined = undefined_variables(&expr, &known(&[]));
    let positions: Vec<_> = undefined.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![Position::new(1, 2), Position::new(1, 4)]);
}

fn sample_unit() -> Root {
    parse(TokenStream::from_kinds([
        K::VarAssignsStart,
        K::Eol,
        v("server"),
        K::Assign,
        v("role"),
        K::Equals,
        s("server"),
        K::Eol,
        v("tiers"),
        K::Assign,
        K::ListStart,
        s("db"),
        K::Comma,
        v("tier"),
        K::ListEnd,
        K::Eol,
        K::VarAssignsEnd,
        K::Eol,
        K::RawLine("common".into()),
        K::PredicateStart,
        v("server"),
        K::PredicateEnd,
        K::Eol,
        K::RawLine("listen 0.0.0.0".into()),
        K::PredicateStart,
        s("db"),
        K::In,
        v("tiers"),
        K::And,
        v("server"),
        K::PredicateEnd,
        K::Eol,
        K::RawLine("db tuning".into()),
        K::PredicateStart,
        v("unknown"),
        K::PredicateEnd,
        K::Eol,
    ]))
    .unwrap_or_else(|err| panic!("{err}"))
}

#[test]
fn check_treats_assigned_names_as_known() {
    let root = sample_unit();
    let undefined = root.check(&known(&["role"]));
    assert_eq!(names(undefined), vec!["tier".to_string(), "unknown".to_string()]);

    let everything = undefined_variables(&root, &known(&["role"]));
    assert_eq!(names(everything).len(), 5);
}

#[test]
fn render_binds_assignments_then_selects_sections() {
    init_tracing();
    let mut trimmed = sample_unit();
    trimmed.config.sections.pop();

    let env = context(&[("role", Value::from("server")), ("tier", Value::from("web"))]);
    assert_eq!(
        trimmed.render(&env),
        Ok(vec![
            "common".to_string(),
            "listen 0.0.0.0".to_string(),
            "db tuning".to_string(),
        ])
    );

    let env = context(&[("role", Value::from("client")), ("tier", Value::from("web"))]);
    assert_eq!(trimmed.render(&env), Ok(vec!["common".to_string()]));
}

#[test]
fn render_fails_on_first_undefined_variable() {
    init_tracing();
    let root = sample_unit();
    let env = context(&[("role", Value::from("client")), ("tier", Value::from("web"))]);
    let err = root.render(&env).unwrap_err();
    assert!(matches!(err, EvalError::UndefinedVariable { ref name, .. } if name == "unknown"));
}

#[test]
fn bind_exposes_assigned_values() {
    let root = sample_unit();
    let env = context(&[("role", Value::from("server")), ("tier", Value::from("web"))]);
    let bound = root.assignments.bind(&env).unwrap();
    assert_eq!(bound.get("server"), Some(&Value::Bool(true)));
    assert_eq!(bound.get("tiers"), Some(&Value::from(vec!["db", "web"])));
    assert_eq!(bound.get("role"), Some(&Value::from("server")));
}

#[test]
fn one_tree_many_environments() {
    let expr = predicate(vec![
        v("os"),
        K::In,
        K::ListStart,
        s("linux"),
        K::Comma,
        s("bsd"),
        K::ListEnd,
    ]);
    let results: Vec<_> = ["linux", "mac", "bsd"]
        .into_iter()
        .map(|os| evaluate(&expr, &context(&[("os", Value::from(os))])))
        .collect();
    assert_eq!(
        results,
        vec![Ok(Value::Bool(true)), Ok(Value::Bool(false)), Ok(Value::Bool(true))]
    );
}
