//! Parser tests: precedence, statement forms and syntax errors

use crate::ast::{BinOp, Expr, Literal, Rule, UnOp};
use crate::error::{ExceptionId, UserVisibleException};
use crate::lexer::tokenize;
use crate::parser::parse;

/// Helper to tokenize and parse a rule
fn parse_source(source: &str) -> crate::error::Result<Rule> {
    let tokens = tokenize(source)?;
    parse(&tokens)
}

/// Helper to parse and expect success
fn parse_ok(source: &str) -> Rule {
    parse_source(source).expect("Parse should succeed")
}

/// Helper to parse a non-empty rule and return its top expression
fn body(source: &str) -> Expr {
    parse_ok(source).body.expect("rule should not be empty").node
}

/// Helper to parse and expect failure
fn parse_error(source: &str) -> UserVisibleException {
    parse_source(source).expect_err("Parse should fail")
}

/// Helper to check if parsing fails
fn parse_fails(source: &str) -> bool {
    parse_source(source).is_err()
}

fn assert_error(source: &str, id: ExceptionId, position: usize, params: &[&str]) {
    let err = parse_error(source);
    assert_eq!(err.id, id, "{source}");
    assert_eq!(err.position, position, "{source}");
    assert_eq!(err.params, params, "{source}");
}

// ============================================
// Literals and atoms
// ============================================

#[test]
fn test_parse_int_literal() {
    assert_eq!(body("42"), Expr::Literal(Literal::Int(42)));
}

#[test]
fn test_parse_constants() {
    assert_eq!(body("true"), Expr::Literal(Literal::Bool(true)));
    assert_eq!(body("FALSE"), Expr::Literal(Literal::Bool(false)));
    assert_eq!(body("null"), Expr::Literal(Literal::Null));
    assert_eq!(body("'abc'"), Expr::Literal(Literal::Str("abc".into())));
}

#[test]
fn test_parse_empty_rule() {
    assert_eq!(parse_ok(""), Rule::empty());
    assert_eq!(parse_ok(" ; ;; "), Rule::empty());
    assert_eq!(parse_ok("/* only a comment */"), Rule::empty());
}

#[test]
fn test_parse_variables_are_lowercased() {
    assert_eq!(body("User_Name"), Expr::Var("user_name".into()));
    assert_eq!(body("my_var"), Expr::Var("my_var".into()));
}

#[test]
fn test_parse_array_literal() {
    let Expr::Array(items) = body("[1, 'a', [2],]") else {
        panic!("Expected Array");
    };
    assert_eq!(items.len(), 3);
    assert!(matches!(items[2].node, Expr::Array(_)));
    assert_eq!(body("[]"), Expr::Array(vec![]));
}

#[test]
fn test_parse_group() {
    let Expr::Group(inner) = body("(1; 2)") else {
        panic!("Expected Group");
    };
    assert!(matches!(inner.node, Expr::Block(ref stmts) if stmts.len() == 2));
}

// ============================================
// Operators
// ============================================

#[test]
fn test_parse_multiplication_binds_tighter() {
    let Expr::Binary { left, op, right } = body("1 + 2 * 3") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Add);
    assert_eq!(left.node, Expr::Literal(Literal::Int(1)));
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_parse_left_associative() {
    let Expr::Binary { left, op, .. } = body("1 - 2 - 3") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Sub);
    assert!(matches!(left.node, Expr::Binary { op: BinOp::Sub, .. }));
}

#[test]
fn test_parse_power_right_associative() {
    let Expr::Binary { left, op, right } = body("2 ** 3 ** 2") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Pow);
    assert_eq!(left.node, Expr::Literal(Literal::Int(2)));
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Pow, .. }));
}

#[test]
fn test_parse_unary_binds_tighter_than_power() {
    let Expr::Binary { left, op, .. } = body("-2 ** 2") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(left.node, Expr::Unary { op: UnOp::Neg, .. }));
}

#[test]
fn test_parse_boolean_levels() {
    // & binds tighter than | and ^
    let Expr::Binary { op, right, .. } = body("a | b & c") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Or);
    assert!(matches!(right.node, Expr::Binary { op: BinOp::And, .. }));

    let Expr::Binary { op, left, .. } = body("a ^ b | c") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Or);
    assert!(matches!(left.node, Expr::Binary { op: BinOp::Xor, .. }));
}

#[test]
fn test_parse_keyword_operator_aliases() {
    let cases = [
        ("a in b", BinOp::In),
        ("a contains b", BinOp::Contains),
        ("a like b", BinOp::Like),
        ("a matches b", BinOp::Like),
        ("a rlike b", BinOp::Rlike),
        ("a regex b", BinOp::Rlike),
        ("a IRLIKE b", BinOp::Irlike),
    ];
    for (source, expected) in cases {
        assert!(
            matches!(body(source), Expr::Binary { op, .. } if op == expected),
            "{source}"
        );
    }
}

#[test]
fn test_parse_keyword_operator_below_comparison() {
    let Expr::Binary { op, left, .. } = body("a + 'x' in b == true") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Eq);
    assert!(matches!(left.node, Expr::Binary { op: BinOp::In, .. }));
}

#[test]
fn test_parse_single_equals_is_comparison() {
    assert!(matches!(body("a = 1"), Expr::Binary { op: BinOp::Eq, .. }));
    assert!(matches!(body("a == 1"), Expr::Binary { op: BinOp::Eq, .. }));
}

// ============================================
// Comparison chains
// ============================================

const EQUALITY_OPS: &[&str] = &["==", "===", "!=", "!==", "="];
const ORDERING_OPS: &[&str] = &["<", ">", "<=", ">="];

#[test]
fn test_parse_comparison_chain_grid() {
    let all: Vec<&str> = EQUALITY_OPS.iter().chain(ORDERING_OPS).copied().collect();
    for first in &all {
        for second in &all {
            let source = format!("1 {first} 3.14 {second} -1");
            let same_family = EQUALITY_OPS.contains(first) == EQUALITY_OPS.contains(second);
            if same_family {
                let second_pos = 2 + first.len() + 6;
                assert_error(&source, ExceptionId::UnexpectedToken, second_pos, &[*second]);
            } else {
                assert!(parse_source(&source).is_ok(), "{source} should parse");
            }
        }
    }
}

#[test]
fn test_parse_comparison_chain_limited_to_two() {
    assert_error("1 === 1 < 3 === 0", ExceptionId::UnexpectedToken, 12, &["==="]);
    assert_error("1 < 2 == 3 > 4", ExceptionId::UnexpectedToken, 11, &[">"]);
    assert_error("1 == 1 == 1", ExceptionId::UnexpectedToken, 7, &["=="]);
}

#[test]
fn test_parse_parenthesised_chain() {
    assert!(!parse_fails("(1 == 1) == 1"));
    assert!(!parse_fails("(1 < 2) < (3 < 4)"));
}

// ============================================
// Statements
// ============================================

#[test]
fn test_parse_sequence() {
    let Expr::Block(stmts) = body("a := 1; a") else {
        panic!("Expected Block");
    };
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0].node.assigned_name(), Some("a"));
    assert_eq!(stmts[1].node, Expr::Var("a".into()));
}

#[test]
fn test_parse_trailing_semicolon() {
    assert_eq!(body("1;"), Expr::Literal(Literal::Int(1)));
    assert_eq!(body(";;1;;"), Expr::Literal(Literal::Int(1)));
}

#[test]
fn test_parse_assignment_right_associative() {
    let Expr::Assign { name, value } = body("a := b := 3") else {
        panic!("Expected Assign");
    };
    assert_eq!(name, "a");
    assert_eq!(value.node.assigned_name(), Some("b"));
}

#[test]
fn test_parse_assignment_lowercases_name() {
    assert_eq!(body("MyVar := 1").assigned_name(), Some("myvar"));
}

#[test]
fn test_parse_array_assignments() {
    assert!(matches!(body("a[] := 1"), Expr::Append { ref name, .. } if name == "a"));
    assert!(matches!(body("a[1 + 1] := 2"), Expr::IndexAssign { ref name, .. } if name == "a"));
    assert!(matches!(body("a[b[0]] := 2"), Expr::IndexAssign { .. }));
}

#[test]
fn test_parse_index_read_is_not_assignment() {
    let Expr::Binary { left, op, .. } = body("a[0] = 1") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Eq);
    assert!(matches!(left.node, Expr::Index { .. }));
    assert!(matches!(body("a[0][1]"), Expr::Index { .. }));
}

#[test]
fn test_parse_setter_becomes_assignment() {
    let Expr::Assign { name, value } = body("set('X', 1 + 2)") else {
        panic!("Expected Assign");
    };
    assert_eq!(name, "x");
    assert!(matches!(value.node, Expr::Binary { op: BinOp::Add, .. }));
    assert_eq!(body("set_var(\"y\", 2)").assigned_name(), Some("y"));
}

#[test]
fn test_parse_if_then_else() {
    let Expr::If { else_branch, .. } = body("if a then b end") else {
        panic!("Expected If");
    };
    assert!(else_branch.is_none());

    let Expr::If {
        then_branch,
        else_branch,
        ..
    } = body("IF a THEN b; c ELSE d END")
    else {
        panic!("Expected If");
    };
    assert!(matches!(then_branch.node, Expr::Block(_)));
    assert!(else_branch.is_some());
}

#[test]
fn test_parse_ternary() {
    let Expr::If { else_branch, .. } = body("a ? b : c ? d : e") else {
        panic!("Expected If");
    };
    let else_branch = else_branch.expect("ternary always has an else branch");
    assert!(matches!(else_branch.node, Expr::If { .. }));
}

#[test]
fn test_parse_ternary_branches_may_assign() {
    let Expr::If { then_branch, .. } = body("a ? x := 1 : x := 2") else {
        panic!("Expected If");
    };
    assert_eq!(then_branch.node.assigned_name(), Some("x"));
}

// ============================================
// Calls
// ============================================

#[test]
fn test_parse_call() {
    let Expr::Call { func, args } = body("LCASE('A')") else {
        panic!("Expected Call");
    };
    assert_eq!(func, "lcase");
    assert_eq!(args.len(), 1);
}

#[test]
fn test_parse_variadic_trailing_comma() {
    let Expr::Call { args, .. } = body("contains_any('abc', 'a', 'b',)") else {
        panic!("Expected Call");
    };
    assert_eq!(args.len(), 3);
    assert_error("lcase('a',)", ExceptionId::UnexpectedToken, 10, &[")"]);
}

#[test]
fn test_parse_arity_errors() {
    assert_error("lcase()", ExceptionId::NoParams, 0, &["lcase"]);
    assert_error("substr()", ExceptionId::NotEnoughArgs, 0, &["substr", "2", "0"]);
    assert_error("1 + substr('a')", ExceptionId::NotEnoughArgs, 4, &["substr", "2", "1"]);
    assert_error("lcase('a', 'b')", ExceptionId::TooManyArgs, 0, &["lcase", "1", "2"]);
    assert_error(
        "str_replace('a')",
        ExceptionId::NotEnoughArgs,
        0,
        &["str_replace", "3", "1"],
    );
}

#[test]
fn test_parse_unknown_function() {
    assert_error("foo(1)", ExceptionId::UnknownFunction, 0, &["foo"]);
    assert_error("1 + bar(", ExceptionId::UnknownFunction, 4, &["bar"]);
}

#[test]
fn test_parse_function_as_value() {
    assert_error("lcase", ExceptionId::UseBuiltin, 0, &["lcase"]);
    assert_error("1 + rescape", ExceptionId::UseBuiltin, 4, &["rescape"]);
}

#[test]
fn test_parse_bad_argument_lists() {
    assert_error("lcase('a' 'b')", ExceptionId::ExpectedNotFound, 10, &[")", "\"b\""]);
    assert_error("count(,)", ExceptionId::UnexpectedToken, 6, &[","]);
    assert_error("count('a',,'b')", ExceptionId::UnexpectedToken, 10, &[","]);
}

// ============================================
// Assignment restrictions
// ============================================

#[test]
fn test_parse_override_builtin() {
    assert_error("true := 1", ExceptionId::OverrideBuiltin, 0, &["true"]);
    assert_error("lcase := 1", ExceptionId::OverrideBuiltin, 0, &["lcase"]);
    assert_error("x := 1; user_name := 2", ExceptionId::OverrideBuiltin, 8, &["user_name"]);
    assert_error("added_lines[] := 'x'", ExceptionId::OverrideBuiltin, 0, &["added_lines"]);
    assert_error("set('lcase', 1)", ExceptionId::OverrideBuiltin, 4, &["lcase"]);
    assert_error("set('Page_Title', 1)", ExceptionId::OverrideBuiltin, 4, &["page_title"]);
}

#[test]
fn test_parse_variable_variable() {
    assert_error("set(x, 1)", ExceptionId::VariableVariable, 4, &[]);
    assert_error("set('a' + 'b', 1)", ExceptionId::VariableVariable, 4, &[]);
}

// ============================================
// Structural errors
// ============================================

#[test]
fn test_parse_unexpected_token() {
    assert_error("1 +", ExceptionId::UnexpectedToken, 3, &["end of input"]);
    assert_error("()", ExceptionId::UnexpectedToken, 1, &[")"]);
    assert_error("[1,,2]", ExceptionId::UnexpectedToken, 3, &[","]);
    assert_error("a[]", ExceptionId::UnexpectedToken, 2, &["]"]);
    assert_error("if 1 then end", ExceptionId::UnexpectedToken, 10, &["end"]);
}

#[test]
fn test_parse_expected_not_found() {
    assert_error("(1", ExceptionId::ExpectedNotFound, 2, &[")", "end of input"]);
    assert_error("[1, 2", ExceptionId::ExpectedNotFound, 5, &["]", "end of input"]);
    assert_error("if 1 2 end", ExceptionId::ExpectedNotFound, 5, &["then", "2"]);
    assert_error("if 1 then 2", ExceptionId::ExpectedNotFound, 11, &["end", "end of input"]);
    assert_error("1 ? 2", ExceptionId::ExpectedNotFound, 5, &[":", "end of input"]);
}

#[test]
fn test_parse_unexpected_at_end() {
    assert_error("1 2", ExceptionId::UnexpectedAtEnd, 2, &["2"]);
    assert_error("1)", ExceptionId::UnexpectedAtEnd, 1, &[")"]);
    assert_error("a := 1 end", ExceptionId::UnexpectedAtEnd, 7, &["end"]);
}

#[test]
fn test_parse_unrecognised_keyword() {
    assert_error("1 + then", ExceptionId::UnrecognisedKeyword, 4, &["then"]);
    assert_error("in", ExceptionId::UnrecognisedKeyword, 0, &["in"]);
}

#[test]
fn test_parse_deep_nesting() {
    let parens = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
    assert!(!parse_fails(&parens));
    let nots = format!("{}1", "!".repeat(2000));
    assert!(!parse_fails(&nots));
    let powers = vec!["2"; 2000].join("**");
    assert!(!parse_fails(&powers));
}

#[test]
fn test_parse_nested_index_reads_are_linear() {
    let nested = format!("{}1{}", "a[".repeat(40), "]".repeat(40));
    let started = std::time::Instant::now();
    let mut expr = body(&nested);
    assert!(started.elapsed() < std::time::Duration::from_secs(1));

    let mut depth = 0;
    while let Expr::Index { index, .. } = expr {
        depth += 1;
        expr = index.node;
    }
    assert_eq!(depth, 40);
    assert_eq!(expr, Expr::Literal(Literal::Int(1)));
}

#[test]
fn test_parse_index_read_continues_expression() {
    let Expr::Binary { left, op, right } = body("a[0] - 1 * 2") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Sub);
    assert_eq!(left.span.start, 0);
    assert!(matches!(left.node, Expr::Index { .. }));
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Mul, .. }));

    let Expr::If { cond, .. } = body("a[0][1] ? 1 : 2") else {
        panic!("Expected If");
    };
    assert!(matches!(cond.node, Expr::Index { ref base, .. } if matches!(base.node, Expr::Index { .. })));

    let rule = parse_ok("x[1] ** 2 == 4");
    assert_eq!(rule.body.expect("non-empty").span.start, 0);
}

#[test]
fn test_parse_function_name_index_is_use_builtin() {
    assert_error("lcase[0]", ExceptionId::UseBuiltin, 0, &["lcase"]);
    assert_error("lcase[0 +]", ExceptionId::UseBuiltin, 0, &["lcase"]);
    assert_error("lcase[0] := 1", ExceptionId::OverrideBuiltin, 0, &["lcase"]);
}

// ============================================
// Positions
// ============================================

#[test]
fn test_parse_spans_use_character_offsets() {
    let rule = parse_ok("a := 1 + 2");
    let top = rule.body.expect("non-empty");
    assert_eq!(top.span.start, 0);
    let Expr::Assign { value, .. } = top.node else {
        panic!("Expected Assign");
    };
    assert_eq!(value.span.start, 5);

    // Multi-byte characters count once
    assert_error("'ü' + foo()", ExceptionId::UnknownFunction, 6, &["foo"]);
}
