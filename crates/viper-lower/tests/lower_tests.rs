//! Integration tests for lowering parse trees into the Viper AST.
//!
//! Trees are assembled with `viper_lower::tree::build`, which mirrors the
//! nesting a PEG Python parser produces.

use pretty_assertions::assert_eq;
use std::rc::Rc;
use viper_lower::tree::build::*;
use viper_lower::{lower_expression, lower_file, LowerError, Node, Rule, SyntaxNode, TokenKind};
use viper_types::ast::*;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Lower a single expression tree (panics on lowering errors).
fn lower(node: Node) -> Expr {
    lower_expression(&expr(node)).expect("lowering failed")
}

fn lower_err(node: Node) -> LowerError {
    lower_expression(&expr(node)).expect_err("lowering should fail")
}

/// Lower a whole file (panics on lowering errors).
fn program(stmts: Vec<Node>) -> Block {
    lower_file(&file(stmts)).expect("lowering failed")
}

fn program_err(stmts: Vec<Node>) -> LowerError {
    lower_file(&file(stmts)).expect_err("lowering should fail")
}

fn int(n: i64) -> Expr {
    Expr::Int(n)
}

fn id(name: &str) -> Expr {
    Expr::ident(name)
}

// ══════════════════════════════════════════════════════════════════════════════
// Atoms
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn atom_literals() {
    assert_eq!(lower(number("42")), int(42));
    assert_eq!(lower(number("1_000")), int(1000));
    assert_eq!(lower(keyword(TokenKind::True)), Expr::Bool(true));
    assert_eq!(lower(keyword(TokenKind::False)), Expr::Bool(false));
    assert_eq!(lower(keyword(TokenKind::None)), Expr::None);
    assert_eq!(lower(name("spam")), id("spam"));
}

#[test]
fn atom_invalid_number() {
    assert_eq!(
        lower_err(number("1.5")),
        LowerError::InvalidLiteral { text: "1.5".into() }
    );
    assert_eq!(
        lower_err(number("99999999999999999999")),
        LowerError::InvalidLiteral {
            text: "99999999999999999999".into()
        }
    );
}

#[test]
fn atom_group_is_transparent() {
    let grouped = group(binary(Rule::Sum, number("1"), TokenKind::Plus, number("2")));
    assert_eq!(
        lower(grouped),
        Expr::binary(BinaryOp::Add, int(1), int(2))
    );
}

#[test]
fn atom_unsupported_kinds() {
    let strings = Node::new(Rule::Atom).with(Node::new(Rule::Strings));
    assert!(matches!(
        lower_err(strings),
        LowerError::Unsupported {
            rule: Rule::Atom,
            ..
        }
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Precedence levels
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn sum_is_left_associative() {
    // 1 + 2 - 3
    let tree = binary(
        Rule::Sum,
        binary(Rule::Sum, number("1"), TokenKind::Plus, number("2")),
        TokenKind::Minus,
        number("3"),
    );
    assert_eq!(
        lower(tree),
        Expr::binary(
            BinaryOp::Sub,
            Expr::binary(BinaryOp::Add, int(1), int(2)),
            int(3)
        )
    );
}

#[test]
fn term_operators() {
    let cases = [
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::DoubleSlash, BinaryOp::FloorDiv),
        (TokenKind::Percent, BinaryOp::Mod),
        (TokenKind::At, BinaryOp::MatMul),
    ];
    for (token, op) in cases {
        let tree = binary(Rule::Term, name("a"), token, name("b"));
        assert_eq!(lower(tree), Expr::binary(op, id("a"), id("b")), "{op}");
    }
}

#[test]
fn bitwise_and_shift_levels() {
    let cases = [
        (Rule::BitwiseOr, TokenKind::VBar, BinaryOp::BitOr),
        (Rule::BitwiseXor, TokenKind::Circumflex, BinaryOp::BitXor),
        (Rule::BitwiseAnd, TokenKind::Amper, BinaryOp::BitAnd),
        (Rule::ShiftExpr, TokenKind::LeftShift, BinaryOp::Shl),
        (Rule::ShiftExpr, TokenKind::RightShift, BinaryOp::Shr),
    ];
    for (level, token, op) in cases {
        let tree = binary(level, number("1"), token, number("2"));
        assert_eq!(lower(tree), Expr::binary(op, int(1), int(2)), "{op}");
    }
}

#[test]
fn mixed_levels_nest_by_precedence() {
    // 1 + 2 * 3
    let tree = binary(
        Rule::Sum,
        number("1"),
        TokenKind::Plus,
        binary(Rule::Term, number("2"), TokenKind::Star, number("3")),
    );
    let lowered = lower(tree);
    assert_eq!(
        lowered,
        Expr::binary(
            BinaryOp::Add,
            int(1),
            Expr::binary(BinaryOp::Mul, int(2), int(3))
        )
    );
    assert_eq!(lowered.to_string(), "1 + 2 * 3");
}

#[test]
fn unary_and_power() {
    assert_eq!(
        lower(unary(TokenKind::Minus, number("1"))),
        Expr::unary(UnaryOp::Neg, int(1))
    );
    assert_eq!(
        lower(unary(TokenKind::Plus, number("1"))),
        Expr::unary(UnaryOp::Pos, int(1))
    );
    assert_eq!(
        lower(unary(TokenKind::Tilde, number("1"))),
        Expr::unary(UnaryOp::BitNot, int(1))
    );
    assert_eq!(
        lower(power(number("2"), unary(TokenKind::Minus, number("3")))),
        Expr::binary(BinaryOp::Pow, int(2), Expr::unary(UnaryOp::Neg, int(3)))
    );
}

#[test]
fn await_is_rejected() {
    let awaited = Node::new(Rule::AwaitPrimary)
        .tok(TokenKind::Await)
        .with(lift(name("job"), Rule::Primary));
    assert_eq!(
        lower_err(awaited),
        LowerError::Unsupported {
            rule: Rule::AwaitPrimary,
            text: "await job".into()
        }
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Boolean operators & comparisons
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn disjunction_and_conjunction_fold_left() {
    let tree = disjunction(vec![name("a"), name("b"), name("c")]);
    assert_eq!(
        lower(tree),
        Expr::binary(
            BinaryOp::Or,
            Expr::binary(BinaryOp::Or, id("a"), id("b")),
            id("c")
        )
    );
    let tree = conjunction(vec![name("a"), not(name("b"))]);
    assert_eq!(
        lower(tree),
        Expr::binary(BinaryOp::And, id("a"), Expr::unary(UnaryOp::Not, id("b")))
    );
}

#[test]
fn comparison_operators() {
    let cases = [
        (Rule::EqBitwiseOr, BinaryOp::Eq),
        (Rule::NoteqBitwiseOr, BinaryOp::NotEq),
        (Rule::LteBitwiseOr, BinaryOp::LtE),
        (Rule::LtBitwiseOr, BinaryOp::Lt),
        (Rule::GteBitwiseOr, BinaryOp::GtE),
        (Rule::GtBitwiseOr, BinaryOp::Gt),
        (Rule::NotinBitwiseOr, BinaryOp::NotIn),
        (Rule::InBitwiseOr, BinaryOp::In),
        (Rule::IsnotBitwiseOr, BinaryOp::IsNot),
        (Rule::IsBitwiseOr, BinaryOp::Is),
    ];
    for (pair, op) in cases {
        let tree = comparison(name("a"), vec![(pair, name("b"))]);
        assert_eq!(lower(tree), Expr::binary(op, id("a"), id("b")), "{op}");
    }
}

#[test]
fn comparison_chain_reuses_middle_operand() {
    // 1 < 2 <= 3 == 4
    let tree = comparison(
        number("1"),
        vec![
            (Rule::LtBitwiseOr, number("2")),
            (Rule::LteBitwiseOr, number("3")),
            (Rule::EqBitwiseOr, number("4")),
        ],
    );
    assert_eq!(
        lower(tree),
        Expr::binary(
            BinaryOp::And,
            Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Lt, int(1), int(2)),
                Expr::binary(BinaryOp::LtE, int(2), int(3)),
            ),
            Expr::binary(BinaryOp::Eq, int(3), int(4)),
        )
    );
}

#[test]
fn ternary_expression() {
    let tree = ternary(number("1"), name("flag"), number("2"));
    assert_eq!(
        lower(tree),
        Expr::ternary(int(1), id("flag"), int(2))
    );
}

#[test]
fn lambda_is_rejected() {
    let tree = Node::new(Rule::Expression).with(Node::new(Rule::Lambdef));
    assert!(matches!(
        lower_expression(&tree),
        Err(LowerError::Unsupported {
            rule: Rule::Expression,
            ..
        })
    ));
}

#[test]
fn malformed_tree_reports_missing_child() {
    assert_eq!(
        lower_expression(&Node::new(Rule::Expression)),
        Err(LowerError::MissingChild {
            rule: Rule::Expression,
            expected: "disjunction"
        })
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Calls & primaries
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn call_with_and_without_arguments() {
    assert_eq!(lower(call(name("f"), vec![])), Expr::call(id("f"), vec![]));
    assert_eq!(
        lower(call(name("add"), vec![number("3"), number("4")])),
        Expr::call(id("add"), vec![int(3), int(4)])
    );
}

#[test]
fn call_of_call_result() {
    let tree = call(call(name("make"), vec![]), vec![number("1")]);
    assert_eq!(
        lower(tree),
        Expr::call(Expr::call(id("make"), vec![]), vec![int(1)])
    );
}

#[test]
fn attribute_access_is_rejected() {
    let tree = Node::new(Rule::Primary)
        .with(lift(name("obj"), Rule::Primary))
        .tok(TokenKind::Dot)
        .leaf(TokenKind::Name, "field");
    assert_eq!(
        lower_err(tree),
        LowerError::Unsupported {
            rule: Rule::Primary,
            text: "obj . field".into()
        }
    );
}

#[test]
fn keyword_arguments_are_rejected() {
    let tree = Node::new(Rule::Primary)
        .with(lift(name("f"), Rule::Primary))
        .tok(TokenKind::Lpar)
        .with(Node::new(Rule::Arguments).with(Node::new(Rule::Args).with(Node::new(Rule::Kwargs))))
        .tok(TokenKind::Rpar);
    assert!(matches!(
        lower_err(tree),
        LowerError::Unsupported {
            rule: Rule::Args,
            ..
        }
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Simple statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn empty_file() {
    assert_eq!(program(vec![]), Block::default());
}

#[test]
fn assignment_statement() {
    let block = program(vec![line(vec![assign("x", number("1"))])]);
    assert_eq!(
        block.stmts,
        vec![Stmt::Assign(AssignStmt {
            target: AssignTarget::new("x"),
            annotation: None,
            value: Some(int(1)),
        })]
    );
}

#[test]
fn annotated_assignment() {
    let block = program(vec![
        line(vec![annotated("x", name("int"), Some(number("1")))]),
        line(vec![annotated("y", name("int"), None)]),
    ]);
    assert_eq!(
        block.stmts,
        vec![
            Stmt::Assign(AssignStmt {
                target: AssignTarget::new("x"),
                annotation: Some(id("int")),
                value: Some(int(1)),
            }),
            Stmt::Assign(AssignStmt {
                target: AssignTarget::new("y"),
                annotation: Some(id("int")),
                value: None,
            }),
        ]
    );
    assert_eq!(block.to_string(), "x: int = 1\ny: int");
}

#[test]
fn return_assert_pass_and_expression_statements() {
    let block = program(vec![
        line(vec![return_stmt(None)]),
        line(vec![return_stmt(Some(number("2")))]),
        line(vec![assert_stmt(vec![keyword(TokenKind::True), name("x")])]),
        line(vec![pass()]),
        line(vec![expr_stmt(call(name("f"), vec![]))]),
    ]);
    assert_eq!(
        block.stmts,
        vec![
            Stmt::Return(None),
            Stmt::Return(Some(int(2))),
            Stmt::Assert(vec![Expr::Bool(true), id("x")]),
            Stmt::Pass,
            Stmt::Expr(Expr::call(id("f"), vec![])),
        ]
    );
}

#[test]
fn single_simple_statement_is_unwrapped() {
    let one = program(vec![line(vec![pass()])]);
    assert_eq!(one.stmts, vec![Stmt::Pass]);

    let two = program(vec![line(vec![assign("x", number("1")), pass()])]);
    assert!(matches!(&two.stmts[..], [Stmt::Simple(inner)] if inner.len() == 2));
    assert_eq!(two.to_string(), "x = 1; pass");
}

#[test]
fn starred_target_is_rejected() {
    let target = Node::new(Rule::StarTargets).with(
        Node::new(Rule::StarTarget).tok(TokenKind::Star).with(
            Node::new(Rule::StarTarget).with(
                Node::new(Rule::TargetWithStarAtom)
                    .with(Node::new(Rule::StarAtom).leaf(TokenKind::Name, "rest")),
            ),
        ),
    );
    let stmt = Node::new(Rule::SimpleStmt).with(
        Node::new(Rule::Assignment)
            .with(target)
            .tok(TokenKind::Equal)
            .with(
                Node::new(Rule::StarExpressions)
                    .with(Node::new(Rule::StarExpression).with(expr(number("1")))),
            ),
    );
    assert_eq!(
        program_err(vec![line(vec![stmt])]),
        LowerError::Unsupported {
            rule: Rule::StarTarget,
            text: "* rest".into()
        }
    );
}

#[test]
fn chained_assignment_is_rejected() {
    let target = |n: &str| {
        Node::new(Rule::StarTargets).with(
            Node::new(Rule::StarTarget).with(
                Node::new(Rule::TargetWithStarAtom)
                    .with(Node::new(Rule::StarAtom).leaf(TokenKind::Name, n)),
            ),
        )
    };
    let stmt = Node::new(Rule::SimpleStmt).with(
        Node::new(Rule::Assignment)
            .with(target("a"))
            .tok(TokenKind::Equal)
            .with(target("b"))
            .tok(TokenKind::Equal)
            .with(
                Node::new(Rule::StarExpressions)
                    .with(Node::new(Rule::StarExpression).with(expr(number("1")))),
            ),
    );
    assert!(matches!(
        program_err(vec![line(vec![stmt])]),
        LowerError::Unsupported {
            rule: Rule::Assignment,
            ..
        }
    ));
}

#[test]
fn tuple_return_is_rejected() {
    let values = Node::new(Rule::StarExpressions)
        .with(Node::new(Rule::StarExpression).with(expr(number("1"))))
        .tok(TokenKind::Comma)
        .with(Node::new(Rule::StarExpression).with(expr(number("2"))));
    let stmt = Node::new(Rule::SimpleStmt).with(
        Node::new(Rule::ReturnStmt)
            .tok(TokenKind::Return)
            .with(values),
    );
    assert_eq!(
        program_err(vec![line(vec![stmt])]),
        LowerError::Unsupported {
            rule: Rule::StarExpressions,
            text: "1 , 2".into()
        }
    );
}

#[test]
fn unsupported_simple_statement() {
    let stmt = Node::new(Rule::SimpleStmt).with(Node::new(Rule::ImportStmt));
    assert!(matches!(
        program_err(vec![line(vec![stmt])]),
        LowerError::Unsupported {
            rule: Rule::SimpleStmt,
            ..
        }
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Compound statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn function_definition() {
    let block = program(vec![def(
        "add",
        &["a", "b"],
        vec![line(vec![return_stmt(Some(binary(
            Rule::Sum,
            name("a"),
            TokenKind::Plus,
            name("b"),
        )))])],
    )]);
    let expected = FuncDef {
        name: "add".into(),
        params: vec!["a".into(), "b".into()],
        body: Block::new(vec![Stmt::Return(Some(Expr::binary(
            BinaryOp::Add,
            id("a"),
            id("b"),
        )))]),
    };
    assert_eq!(block.stmts, vec![Stmt::FunctionDef(Rc::new(expected))]);
    assert_eq!(block.to_string(), "def add(a, b):\n\treturn a + b");
}

#[test]
fn function_with_no_params() {
    let block = program(vec![def("f", &[], vec![line(vec![pass()])])]);
    match &block.stmts[..] {
        [Stmt::FunctionDef(def)] => {
            assert_eq!(def.name, "f");
            assert!(def.params.is_empty());
            assert_eq!(def.body.stmts, vec![Stmt::Pass]);
        }
        other => panic!("expected a function definition, got {other:?}"),
    }
}

#[test]
fn decorated_function_is_rejected() {
    let stmt = Node::new(Rule::Statement).with(
        Node::new(Rule::CompoundStmt).with(
            Node::new(Rule::FunctionDef)
                .with(Node::new(Rule::Decorators))
                .with(Node::new(Rule::FunctionDefRaw)),
        ),
    );
    assert!(matches!(
        program_err(vec![stmt]),
        LowerError::Unsupported {
            rule: Rule::FunctionDef,
            ..
        }
    ));
}

#[test]
fn default_parameter_is_rejected() {
    let raw = Node::new(Rule::FunctionDefRaw)
        .tok(TokenKind::Def)
        .leaf(TokenKind::Name, "f")
        .with(
            Node::new(Rule::Params)
                .with(Node::new(Rule::Parameters).with(Node::new(Rule::ParamWithDefault))),
        )
        .with(block(vec![line(vec![pass()])]));
    let stmt = Node::new(Rule::Statement)
        .with(Node::new(Rule::CompoundStmt).with(Node::new(Rule::FunctionDef).with(raw)));
    assert!(matches!(
        program_err(vec![stmt]),
        LowerError::Unsupported {
            rule: Rule::Parameters,
            ..
        }
    ));
}

#[test]
fn class_definition_is_rejected() {
    let stmt = Node::new(Rule::Statement)
        .with(Node::new(Rule::CompoundStmt).with(Node::new(Rule::ClassDef)));
    assert!(matches!(
        program_err(vec![stmt]),
        LowerError::Unsupported {
            rule: Rule::CompoundStmt,
            ..
        }
    ));
}

#[test]
fn if_elif_else_chain() {
    let tree = if_stmt(
        name("a"),
        vec![line(vec![return_stmt(Some(number("1")))])],
        Some(elif(
            name("b"),
            vec![line(vec![return_stmt(Some(number("2")))])],
            Some(else_block(vec![line(vec![return_stmt(Some(number("3")))])])),
        )),
    );
    let block = program(vec![tree]);
    let expected = Stmt::If(IfStmt {
        condition: id("a"),
        body: Block::new(vec![Stmt::Return(Some(int(1)))]),
        orelse: Some(Block::new(vec![Stmt::If(IfStmt {
            condition: id("b"),
            body: Block::new(vec![Stmt::Return(Some(int(2)))]),
            orelse: Some(Block::new(vec![Stmt::Return(Some(int(3)))])),
        })])),
    });
    assert_eq!(block.stmts, vec![expected]);
    assert_eq!(
        block.to_string(),
        "if a:\n\treturn 1\nelse:\n\tif b:\n\t\treturn 2\n\telse:\n\t\treturn 3"
    );
}

#[test]
fn walrus_condition_is_rejected() {
    let condition = Node::new(Rule::NamedExpression).with(Node::new(Rule::AssignmentExpression));
    let tree = Node::new(Rule::Statement).with(
        Node::new(Rule::CompoundStmt).with(
            Node::new(Rule::IfStmt)
                .tok(TokenKind::If)
                .with(condition)
                .with(block(vec![line(vec![pass()])])),
        ),
    );
    assert!(matches!(
        program_err(vec![tree]),
        LowerError::Unsupported {
            rule: Rule::NamedExpression,
            ..
        }
    ));
}

#[test]
fn wrong_root_is_rejected() {
    let root = expr(number("1"));
    assert!(matches!(
        lower_file(&root),
        Err(LowerError::Unsupported {
            rule: Rule::Expression,
            ..
        })
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Rendering round trip
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn rendered_if_relowers_to_equal_tree() {
    // if (1 == 1): return 2
    let original = program(vec![if_stmt(
        group(comparison(number("1"), vec![(Rule::EqBitwiseOr, number("1"))])),
        vec![line(vec![return_stmt(Some(number("2")))])],
        None,
    )]);
    let text = original.to_string();
    assert_eq!(text, "if 1 == 1:\n\treturn 2");

    // The tree a parser builds for the rendered text has no group.
    let reparsed = program(vec![if_stmt(
        comparison(number("1"), vec![(Rule::EqBitwiseOr, number("1"))]),
        vec![line(vec![return_stmt(Some(number("2")))])],
        None,
    )]);
    assert_eq!(reparsed, original);
}

#[test]
fn rendering_keeps_needed_parentheses() {
    // (1 + 2) * 3
    let tree = binary(
        Rule::Term,
        group(binary(Rule::Sum, number("1"), TokenKind::Plus, number("2"))),
        TokenKind::Star,
        number("3"),
    );
    assert_eq!(lower(tree).to_string(), "(1 + 2) * 3");
}

#[test]
fn lowering_is_deterministic() {
    let tree = file(vec![def(
        "f",
        &["x"],
        vec![line(vec![return_stmt(Some(comparison(
            name("x"),
            vec![(Rule::LtBitwiseOr, number("10"))],
        )))])],
    )]);
    let first = lower_file(&tree).expect("lowering failed");
    for _ in 0..100 {
        assert_eq!(lower_file(&tree).expect("lowering failed"), first);
    }
    assert_eq!(tree.rule(), Rule::FileInput);
}
