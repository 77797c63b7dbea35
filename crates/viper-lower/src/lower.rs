//! Lowering: parse tree → AST.
//!
//! One method per grammar rule. Each method reads the children the rule is
//! expected to have and builds the matching AST node; any alternative the
//! subset does not cover fails with [`LowerError::Unsupported`] carrying the
//! offending node's text.

use crate::cst::{Rule, SyntaxNode, TokenKind};
use crate::error::{LowerError, LowerResult};
use std::rc::Rc;
use tracing::trace;
use viper_types::ast::*;

/// Lower a `file_input` tree into the program's top-level block.
pub fn lower_file<N: SyntaxNode>(root: &N) -> LowerResult<Block> {
    Lowerer::new().file_input(root)
}

/// Lower a single `expression` tree.
pub fn lower_expression<N: SyntaxNode>(node: &N) -> LowerResult<Expr> {
    Lowerer::new().expression(node)
}

/// Stateless visitor from [`SyntaxNode`] trees to AST nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lowerer;

fn unsupported<N: SyntaxNode>(node: &N) -> LowerError {
    LowerError::Unsupported {
        rule: node.rule(),
        text: node.text(),
    }
}

fn required<N: SyntaxNode>(node: &N, rule: Rule) -> LowerResult<&N> {
    node.child(rule, 0).ok_or(LowerError::MissingChild {
        rule: node.rule(),
        expected: rule.name(),
    })
}

fn required_token<N: SyntaxNode>(node: &N, kind: TokenKind) -> LowerResult<&str> {
    node.token(kind).ok_or(LowerError::MissingChild {
        rule: node.rule(),
        expected: kind.lexeme().unwrap_or("NAME"),
    })
}

/// Reject `node` unless it was built from `rule`.
fn expect_rule<N: SyntaxNode>(node: &N, rule: Rule) -> LowerResult<()> {
    if node.rule() == rule {
        Ok(())
    } else {
        Err(unsupported(node))
    }
}

impl Lowerer {
    pub fn new() -> Self {
        Self
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    pub fn file_input<N: SyntaxNode>(&self, node: &N) -> LowerResult<Block> {
        expect_rule(node, Rule::FileInput)?;
        match node.child(Rule::Statements, 0) {
            Some(statements) => self.statements(statements),
            None => Ok(Block::default()),
        }
    }

    fn statements<N: SyntaxNode>(&self, node: &N) -> LowerResult<Block> {
        let stmts = node
            .children(Rule::Statement)
            .map(|s| self.statement(s))
            .collect::<LowerResult<Vec<_>>>()?;
        Ok(Block::new(stmts))
    }

    fn statement<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        if let Some(simple) = node.child(Rule::SimpleStmts, 0) {
            self.simple_stmts(simple)
        } else if let Some(compound) = node.child(Rule::CompoundStmt, 0) {
            self.compound_stmt(compound)
        } else {
            Err(unsupported(node))
        }
    }

    /// A single statement on the line is returned as itself, not wrapped.
    fn simple_stmts<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        let mut stmts = node
            .children(Rule::SimpleStmt)
            .map(|s| self.simple_stmt(s))
            .collect::<LowerResult<Vec<_>>>()?;
        match stmts.len() {
            0 => Err(LowerError::MissingChild {
                rule: Rule::SimpleStmts,
                expected: Rule::SimpleStmt.name(),
            }),
            1 => Ok(stmts.remove(0)),
            _ => Ok(Stmt::Simple(stmts)),
        }
    }

    fn simple_stmt<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        trace!(text = %node.text(), "lower simple_stmt");
        if let Some(assign) = node.child(Rule::Assignment, 0) {
            self.assignment(assign)
        } else if let Some(ret) = node.child(Rule::ReturnStmt, 0) {
            self.return_stmt(ret)
        } else if let Some(assert) = node.child(Rule::AssertStmt, 0) {
            self.assert_stmt(assert)
        } else if let Some(exprs) = node.child(Rule::StarExpressions, 0) {
            Ok(Stmt::Expr(self.star_expressions(exprs)?))
        } else if node.has_token(TokenKind::Pass) {
            Ok(Stmt::Pass)
        } else {
            Err(unsupported(node))
        }
    }

    fn compound_stmt<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        trace!(text = %node.text(), "lower compound_stmt");
        if let Some(def) = node.child(Rule::FunctionDef, 0) {
            self.function_def(def)
        } else if let Some(if_stmt) = node.child(Rule::IfStmt, 0) {
            Ok(Stmt::If(self.if_stmt(if_stmt)?))
        } else {
            Err(unsupported(node))
        }
    }

    // ── Simple statements ────────────────────────────────────────────────

    fn assignment<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        if let Some(name) = node.token(TokenKind::Name) {
            // name: annotation [= value]
            let annotation = self.expression(required(node, Rule::Expression)?)?;
            let value = match node.child(Rule::AnnotatedRhs, 0) {
                Some(rhs) => Some(self.annotated_rhs(rhs)?),
                None => None,
            };
            return Ok(Stmt::Assign(AssignStmt {
                target: AssignTarget::new(name),
                annotation: Some(annotation),
                value,
            }));
        }

        // A single `target = value`; chained targets and yields are rejected.
        if node.child_count(Rule::StarTargets) != 1 || node.child(Rule::YieldExpr, 0).is_some() {
            return Err(unsupported(node));
        }
        let (Some(targets), Some(value)) = (
            node.child(Rule::StarTargets, 0),
            node.child(Rule::StarExpressions, 0),
        ) else {
            return Err(unsupported(node));
        };
        Ok(Stmt::Assign(AssignStmt {
            target: self.star_targets(targets)?,
            annotation: None,
            value: Some(self.star_expressions(value)?),
        }))
    }

    fn annotated_rhs<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        match node.child(Rule::StarExpressions, 0) {
            Some(exprs) => self.star_expressions(exprs),
            None => Err(unsupported(node)),
        }
    }

    fn return_stmt<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        let value = match node.child(Rule::StarExpressions, 0) {
            Some(exprs) => Some(self.star_expressions(exprs)?),
            None => None,
        };
        Ok(Stmt::Return(value))
    }

    fn assert_stmt<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        let exprs = node
            .children(Rule::Expression)
            .map(|e| self.expression(e))
            .collect::<LowerResult<Vec<_>>>()?;
        if exprs.is_empty() {
            return Err(LowerError::MissingChild {
                rule: Rule::AssertStmt,
                expected: Rule::Expression.name(),
            });
        }
        Ok(Stmt::Assert(exprs))
    }

    // ── Targets ──────────────────────────────────────────────────────────

    fn star_targets<N: SyntaxNode>(&self, node: &N) -> LowerResult<AssignTarget> {
        if node.child_count(Rule::StarTarget) != 1 || node.has_token(TokenKind::Comma) {
            return Err(unsupported(node));
        }
        self.star_target(required(node, Rule::StarTarget)?)
    }

    fn star_target<N: SyntaxNode>(&self, node: &N) -> LowerResult<AssignTarget> {
        match node.child(Rule::TargetWithStarAtom, 0) {
            Some(target) if !node.has_token(TokenKind::Star) => self.target_with_star_atom(target),
            _ => Err(unsupported(node)),
        }
    }

    fn target_with_star_atom<N: SyntaxNode>(&self, node: &N) -> LowerResult<AssignTarget> {
        match node.child(Rule::StarAtom, 0) {
            Some(atom) => self.star_atom(atom),
            None => Err(unsupported(node)),
        }
    }

    fn star_atom<N: SyntaxNode>(&self, node: &N) -> LowerResult<AssignTarget> {
        match node.token(TokenKind::Name) {
            Some(name) if !node.has_token(TokenKind::Lpar) && !node.has_token(TokenKind::Lsqb) => {
                Ok(AssignTarget::new(name))
            }
            _ => Err(unsupported(node)),
        }
    }

    // ── Compound statements ──────────────────────────────────────────────

    fn function_def<N: SyntaxNode>(&self, node: &N) -> LowerResult<Stmt> {
        if node.child(Rule::Decorators, 0).is_some() {
            return Err(unsupported(node));
        }
        let def = self.function_def_raw(required(node, Rule::FunctionDefRaw)?)?;
        Ok(Stmt::FunctionDef(Rc::new(def)))
    }

    /// Parameter and return annotations are not kept.
    fn function_def_raw<N: SyntaxNode>(&self, node: &N) -> LowerResult<FuncDef> {
        if node.has_token(TokenKind::Async) || node.child(Rule::TypeParams, 0).is_some() {
            return Err(unsupported(node));
        }
        let name = required_token(node, TokenKind::Name)?.to_string();
        let params = match node.child(Rule::Params, 0) {
            Some(params) => self.params(params)?,
            None => Vec::new(),
        };
        let body = self.block(required(node, Rule::Block)?)?;
        trace!(function = %name, params = params.len(), "lower function_def");
        Ok(FuncDef { name, params, body })
    }

    fn params<N: SyntaxNode>(&self, node: &N) -> LowerResult<Vec<String>> {
        self.parameters(required(node, Rule::Parameters)?)
    }

    /// Only plain positional parameters without defaults.
    fn parameters<N: SyntaxNode>(&self, node: &N) -> LowerResult<Vec<String>> {
        let rejected = [
            Rule::SlashNoDefault,
            Rule::SlashWithDefault,
            Rule::ParamWithDefault,
            Rule::StarEtc,
        ];
        if rejected.iter().any(|rule| node.child(*rule, 0).is_some()) {
            return Err(unsupported(node));
        }
        node.children(Rule::ParamNoDefault)
            .map(|p| self.param_no_default(p))
            .collect()
    }

    fn param_no_default<N: SyntaxNode>(&self, node: &N) -> LowerResult<String> {
        self.param(required(node, Rule::Param)?)
    }

    fn param<N: SyntaxNode>(&self, node: &N) -> LowerResult<String> {
        Ok(required_token(node, TokenKind::Name)?.to_string())
    }

    /// An indented block, or simple statements on the header's line.
    fn block<N: SyntaxNode>(&self, node: &N) -> LowerResult<Block> {
        if let Some(statements) = node.child(Rule::Statements, 0) {
            self.statements(statements)
        } else if let Some(simple) = node.child(Rule::SimpleStmts, 0) {
            Ok(Block::new(vec![self.simple_stmts(simple)?]))
        } else {
            Err(LowerError::MissingChild {
                rule: Rule::Block,
                expected: Rule::Statements.name(),
            })
        }
    }

    fn if_stmt<N: SyntaxNode>(&self, node: &N) -> LowerResult<IfStmt> {
        let condition = self.named_expression(required(node, Rule::NamedExpression)?)?;
        let body = self.block(required(node, Rule::Block)?)?;
        let orelse = if let Some(elif) = node.child(Rule::ElifStmt, 0) {
            // `elif` has the same shape as `if`.
            Some(Block::new(vec![Stmt::If(self.if_stmt(elif)?)]))
        } else if let Some(else_block) = node.child(Rule::ElseBlock, 0) {
            Some(self.block(required(else_block, Rule::Block)?)?)
        } else {
            None
        };
        Ok(IfStmt {
            condition,
            body,
            orelse,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn star_expressions<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        // More than one, or a trailing comma, would build a tuple.
        if node.child_count(Rule::StarExpression) != 1 || node.has_token(TokenKind::Comma) {
            return Err(unsupported(node));
        }
        self.star_expression(required(node, Rule::StarExpression)?)
    }

    fn star_expression<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        if let Some(expr) = node.child(Rule::Expression, 0) {
            self.expression(expr)
        } else if let Some(operand) = node.child(Rule::BitwiseOr, 0) {
            Ok(Expr::unary(UnaryOp::Star, self.bitwise_or(operand)?))
        } else {
            Err(unsupported(node))
        }
    }

    fn named_expression<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        match node.child(Rule::Expression, 0) {
            Some(expr) => self.expression(expr),
            None => Err(unsupported(node)),
        }
    }

    /// `disjunction [if disjunction else expression]`
    pub fn expression<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        expect_rule(node, Rule::Expression)?;
        if node.child(Rule::Lambdef, 0).is_some() {
            return Err(unsupported(node));
        }
        let body = self.disjunction(required(node, Rule::Disjunction)?)?;
        let Some(condition) = node.child(Rule::Disjunction, 1) else {
            return Ok(body);
        };
        let condition = self.disjunction(condition)?;
        let orelse = self.expression(required(node, Rule::Expression)?)?;
        Ok(Expr::ternary(body, condition, orelse))
    }

    fn disjunction<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        self.fold(node, Rule::Conjunction, BinaryOp::Or, Self::conjunction)
    }

    fn conjunction<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        self.fold(node, Rule::Inversion, BinaryOp::And, Self::inversion)
    }

    /// Lower every `rule` child and fold them left to right with `op`.
    fn fold<N: SyntaxNode>(
        &self,
        node: &N,
        rule: Rule,
        op: BinaryOp,
        lower: fn(&Self, &N) -> LowerResult<Expr>,
    ) -> LowerResult<Expr> {
        let mut operands = node.children(rule).map(|child| lower(self, child));
        let first = match operands.next() {
            Some(first) => first?,
            None => {
                return Err(LowerError::MissingChild {
                    rule: node.rule(),
                    expected: rule.name(),
                })
            }
        };
        operands.try_fold(first, |lhs, rhs: LowerResult<Expr>| -> LowerResult<Expr> {
            Ok(Expr::binary(op, lhs, rhs?))
        })
    }

    fn inversion<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        if let Some(inner) = node.child(Rule::Inversion, 0) {
            Ok(Expr::unary(UnaryOp::Not, self.inversion(inner)?))
        } else {
            self.comparison(required(node, Rule::Comparison)?)
        }
    }

    /// `a < b < c` becomes `(a < b) and (b < c)`: each link's left operand is
    /// a copy of the previous link's right operand.
    fn comparison<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let first = self.bitwise_or(required(node, Rule::BitwiseOr)?)?;
        if node.child(Rule::CompareOpBitwiseOrPair, 0).is_none() {
            return Ok(first);
        }

        let mut prev = first;
        let mut result: Option<Expr> = None;
        for pair in node.children(Rule::CompareOpBitwiseOrPair) {
            let (op, operand) = self.compare_pair(pair)?;
            let link = Expr::binary(op, prev, operand.clone());
            result = Some(match result {
                Some(acc) => Expr::binary(BinaryOp::And, acc, link),
                None => link,
            });
            prev = operand;
        }
        result.ok_or_else(|| unsupported(node))
    }

    fn compare_pair<N: SyntaxNode>(&self, node: &N) -> LowerResult<(BinaryOp, Expr)> {
        for rule in Rule::COMPARE_PAIRS {
            if let Some(pair) = node.child(rule, 0) {
                let op = match rule {
                    Rule::EqBitwiseOr => BinaryOp::Eq,
                    Rule::NoteqBitwiseOr => BinaryOp::NotEq,
                    Rule::LteBitwiseOr => BinaryOp::LtE,
                    Rule::LtBitwiseOr => BinaryOp::Lt,
                    Rule::GteBitwiseOr => BinaryOp::GtE,
                    Rule::GtBitwiseOr => BinaryOp::Gt,
                    Rule::NotinBitwiseOr => BinaryOp::NotIn,
                    Rule::InBitwiseOr => BinaryOp::In,
                    Rule::IsnotBitwiseOr => BinaryOp::IsNot,
                    _ => BinaryOp::Is,
                };
                let operand = self.bitwise_or(required(pair, Rule::BitwiseOr)?)?;
                return Ok((op, operand));
            }
        }
        Err(unsupported(node))
    }

    // ── Left-recursive precedence levels ─────────────────────────────────
    //
    // Each level is either a single operand of the next level down, or
    // `<same level> OP <next level>`.

    fn bitwise_or<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.bitwise_xor(required(node, Rule::BitwiseXor)?)?;
        match node.child(Rule::BitwiseOr, 0) {
            Some(lhs) => Ok(Expr::binary(BinaryOp::BitOr, self.bitwise_or(lhs)?, rhs)),
            None => Ok(rhs),
        }
    }

    fn bitwise_xor<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.bitwise_and(required(node, Rule::BitwiseAnd)?)?;
        match node.child(Rule::BitwiseXor, 0) {
            Some(lhs) => Ok(Expr::binary(BinaryOp::BitXor, self.bitwise_xor(lhs)?, rhs)),
            None => Ok(rhs),
        }
    }

    fn bitwise_and<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.shift_expr(required(node, Rule::ShiftExpr)?)?;
        match node.child(Rule::BitwiseAnd, 0) {
            Some(lhs) => Ok(Expr::binary(BinaryOp::BitAnd, self.bitwise_and(lhs)?, rhs)),
            None => Ok(rhs),
        }
    }

    fn shift_expr<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.sum(required(node, Rule::Sum)?)?;
        let Some(lhs) = node.child(Rule::ShiftExpr, 0) else {
            return Ok(rhs);
        };
        let op = if node.has_token(TokenKind::LeftShift) {
            BinaryOp::Shl
        } else {
            BinaryOp::Shr
        };
        Ok(Expr::binary(op, self.shift_expr(lhs)?, rhs))
    }

    fn sum<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.term(required(node, Rule::Term)?)?;
        let Some(lhs) = node.child(Rule::Sum, 0) else {
            return Ok(rhs);
        };
        let op = if node.has_token(TokenKind::Plus) {
            BinaryOp::Add
        } else {
            BinaryOp::Sub
        };
        Ok(Expr::binary(op, self.sum(lhs)?, rhs))
    }

    fn term<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let rhs = self.factor(required(node, Rule::Factor)?)?;
        let Some(lhs) = node.child(Rule::Term, 0) else {
            return Ok(rhs);
        };
        let op = if node.has_token(TokenKind::Star) {
            BinaryOp::Mul
        } else if node.has_token(TokenKind::Slash) {
            BinaryOp::Div
        } else if node.has_token(TokenKind::DoubleSlash) {
            BinaryOp::FloorDiv
        } else if node.has_token(TokenKind::Percent) {
            BinaryOp::Mod
        } else {
            BinaryOp::MatMul
        };
        Ok(Expr::binary(op, self.term(lhs)?, rhs))
    }

    // ── Unary, power, primaries ──────────────────────────────────────────

    fn factor<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        if let Some(power) = node.child(Rule::Power, 0) {
            return self.power(power);
        }
        let operand = self.factor(required(node, Rule::Factor)?)?;
        let op = if node.has_token(TokenKind::Plus) {
            UnaryOp::Pos
        } else if node.has_token(TokenKind::Minus) {
            UnaryOp::Neg
        } else {
            UnaryOp::BitNot
        };
        Ok(Expr::unary(op, operand))
    }

    fn power<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let base = self.await_primary(required(node, Rule::AwaitPrimary)?)?;
        match node.child(Rule::Factor, 0) {
            Some(exponent) => Ok(Expr::binary(BinaryOp::Pow, base, self.factor(exponent)?)),
            None => Ok(base),
        }
    }

    fn await_primary<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        if node.has_token(TokenKind::Await) {
            return Err(unsupported(node));
        }
        self.primary(required(node, Rule::Primary)?)
    }

    /// Atoms and calls. Attribute access, subscripts and generator-argument
    /// calls are rejected.
    fn primary<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        let Some(callee) = node.child(Rule::Primary, 0) else {
            return self.atom(required(node, Rule::Atom)?);
        };
        if !node.has_token(TokenKind::Lpar) || node.child(Rule::Genexp, 0).is_some() {
            return Err(unsupported(node));
        }
        let callee = self.primary(callee)?;
        let args = match node.child(Rule::Arguments, 0) {
            Some(arguments) => self.arguments(arguments)?,
            None => Vec::new(),
        };
        Ok(Expr::call(callee, args))
    }

    fn arguments<N: SyntaxNode>(&self, node: &N) -> LowerResult<Vec<Expr>> {
        self.args(required(node, Rule::Args)?)
    }

    /// Positional arguments only.
    fn args<N: SyntaxNode>(&self, node: &N) -> LowerResult<Vec<Expr>> {
        let rejected = [
            Rule::Kwargs,
            Rule::StarredExpression,
            Rule::AssignmentExpression,
        ];
        if rejected.iter().any(|rule| node.child(*rule, 0).is_some()) {
            return Err(unsupported(node));
        }
        node.children(Rule::Expression)
            .map(|e| self.expression(e))
            .collect()
    }

    fn atom<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        if let Some(name) = node.token(TokenKind::Name) {
            Ok(Expr::ident(name))
        } else if let Some(number) = node.token(TokenKind::Number) {
            parse_int(number).map(Expr::Int)
        } else if node.has_token(TokenKind::True) {
            Ok(Expr::Bool(true))
        } else if node.has_token(TokenKind::False) {
            Ok(Expr::Bool(false))
        } else if node.has_token(TokenKind::None) {
            Ok(Expr::None)
        } else if let Some(group) = node.child(Rule::Group, 0) {
            self.group(group)
        } else {
            Err(unsupported(node))
        }
    }

    /// `( named_expression )`; parentheses leave no trace in the AST.
    fn group<N: SyntaxNode>(&self, node: &N) -> LowerResult<Expr> {
        match node.child(Rule::NamedExpression, 0) {
            Some(inner) => self.named_expression(inner),
            None => Err(unsupported(node)),
        }
    }
}

/// Parse a decimal integer literal. Single underscores may separate digits;
/// leading zeros are only allowed in `0`, `00`, ...
fn parse_int(text: &str) -> LowerResult<i64> {
    let invalid = || LowerError::InvalidLiteral {
        text: text.to_string(),
    };
    let well_formed = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit() || b == b'_')
        && !text.starts_with('_')
        && !text.ends_with('_')
        && !text.contains("__");
    if !well_formed {
        return Err(invalid());
    }
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        return Err(invalid());
    }
    digits.parse::<i64>().map_err(|_| invalid())
}
