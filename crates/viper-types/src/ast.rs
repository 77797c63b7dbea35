//! AST node types for the Viper subset.
//!
//! Nodes are built once by the lowering pass and never mutated afterwards.
//! Function definitions sit behind an [`Rc`] so a runtime function value can
//! share the definition with the tree that declared it.
//!
//! Every node renders back to valid subset source through [`fmt::Display`].
//! Operands are parenthesised only where the surrounding operator binds
//! tighter, so lowering the rendered text again yields an equal tree.

use std::fmt;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Blocks & Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement list: the top level of a source unit or the body of a
/// compound statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = value` or `name: annotation [= value]`
    Assign(AssignStmt),
    /// `assert a, b, ...`
    Assert(Vec<Expr>),
    /// `if cond: body [else: orelse]`
    If(IfStmt),
    /// `return [value]`
    Return(Option<Expr>),
    /// `def name(params): body`
    FunctionDef(Rc<FuncDef>),
    /// Several simple statements on one line, separated by `;`.
    Simple(Vec<Stmt>),
    /// A bare expression whose value is discarded.
    Expr(Expr),
    /// `pass`
    Pass,
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: AssignTarget,
    /// Only rendered; annotations are not evaluated.
    pub annotation: Option<Expr>,
    /// `None` for a bare annotation such as `x: int`.
    pub value: Option<Expr>,
}

/// The single name an assignment binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignTarget {
    pub name: String,
}

impl AssignTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// `if condition: body [else: orelse]`
///
/// `elif` chains are represented as an `orelse` block holding a single
/// nested `If`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub body: Block,
    pub orelse: Option<Block>,
}

/// `def name(params): body`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // ── Literals ──
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// `42`
    ///
    /// Lowering never produces a negative payload; `-1` in source is
    /// `Unary { Neg, Int(1) }`. A host-built negative literal renders as
    /// that negation, so it does not re-lower to the same node.
    Int(i64),

    /// `my_var`
    Identifier(String),

    // ── Operators ──
    /// `not x`, `-x`, `*x`, ...
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `a + b`, `a == b`, `a and b`, ...
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `body if condition else orelse`
    Ternary {
        body: Box<Expr>,
        condition: Box<Expr>,
        orelse: Box<Expr>,
    },

    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn ternary(body: Expr, condition: Expr, orelse: Expr) -> Self {
        Expr::Ternary {
            body: Box::new(body),
            condition: Box::new(condition),
            orelse: Box::new(orelse),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Binding strength used when rendering; larger binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Ternary { .. } => 0,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { op, .. } => op.precedence(),
            Expr::Int(v) if *v < 0 => UnaryOp::Neg.precedence(),
            Expr::None
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Identifier(_)
            | Expr::Call { .. } => ATOM,
        }
    }
}

const ATOM: u8 = 13;

/// Binary operators, one per source operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Boolean
    Or,
    And,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
    // Bitwise
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    MatMul,
    Pow,
}

impl BinaryOp {
    /// Returns the operator as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtE => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtE => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "is not",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::MatMul => "@",
            BinaryOp::Pow => "**",
        }
    }

    /// True for the ten operators that may appear in a comparison chain.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtE
                | BinaryOp::Gt
                | BinaryOp::GtE
                | BinaryOp::In
                | BinaryOp::NotIn
                | BinaryOp::Is
                | BinaryOp::IsNot
        )
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            op if op.is_comparison() => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Pow => 12,
            _ => 10,
        }
    }

    /// Minimum precedence each operand needs to render without parentheses.
    fn operand_precedence(&self) -> (u8, u8) {
        let p = self.precedence();
        match self {
            // `a < b < c` is a chain, not a nested comparison.
            op if op.is_comparison() => (p + 1, p + 1),
            // `await_primary '**' factor`
            BinaryOp::Pow => (ATOM, UnaryOp::Neg.precedence()),
            _ => (p, p + 1),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `not x`
    Not,
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `~x`
    BitNot,
    /// `*x`, the unpacking marker
    Star,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not ",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Star => "*",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            UnaryOp::Star => 0,
            UnaryOp::Not => 3,
            UnaryOp::Neg | UnaryOp::Pos | UnaryOp::BitNot => 11,
        }
    }

    fn operand_precedence(&self) -> u8 {
        match self {
            UnaryOp::Star => BinaryOp::BitOr.precedence(),
            op => op.precedence(),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Rendering
// ══════════════════════════════════════════════════════════════════════════════

struct Operand<'a>(&'a Expr, u8);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Operand(expr, min) = *self;
        if expr.precedence() < min {
            write!(f, "({expr})")
        } else {
            write!(f, "{expr}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::None => f.write_str("None"),
            Expr::Bool(true) => f.write_str("True"),
            Expr::Bool(false) => f.write_str("False"),
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Identifier(name) => f.write_str(name),
            Expr::Unary { op, operand } => {
                write!(f, "{op}{}", Operand(operand, op.operand_precedence()))
            }
            Expr::Binary { op, lhs, rhs } => {
                let (left, right) = op.operand_precedence();
                write!(f, "{} {op} {}", Operand(lhs, left), Operand(rhs, right))
            }
            Expr::Ternary {
                body,
                condition,
                orelse,
            } => write!(
                f,
                "{} if {} else {}",
                Operand(body, 1),
                Operand(condition, 1),
                orelse
            ),
            Expr::Call { callee, args } => {
                write!(f, "{}(", Operand(callee, ATOM))?;
                write_joined(f, args, ", ")?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign(assign) => {
                f.write_str(&assign.target.name)?;
                if let Some(annotation) = &assign.annotation {
                    write!(f, ": {annotation}")?;
                }
                if let Some(value) = &assign.value {
                    write!(f, " = {value}")?;
                }
                Ok(())
            }
            Stmt::Assert(exprs) => {
                f.write_str("assert ")?;
                write_joined(f, exprs, ", ")
            }
            Stmt::If(if_stmt) => write!(f, "{if_stmt}"),
            Stmt::Return(None) => f.write_str("return"),
            Stmt::Return(Some(value)) => write!(f, "return {value}"),
            Stmt::FunctionDef(def) => write!(f, "{def}"),
            Stmt::Simple(stmts) => write_joined(f, stmts, "; "),
            Stmt::Expr(expr) => write!(f, "{expr}"),
            Stmt::Pass => f.write_str("pass"),
        }
    }
}

impl fmt::Display for IfStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {}:\n{}", self.condition, Indented(&self.body))?;
        if let Some(orelse) = &self.orelse {
            write!(f, "\nelse:\n{}", Indented(orelse))?;
        }
        Ok(())
    }
}

impl fmt::Display for FuncDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "def {}({}):\n{}",
            self.name,
            self.params.join(", "),
            Indented(&self.body)
        )
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.stmts, "\n")
    }
}

/// A block rendered one tab deeper than its header.
struct Indented<'a>(&'a Block);

impl fmt::Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("\tpass");
        }
        let text = self.0.to_string();
        let lines: Vec<String> = text.lines().map(|line| format!("\t{line}")).collect();
        f.write_str(&lines.join("\n"))
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
