//! The concrete-syntax-tree contract consumed by the lowering pass.
//!
//! Lowering never sees source text. It reads an already-validated parse tree
//! through [`SyntaxNode`]: children are addressed by grammar rule and
//! position, leaves by token kind.

use std::fmt;

/// Grammar productions a parse tree may contain.
///
/// Covers every production the subset lowers, plus the alternatives that sit
/// next to them in the grammar and must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    // ── Statements ──
    FileInput,
    Statements,
    Statement,
    SimpleStmts,
    SimpleStmt,
    CompoundStmt,
    Assignment,
    AnnotatedRhs,
    ReturnStmt,
    AssertStmt,
    Block,
    IfStmt,
    ElifStmt,
    ElseBlock,
    FunctionDef,
    FunctionDefRaw,
    Decorators,
    TypeParams,
    Params,
    Parameters,
    ParamNoDefault,
    ParamWithDefault,
    SlashNoDefault,
    SlashWithDefault,
    StarEtc,
    Param,
    Annotation,
    // Rejected statement forms
    ImportStmt,
    RaiseStmt,
    DelStmt,
    YieldStmt,
    GlobalStmt,
    NonlocalStmt,
    ClassDef,
    ForStmt,
    WhileStmt,
    WithStmt,
    TryStmt,
    MatchStmt,
    Augassign,
    SingleTarget,
    SingleSubscriptAttributeTarget,

    // ── Targets ──
    StarTargets,
    StarTarget,
    TargetWithStarAtom,
    StarAtom,
    TPrimary,

    // ── Expressions ──
    StarExpressions,
    StarExpression,
    NamedExpression,
    AssignmentExpression,
    Expression,
    Lambdef,
    YieldExpr,
    Disjunction,
    Conjunction,
    Inversion,
    Comparison,
    CompareOpBitwiseOrPair,
    EqBitwiseOr,
    NoteqBitwiseOr,
    LteBitwiseOr,
    LtBitwiseOr,
    GteBitwiseOr,
    GtBitwiseOr,
    NotinBitwiseOr,
    InBitwiseOr,
    IsnotBitwiseOr,
    IsBitwiseOr,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    ShiftExpr,
    Sum,
    Term,
    Factor,
    Power,
    AwaitPrimary,
    Primary,
    Slices,
    Arguments,
    Args,
    Kwargs,
    StarredExpression,
    Genexp,
    Atom,
    Group,
    // Rejected atoms
    Strings,
    Tuple,
    List,
    Listcomp,
    Dict,
    Set,
    Dictcomp,
    Setcomp,
}

impl Rule {
    /// The production's name as the grammar spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::FileInput => "file_input",
            Rule::Statements => "statements",
            Rule::Statement => "statement",
            Rule::SimpleStmts => "simple_stmts",
            Rule::SimpleStmt => "simple_stmt",
            Rule::CompoundStmt => "compound_stmt",
            Rule::Assignment => "assignment",
            Rule::AnnotatedRhs => "annotated_rhs",
            Rule::ReturnStmt => "return_stmt",
            Rule::AssertStmt => "assert_stmt",
            Rule::Block => "block",
            Rule::IfStmt => "if_stmt",
            Rule::ElifStmt => "elif_stmt",
            Rule::ElseBlock => "else_block",
            Rule::FunctionDef => "function_def",
            Rule::FunctionDefRaw => "function_def_raw",
            Rule::Decorators => "decorators",
            Rule::TypeParams => "type_params",
            Rule::Params => "params",
            Rule::Parameters => "parameters",
            Rule::ParamNoDefault => "param_no_default",
            Rule::ParamWithDefault => "param_with_default",
            Rule::SlashNoDefault => "slash_no_default",
            Rule::SlashWithDefault => "slash_with_default",
            Rule::StarEtc => "star_etc",
            Rule::Param => "param",
            Rule::Annotation => "annotation",
            Rule::ImportStmt => "import_stmt",
            Rule::RaiseStmt => "raise_stmt",
            Rule::DelStmt => "del_stmt",
            Rule::YieldStmt => "yield_stmt",
            Rule::GlobalStmt => "global_stmt",
            Rule::NonlocalStmt => "nonlocal_stmt",
            Rule::ClassDef => "class_def",
            Rule::ForStmt => "for_stmt",
            Rule::WhileStmt => "while_stmt",
            Rule::WithStmt => "with_stmt",
            Rule::TryStmt => "try_stmt",
            Rule::MatchStmt => "match_stmt",
            Rule::Augassign => "augassign",
            Rule::SingleTarget => "single_target",
            Rule::SingleSubscriptAttributeTarget => "single_subscript_attribute_target",
            Rule::StarTargets => "star_targets",
            Rule::StarTarget => "star_target",
            Rule::TargetWithStarAtom => "target_with_star_atom",
            Rule::StarAtom => "star_atom",
            Rule::TPrimary => "t_primary",
            Rule::StarExpressions => "star_expressions",
            Rule::StarExpression => "star_expression",
            Rule::NamedExpression => "named_expression",
            Rule::AssignmentExpression => "assignment_expression",
            Rule::Expression => "expression",
            Rule::Lambdef => "lambdef",
            Rule::YieldExpr => "yield_expr",
            Rule::Disjunction => "disjunction",
            Rule::Conjunction => "conjunction",
            Rule::Inversion => "inversion",
            Rule::Comparison => "comparison",
            Rule::CompareOpBitwiseOrPair => "compare_op_bitwise_or_pair",
            Rule::EqBitwiseOr => "eq_bitwise_or",
            Rule::NoteqBitwiseOr => "noteq_bitwise_or",
            Rule::LteBitwiseOr => "lte_bitwise_or",
            Rule::LtBitwiseOr => "lt_bitwise_or",
            Rule::GteBitwiseOr => "gte_bitwise_or",
            Rule::GtBitwiseOr => "gt_bitwise_or",
            Rule::NotinBitwiseOr => "notin_bitwise_or",
            Rule::InBitwiseOr => "in_bitwise_or",
            Rule::IsnotBitwiseOr => "isnot_bitwise_or",
            Rule::IsBitwiseOr => "is_bitwise_or",
            Rule::BitwiseOr => "bitwise_or",
            Rule::BitwiseXor => "bitwise_xor",
            Rule::BitwiseAnd => "bitwise_and",
            Rule::ShiftExpr => "shift_expr",
            Rule::Sum => "sum",
            Rule::Term => "term",
            Rule::Factor => "factor",
            Rule::Power => "power",
            Rule::AwaitPrimary => "await_primary",
            Rule::Primary => "primary",
            Rule::Slices => "slices",
            Rule::Arguments => "arguments",
            Rule::Args => "args",
            Rule::Kwargs => "kwargs",
            Rule::StarredExpression => "starred_expression",
            Rule::Genexp => "genexp",
            Rule::Atom => "atom",
            Rule::Group => "group",
            Rule::Strings => "strings",
            Rule::Tuple => "tuple",
            Rule::List => "list",
            Rule::Listcomp => "listcomp",
            Rule::Dict => "dict",
            Rule::Set => "set",
            Rule::Dictcomp => "dictcomp",
            Rule::Setcomp => "setcomp",
        }
    }

    /// The ten `compare_op_bitwise_or_pair` alternatives.
    pub const COMPARE_PAIRS: [Rule; 10] = [
        Rule::EqBitwiseOr,
        Rule::NoteqBitwiseOr,
        Rule::LteBitwiseOr,
        Rule::LtBitwiseOr,
        Rule::GteBitwiseOr,
        Rule::GtBitwiseOr,
        Rule::NotinBitwiseOr,
        Rule::InBitwiseOr,
        Rule::IsnotBitwiseOr,
        Rule::IsBitwiseOr,
    ];
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Leaf token kinds the lowering pass inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Number,
    True,
    False,
    None,
    // Keywords
    Not,
    And,
    Or,
    If,
    Elif,
    Else,
    Def,
    Return,
    Assert,
    Pass,
    In,
    Is,
    Await,
    Async,
    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    Tilde,
    LeftShift,
    RightShift,
    VBar,
    Circumflex,
    Amper,
    EqEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // Punctuation
    Lpar,
    Rpar,
    Lsqb,
    Rsqb,
    Dot,
    Comma,
    Colon,
    Semi,
    Equal,
    Rarrow,
    Newline,
    Indent,
    Dedent,
}

impl TokenKind {
    /// The fixed spelling of the token, or `None` for `Name` and `Number`
    /// whose text varies.
    pub fn lexeme(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::Name | TokenKind::Number => return None,
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::Not => "not",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::Def => "def",
            TokenKind::Return => "return",
            TokenKind::Assert => "assert",
            TokenKind::Pass => "pass",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Await => "await",
            TokenKind::Async => "async",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::At => "@",
            TokenKind::Tilde => "~",
            TokenKind::LeftShift => "<<",
            TokenKind::RightShift => ">>",
            TokenKind::VBar => "|",
            TokenKind::Circumflex => "^",
            TokenKind::Amper => "&",
            TokenKind::EqEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Lpar => "(",
            TokenKind::Rpar => ")",
            TokenKind::Lsqb => "[",
            TokenKind::Rsqb => "]",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semi => ";",
            TokenKind::Equal => "=",
            TokenKind::Rarrow => "->",
            TokenKind::Newline => "\n",
            TokenKind::Indent | TokenKind::Dedent => "",
        };
        Some(s)
    }
}

/// Read-only view of one parse-tree node.
///
/// Implement this for your parser's node type to feed it to
/// [`crate::Lowerer`]. [`crate::tree::Node`] is a ready-made owned
/// implementation.
pub trait SyntaxNode {
    /// The production this node was built from.
    fn rule(&self) -> Rule;

    /// The `index`-th direct child built from `rule`, if any.
    fn child(&self, rule: Rule, index: usize) -> Option<&Self>;

    /// Number of direct children built from `rule`.
    fn child_count(&self, rule: Rule) -> usize;

    /// Text of the first direct leaf of the given kind.
    fn token(&self, kind: TokenKind) -> Option<&str>;

    fn has_token(&self, kind: TokenKind) -> bool {
        self.token(kind).is_some()
    }

    /// Source text covered by the node, for diagnostics only.
    fn text(&self) -> String;

    /// Iterate the direct children built from `rule`, in order.
    fn children(&self, rule: Rule) -> Children<'_, Self>
    where
        Self: Sized,
    {
        Children {
            node: self,
            rule,
            index: 0,
        }
    }
}

/// Iterator returned by [`SyntaxNode::children`].
pub struct Children<'a, N> {
    node: &'a N,
    rule: Rule,
    index: usize,
}

impl<'a, N: SyntaxNode> Iterator for Children<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<&'a N> {
        let child = self.node.child(self.rule, self.index)?;
        self.index += 1;
        Some(child)
    }
}
