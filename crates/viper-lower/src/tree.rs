//! Owned parse-tree nodes.
//!
//! [`Node`] implements [`SyntaxNode`] for hosts that do not bring their own
//! parse tree. The builders in [`build`] produce the nested shape a
//! PEG-style Python parser emits, so a test can write `build::number("1")`
//! and `build::lift` it to whatever production the context expects.

use crate::cst::{Rule, SyntaxNode, TokenKind};

/// One element of a node: a child node or a leaf token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Node(Node),
    Token(TokenKind, String),
}

/// An owned parse-tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    rule: Rule,
    items: Vec<Item>,
}

impl Node {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            items: Vec::new(),
        }
    }

    /// Append a child node.
    pub fn with(mut self, child: Node) -> Self {
        self.items.push(Item::Node(child));
        self
    }

    /// Append a fixed-spelling token such as `(` or `def`.
    pub fn tok(self, kind: TokenKind) -> Self {
        let text = kind.lexeme().unwrap_or_default();
        self.leaf(kind, text)
    }

    /// Append a token with explicit text.
    pub fn leaf(mut self, kind: TokenKind, text: impl Into<String>) -> Self {
        self.items.push(Item::Token(kind, text.into()));
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    fn nodes(&self, rule: Rule) -> impl Iterator<Item = &Node> {
        self.items.iter().filter_map(move |item| match item {
            Item::Node(node) if node.rule == rule => Some(node),
            _ => None,
        })
    }
}

impl SyntaxNode for Node {
    fn rule(&self) -> Rule {
        self.rule
    }

    fn child(&self, rule: Rule, index: usize) -> Option<&Node> {
        self.nodes(rule).nth(index)
    }

    fn child_count(&self, rule: Rule) -> usize {
        self.nodes(rule).count()
    }

    fn token(&self, kind: TokenKind) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            Item::Token(k, text) if *k == kind => Some(text.as_str()),
            _ => None,
        })
    }

    fn text(&self) -> String {
        let mut parts = Vec::new();
        for item in &self.items {
            match item {
                Item::Node(node) => parts.push(node.text()),
                Item::Token(_, text) => parts.push(text.clone()),
            }
        }
        parts.retain(|p| !p.trim().is_empty());
        parts.join(" ")
    }
}

/// Builders for the common tree shapes.
pub mod build {
    use super::Node;
    use crate::cst::{Rule, TokenKind};

    /// The single-child chain from `atom` up to `expression`, innermost first.
    pub const EXPRESSION_CHAIN: [Rule; 16] = [
        Rule::Atom,
        Rule::Primary,
        Rule::AwaitPrimary,
        Rule::Power,
        Rule::Factor,
        Rule::Term,
        Rule::Sum,
        Rule::ShiftExpr,
        Rule::BitwiseAnd,
        Rule::BitwiseXor,
        Rule::BitwiseOr,
        Rule::Comparison,
        Rule::Inversion,
        Rule::Conjunction,
        Rule::Disjunction,
        Rule::Expression,
    ];

    fn level(rule: Rule) -> Option<usize> {
        EXPRESSION_CHAIN.iter().position(|r| *r == rule)
    }

    /// Wrap `node` in single-child parents until it is a `target` node.
    ///
    /// Nodes outside the expression chain, or already at or above `target`,
    /// are returned unchanged.
    pub fn lift(node: Node, target: Rule) -> Node {
        let (Some(from), Some(to)) = (level(node.rule), level(target)) else {
            return node;
        };
        EXPRESSION_CHAIN[from + 1..=to.max(from)]
            .iter()
            .fold(node, |inner, rule| Node::new(*rule).with(inner))
    }

    /// Lift `node` all the way to `expression`.
    pub fn expr(node: Node) -> Node {
        lift(node, Rule::Expression)
    }

    // ── Atoms ───────────────────────────────────────────────────────────

    pub fn name(name: &str) -> Node {
        Node::new(Rule::Atom).leaf(TokenKind::Name, name)
    }

    pub fn number(text: &str) -> Node {
        Node::new(Rule::Atom).leaf(TokenKind::Number, text)
    }

    /// `True`, `False` or `None`.
    pub fn keyword(kind: TokenKind) -> Node {
        Node::new(Rule::Atom).tok(kind)
    }

    /// `( inner )`
    pub fn group(inner: Node) -> Node {
        Node::new(Rule::Atom).with(
            Node::new(Rule::Group)
                .tok(TokenKind::Lpar)
                .with(named(inner))
                .tok(TokenKind::Rpar),
        )
    }

    fn named(node: Node) -> Node {
        Node::new(Rule::NamedExpression).with(expr(node))
    }

    // ── Operators ───────────────────────────────────────────────────────

    /// The operand rule one level below a left-recursive binary level.
    fn right_operand(level: Rule) -> Rule {
        match level {
            Rule::BitwiseOr => Rule::BitwiseXor,
            Rule::BitwiseXor => Rule::BitwiseAnd,
            Rule::BitwiseAnd => Rule::ShiftExpr,
            Rule::ShiftExpr => Rule::Sum,
            Rule::Sum => Rule::Term,
            _ => Rule::Factor,
        }
    }

    /// `lhs op rhs` at one of the left-recursive levels, `bitwise_or`
    /// through `term`.
    pub fn binary(level: Rule, lhs: Node, op: TokenKind, rhs: Node) -> Node {
        Node::new(level)
            .with(lift(lhs, level))
            .tok(op)
            .with(lift(rhs, right_operand(level)))
    }

    /// `base ** exponent`
    pub fn power(base: Node, exponent: Node) -> Node {
        Node::new(Rule::Power)
            .with(lift(base, Rule::AwaitPrimary))
            .tok(TokenKind::DoubleStar)
            .with(lift(exponent, Rule::Factor))
    }

    /// Unary `+`, `-` or `~`.
    pub fn unary(op: TokenKind, operand: Node) -> Node {
        Node::new(Rule::Factor).tok(op).with(lift(operand, Rule::Factor))
    }

    /// `not operand`
    pub fn not(operand: Node) -> Node {
        Node::new(Rule::Inversion)
            .tok(TokenKind::Not)
            .with(lift(operand, Rule::Inversion))
    }

    /// `first op1 x op2 y ...`; each pair names its `*_bitwise_or` rule.
    pub fn comparison(first: Node, pairs: Vec<(Rule, Node)>) -> Node {
        let mut node = Node::new(Rule::Comparison).with(lift(first, Rule::BitwiseOr));
        for (pair, operand) in pairs {
            let mut inner = Node::new(pair);
            for kind in compare_tokens(pair) {
                inner = inner.tok(*kind);
            }
            inner = inner.with(lift(operand, Rule::BitwiseOr));
            node = node.with(Node::new(Rule::CompareOpBitwiseOrPair).with(inner));
        }
        node
    }

    fn compare_tokens(pair: Rule) -> &'static [TokenKind] {
        match pair {
            Rule::EqBitwiseOr => &[TokenKind::EqEqual],
            Rule::NoteqBitwiseOr => &[TokenKind::NotEqual],
            Rule::LteBitwiseOr => &[TokenKind::LessEqual],
            Rule::LtBitwiseOr => &[TokenKind::Less],
            Rule::GteBitwiseOr => &[TokenKind::GreaterEqual],
            Rule::GtBitwiseOr => &[TokenKind::Greater],
            Rule::NotinBitwiseOr => &[TokenKind::Not, TokenKind::In],
            Rule::InBitwiseOr => &[TokenKind::In],
            Rule::IsnotBitwiseOr => &[TokenKind::Is, TokenKind::Not],
            _ => &[TokenKind::Is],
        }
    }

    /// `a and b and ...`
    pub fn conjunction(operands: Vec<Node>) -> Node {
        joined(Rule::Conjunction, Rule::Inversion, TokenKind::And, operands)
    }

    /// `a or b or ...`
    pub fn disjunction(operands: Vec<Node>) -> Node {
        joined(Rule::Disjunction, Rule::Conjunction, TokenKind::Or, operands)
    }

    fn joined(rule: Rule, operand: Rule, sep: TokenKind, operands: Vec<Node>) -> Node {
        let mut node = Node::new(rule);
        for (i, op) in operands.into_iter().enumerate() {
            if i > 0 {
                node = node.tok(sep);
            }
            node = node.with(lift(op, operand));
        }
        node
    }

    /// `body if condition else orelse`
    pub fn ternary(body: Node, condition: Node, orelse: Node) -> Node {
        Node::new(Rule::Expression)
            .with(lift(body, Rule::Disjunction))
            .tok(TokenKind::If)
            .with(lift(condition, Rule::Disjunction))
            .tok(TokenKind::Else)
            .with(expr(orelse))
    }

    /// `callee(args...)`
    pub fn call(callee: Node, args: Vec<Node>) -> Node {
        let mut node = Node::new(Rule::Primary)
            .with(lift(callee, Rule::Primary))
            .tok(TokenKind::Lpar);
        if !args.is_empty() {
            let mut list = Node::new(Rule::Args);
            for (i, arg) in args.into_iter().enumerate() {
                if i > 0 {
                    list = list.tok(TokenKind::Comma);
                }
                list = list.with(expr(arg));
            }
            node = node.with(Node::new(Rule::Arguments).with(list));
        }
        node.tok(TokenKind::Rpar)
    }

    fn star_expressions(value: Node) -> Node {
        Node::new(Rule::StarExpressions).with(Node::new(Rule::StarExpression).with(expr(value)))
    }

    // ── Simple statements ───────────────────────────────────────────────
    //
    // Each returns a `simple_stmt`; combine them into a line with `line`.

    /// `name = value`
    pub fn assign(name: &str, value: Node) -> Node {
        let target = Node::new(Rule::StarTargets).with(
            Node::new(Rule::StarTarget).with(
                Node::new(Rule::TargetWithStarAtom)
                    .with(Node::new(Rule::StarAtom).leaf(TokenKind::Name, name)),
            ),
        );
        Node::new(Rule::SimpleStmt).with(
            Node::new(Rule::Assignment)
                .with(target)
                .tok(TokenKind::Equal)
                .with(star_expressions(value)),
        )
    }

    /// `name: annotation [= value]`
    pub fn annotated(name: &str, annotation: Node, value: Option<Node>) -> Node {
        let mut node = Node::new(Rule::Assignment)
            .leaf(TokenKind::Name, name)
            .tok(TokenKind::Colon)
            .with(expr(annotation));
        if let Some(value) = value {
            node = node
                .tok(TokenKind::Equal)
                .with(Node::new(Rule::AnnotatedRhs).with(star_expressions(value)));
        }
        Node::new(Rule::SimpleStmt).with(node)
    }

    /// `return [value]`
    pub fn return_stmt(value: Option<Node>) -> Node {
        let mut node = Node::new(Rule::ReturnStmt).tok(TokenKind::Return);
        if let Some(value) = value {
            node = node.with(star_expressions(value));
        }
        Node::new(Rule::SimpleStmt).with(node)
    }

    /// `assert a[, b]`
    pub fn assert_stmt(exprs: Vec<Node>) -> Node {
        let mut node = Node::new(Rule::AssertStmt).tok(TokenKind::Assert);
        for (i, e) in exprs.into_iter().enumerate() {
            if i > 0 {
                node = node.tok(TokenKind::Comma);
            }
            node = node.with(expr(e));
        }
        Node::new(Rule::SimpleStmt).with(node)
    }

    pub fn pass() -> Node {
        Node::new(Rule::SimpleStmt).tok(TokenKind::Pass)
    }

    /// An expression used as a statement.
    pub fn expr_stmt(value: Node) -> Node {
        Node::new(Rule::SimpleStmt).with(star_expressions(value))
    }

    /// One or more `simple_stmt`s on a line, as a `statement`.
    pub fn line(stmts: Vec<Node>) -> Node {
        let mut node = Node::new(Rule::SimpleStmts);
        for (i, s) in stmts.into_iter().enumerate() {
            if i > 0 {
                node = node.tok(TokenKind::Semi);
            }
            node = node.with(s);
        }
        Node::new(Rule::Statement).with(node.tok(TokenKind::Newline))
    }

    // ── Compound statements ─────────────────────────────────────────────
    //
    // Bodies are lists of `statement` nodes.

    fn statements(stmts: Vec<Node>) -> Node {
        stmts
            .into_iter()
            .fold(Node::new(Rule::Statements), |node, s| node.with(s))
    }

    /// An indented `block`.
    pub fn block(stmts: Vec<Node>) -> Node {
        Node::new(Rule::Block)
            .tok(TokenKind::Newline)
            .tok(TokenKind::Indent)
            .with(statements(stmts))
            .tok(TokenKind::Dedent)
    }

    /// `if condition: body` followed by an optional `elif` or `else` tail.
    pub fn if_stmt(condition: Node, body: Vec<Node>, tail: Option<Node>) -> Node {
        let node = conditional(Rule::IfStmt, TokenKind::If, condition, body, tail);
        Node::new(Rule::Statement).with(Node::new(Rule::CompoundStmt).with(node))
    }

    /// An `elif` tail for [`if_stmt`] or another `elif`.
    pub fn elif(condition: Node, body: Vec<Node>, tail: Option<Node>) -> Node {
        conditional(Rule::ElifStmt, TokenKind::Elif, condition, body, tail)
    }

    /// An `else` tail.
    pub fn else_block(body: Vec<Node>) -> Node {
        Node::new(Rule::ElseBlock)
            .tok(TokenKind::Else)
            .tok(TokenKind::Colon)
            .with(block(body))
    }

    fn conditional(
        rule: Rule,
        keyword: TokenKind,
        condition: Node,
        body: Vec<Node>,
        tail: Option<Node>,
    ) -> Node {
        let mut node = Node::new(rule)
            .tok(keyword)
            .with(named(condition))
            .tok(TokenKind::Colon)
            .with(block(body));
        if let Some(tail) = tail {
            node = node.with(tail);
        }
        node
    }

    /// `def name(params): body`
    pub fn def(name: &str, params: &[&str], body: Vec<Node>) -> Node {
        let mut raw = Node::new(Rule::FunctionDefRaw)
            .tok(TokenKind::Def)
            .leaf(TokenKind::Name, name)
            .tok(TokenKind::Lpar);
        if !params.is_empty() {
            let mut parameters = Node::new(Rule::Parameters);
            for p in params {
                parameters = parameters.with(
                    Node::new(Rule::ParamNoDefault)
                        .with(Node::new(Rule::Param).leaf(TokenKind::Name, *p))
                        .tok(TokenKind::Comma),
                );
            }
            raw = raw.with(Node::new(Rule::Params).with(parameters));
        }
        let raw = raw
            .tok(TokenKind::Rpar)
            .tok(TokenKind::Colon)
            .with(block(body));
        Node::new(Rule::Statement)
            .with(Node::new(Rule::CompoundStmt).with(Node::new(Rule::FunctionDef).with(raw)))
    }

    /// A whole source file.
    pub fn file(stmts: Vec<Node>) -> Node {
        let node = Node::new(Rule::FileInput);
        if stmts.is_empty() {
            node
        } else {
            node.with(statements(stmts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn test_child_lookup_by_rule_and_index() {
        let node = Node::new(Rule::Conjunction)
            .with(Node::new(Rule::Inversion).leaf(TokenKind::Name, "a"))
            .tok(TokenKind::And)
            .with(Node::new(Rule::Inversion).leaf(TokenKind::Name, "b"));
        assert_eq!(node.child_count(Rule::Inversion), 2);
        assert_eq!(
            node.child(Rule::Inversion, 1).and_then(|n| n.token(TokenKind::Name)),
            Some("b")
        );
        assert!(node.child(Rule::Inversion, 2).is_none());
        assert!(node.has_token(TokenKind::And));
        assert!(!node.has_token(TokenKind::Or));
    }

    #[test]
    fn test_lift_wraps_to_target() {
        let node = lift(number("1"), Rule::Sum);
        assert_eq!(node.rule(), Rule::Sum);
        let mut cur = &node;
        let mut depth = 0;
        while let Some(Item::Node(inner)) = cur.items().first() {
            cur = inner;
            depth += 1;
        }
        assert_eq!(cur.rule(), Rule::Atom);
        assert_eq!(depth, 6);
    }

    #[test]
    fn test_lift_leaves_higher_nodes_alone() {
        let node = lift(number("1"), Rule::Expression);
        assert_eq!(lift(node.clone(), Rule::Sum), node);
        let stmt = pass();
        assert_eq!(lift(stmt.clone(), Rule::Expression), stmt);
    }

    #[test]
    fn test_text_joins_leaves() {
        let node = binary(Rule::Sum, number("1"), TokenKind::Plus, name("x"));
        assert_eq!(node.text(), "1 + x");
        let call = call(name("f"), vec![number("1"), number("2")]);
        assert_eq!(call.text(), "f ( 1 , 2 )");
    }
}
