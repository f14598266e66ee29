//! Expression AST nodes.

use crate::{location::SourceLocation, path::Path, value::ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    In,
    To,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

/// One call-target shape the parser can recognize (§4.1/§4.5).
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// `..()` — dispatch to the overridden parent implementation.
    Super,
    /// `receiver.name(args)`.
    Method { receiver: Box<ExprNode>, name: String },
    /// A bare identifier call: an intrinsic, a proc on the owning object, or
    /// a global proc, resolved by the expression compiler.
    Identifier(String),
    /// `call(proc_name)(args)` or `call(receiver, proc_name)(args)`.
    Dynamic { call_args: Vec<ExprNode> },
    /// Any other expression used as a call target (`(expr)(args)`).
    Expression(Box<ExprNode>),
}

#[derive(Debug, Clone)]
pub enum Arg {
    Positional(ExprNode),
    /// Named (keyed) call arguments parse successfully but are rejected by
    /// the expression compiler at the present development level (§4.5, §9).
    Named(String, ExprNode),
}

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub key: Option<ExprNode>,
    pub value: ExprNode,
}

/// One piece of a string literal with embedded `[expr]` interpolation.
#[derive(Debug, Clone)]
pub enum StringPiece {
    Literal(String),
    Expr(ExprNode),
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// Placeholder left behind by error recovery so later phases can keep
    /// walking the tree around a parse failure.
    Invalid,
    /// An expression statement with no value (e.g. a bare `set` inside an
    /// expression position after error recovery).
    Void,
    ConstInteger(i64),
    ConstFloat(f64),
    ConstString(String),
    ConstNull,
    ConstPath(Path),
    ConstResource(String),
    Identifier(String),
    Unary {
        op: UnaryOperator,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Ternary {
        condition: Box<ExprNode>,
        if_true: Box<ExprNode>,
        if_false: Box<ExprNode>,
    },
    Assign {
        op: crate::ast::stmt::AssignmentOperator,
        target: Box<ExprNode>,
        value: Box<ExprNode>,
    },
    DereferenceField {
        base: Box<ExprNode>,
        field: String,
        safe: bool,
    },
    DereferenceIndex {
        base: Box<ExprNode>,
        index: Box<ExprNode>,
    },
    Call {
        target: CallTarget,
        args: Vec<Arg>,
    },
    ListLiteral(Vec<ListEntry>),
    NewList(Vec<ExprNode>),
    New {
        path: Option<Path>,
        target: Option<Box<ExprNode>>,
        args: Vec<Arg>,
    },
    InterpolatedString(Vec<StringPiece>),
    Input {
        args: Vec<Arg>,
        as_types: ValueType,
        in_list: Option<Box<ExprNode>>,
    },
    /// A `lo to hi` span appearing as a switch case value. Not a standalone
    /// expression anywhere else in the grammar.
    CaseRange {
        low: Box<ExprNode>,
        high: Box<ExprNode>,
    },
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub location: SourceLocation,
    pub kind: Expr,
}

impl ExprNode {
    #[must_use]
    pub fn new(location: SourceLocation, kind: Expr) -> Self {
        Self { location, kind }
    }

    #[must_use]
    pub fn invalid(location: SourceLocation) -> Self {
        Self::new(location, Expr::Invalid)
    }

    /// Succeeds only for nodes that fold to a compile-time constant: used
    /// for serializing global/instance var initializers (§3, §6.5).
    #[must_use]
    pub fn try_as_constant(&self) -> Option<crate::value::Constant> {
        match &self.kind {
            Expr::ConstInteger(i) => Some(crate::value::Constant::Integer(*i)),
            Expr::ConstFloat(f) => Some(crate::value::Constant::Float(*f)),
            Expr::ConstNull => Some(crate::value::Constant::Null),
            Expr::ConstPath(p) => Some(crate::value::Constant::Path(p.clone())),
            // ConstString/ConstResource require interning, handled by callers
            // with access to a StringTable (see `object_tree::try_fold_constant`).
            _ => None,
        }
    }
}
