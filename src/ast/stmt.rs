//! Proc-statement AST nodes.

use crate::{
    location::SourceLocation,
    path::{Path, VarModifierFlags},
    value::ComplexValueType,
};

use super::expr::ExprNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    /// `:=` — "assign-into", used for typed-variable refinement.
    AssignInto,
}

/// One declarator inside a `var` statement: `var/mob/x = new/mob()` or, when
/// several are grouped, one entry of `var/mob{x, y = 2}`.
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub type_path: Option<Path>,
    pub modifiers: VarModifierFlags,
    /// `var/list/x[]` — type is refined to `/list` when this is set (§4.6).
    pub is_list_suffix: bool,
    pub explicit_value_type: Option<ComplexValueType>,
    pub initializer: Option<ExprNode>,
    pub location: SourceLocation,
}

/// The parsed var-decl info for a `for(var/T/x in expr)` loop variable.
#[derive(Debug, Clone)]
pub struct ForVarDecl {
    pub name: String,
    pub type_path: Option<Path>,
    /// True when `var` introduced a fresh local; false when the loop reuses
    /// an already-declared variable (`for(x in list)`).
    pub declares_new: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ForInSource {
    Range {
        low: ExprNode,
        high: ExprNode,
    },
    List(ExprNode),
}

#[derive(Debug, Clone)]
pub enum CaseValue {
    Single(ExprNode),
    Range(ExprNode, ExprNode),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub values: Vec<CaseValue>,
    pub body: Vec<StmtNode>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(ExprNode),
    VarDeclaration(Vec<Declarator>),
    Return(Option<ExprNode>),
    If {
        condition: ExprNode,
        then_body: Vec<StmtNode>,
        else_body: Option<Vec<StmtNode>>,
    },
    While {
        condition: ExprNode,
        body: Vec<StmtNode>,
    },
    DoWhile {
        body: Vec<StmtNode>,
        condition: ExprNode,
    },
    For {
        init: Option<Box<StmtNode>>,
        condition: Option<ExprNode>,
        increment: Option<ExprNode>,
        body: Vec<StmtNode>,
    },
    ForRange {
        var_decl: ForVarDecl,
        low: ExprNode,
        high: ExprNode,
        step: Option<ExprNode>,
        body: Vec<StmtNode>,
    },
    ForIn {
        var_decl: ForVarDecl,
        source: ForInSource,
        body: Vec<StmtNode>,
    },
    Switch {
        scrutinee: ExprNode,
        cases: Vec<SwitchCase>,
        default: Option<Vec<StmtNode>>,
    },
    Break,
    Continue,
    /// `label name:` — a var-less label binding.
    Label(String),
    Goto(String),
    Del(ExprNode),
    Spawn {
        delay: Option<ExprNode>,
        body: Vec<StmtNode>,
    },
    Try {
        body: Vec<StmtNode>,
        catch_var: Option<Declarator>,
        catch_body: Vec<StmtNode>,
    },
    Throw(ExprNode),
    /// `set name = value` (proc attribute, `src`, or verb metadata).
    Set {
        name: String,
        value: ExprNode,
    },
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub location: SourceLocation,
    pub kind: Stmt,
}

impl StmtNode {
    #[must_use]
    pub fn new(location: SourceLocation, kind: Stmt) -> Self {
        Self { location, kind }
    }
}
