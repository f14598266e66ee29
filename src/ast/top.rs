//! Object-level (top-of-file and inside object-definition blocks) AST nodes.

use crate::{location::SourceLocation, path::Path, value::ComplexValueType};

use super::{expr::ExprNode, stmt::{Declarator, StmtNode}};

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub type_path: Option<Path>,
    pub default: Option<ExprNode>,
    pub explicit_value_type: Option<ComplexValueType>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ObjectStmt {
    /// `/mob/player { ... }` — a path followed by an indented block.
    Definition { path: Path, body: Vec<ObjectStmtNode> },
    VarDefinition(Declarator),
    /// An existing variable re-assigned at object-definition scope:
    /// `icon = 'player.dmi'` inside `/mob/player`.
    VarOverride { name: String, value: ExprNode },
    ProcDefinition {
        name: String,
        is_verb: bool,
        is_final: bool,
        params: Vec<ParamDecl>,
        body: Vec<StmtNode>,
    },
}

#[derive(Debug, Clone)]
pub struct ObjectStmtNode {
    pub location: SourceLocation,
    pub kind: ObjectStmt,
}

impl ObjectStmtNode {
    #[must_use]
    pub fn new(location: SourceLocation, kind: ObjectStmt) -> Self {
        Self { location, kind }
    }
}

/// The whole parsed file: a flat list of top-level object statements.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub statements: Vec<ObjectStmtNode>,
}
