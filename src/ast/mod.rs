//! The abstract syntax tree produced by the parser and consumed by
//! `ConstantFolder`, `CodeTreeBuilder`, and the two compilers.
//!
//! Every node class is one arm of a closed `enum`; dispatch throughout the
//! crate is an exhaustive `match`, never a dynamic downcast (§9).

pub mod expr;
pub mod stmt;
pub mod top;

pub use expr::{Arg, BinaryOperator, CallTarget, Expr, ExprNode, ListEntry, StringPiece, UnaryOperator};
pub use stmt::{AssignmentOperator, CaseValue, Declarator, ForInSource, ForVarDecl, Stmt, StmtNode, SwitchCase};
pub use top::{File, ObjectStmt, ObjectStmtNode, ParamDecl};
