//! Expression and statement lowering: AST plus a populated `ObjectTree`
//! goes in, bytecode comes out (§4.5, §4.6).

pub mod expr;
pub mod stmt;

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::{
    diagnostics::Diagnostics,
    intern::StringTable,
    object_tree::{BuiltinRegistry, DMObject, ProcId, Variable},
    settings::CompilerSettings,
};

pub use expr::ExpressionCompiler;
pub use stmt::StatementCompiler;

/// Everything the compilers need from the object tree *except* the proc
/// currently being compiled, borrowed field-by-field so the caller can
/// also hold `&mut DMProc` into the same tree without aliasing.
pub struct CompileCtx<'t> {
    pub objects: &'t mut Vec<DMObject>,
    pub globals: &'t mut Vec<Variable>,
    pub strings: &'t mut StringTable,
    pub resources: &'t mut BTreeSet<String>,
    pub global_procs: &'t AHashMap<String, ProcId>,
    pub builtins: &'t BuiltinRegistry,
    pub diagnostics: &'t mut Diagnostics,
    pub settings: &'t CompilerSettings,
}

/// The resolved shape of an assignment target (§4.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LValueKind {
    /// `Local`/special single-byte references; nothing extra on the stack.
    Simple,
    /// `obj.field` — the receiver must be pushed before the `Assign`.
    Field,
    /// `obj[key]` — both the list and key must be pushed before `Assign`.
    ListIndex,
}
