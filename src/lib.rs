//! `dreamc` — parser, object tree, and bytecode compiler core for the DM
//! language.
//!
//! Pipeline (§1, §2): a token stream goes in, an [`ObjectTree`] full of
//! compiled procs comes out, alongside the [`Diagnostics`] collected along
//! the way. Lexing is out of scope here — callers hand in a `Vec<Token>`
//! already produced by their own lexer — and so is serializing the result
//! to an on-disk artifact; both are the external driver's job.
//!
//! ```text
//! Vec<Token> -> parser::parse -> File
//!            -> constant_fold::fold_file (in place)
//!            -> CodeTreeBuilder::build   -> ObjectTree (types, globals, proc shells)
//!            -> StatementCompiler::compile_proc, once per proc -> bytecode
//! ```

pub mod ast;
pub mod bytecode;
pub mod codetree_builder;
pub mod compiler;
pub mod constant_fold;
pub mod diagnostics;
pub mod intern;
pub mod location;
pub mod object_tree;
pub mod parser;
pub mod path;
pub mod settings;
pub mod token;
pub mod value;

use ast::top::File;
use codetree_builder::CodeTreeBuilder;
use compiler::{CompileCtx, StatementCompiler};
use diagnostics::{CoreError, Diagnostics};
use object_tree::{BuiltinRegistry, ObjectTree};
use settings::CompilerSettings;
use token::Token;

/// Everything produced by one call to [`compile`].
///
/// `tree` borrows its procs' AST bodies from a [`File`] leaked for the
/// `'static` lifetime (the same technique [`CodeTreeBuilder`] already uses
/// for synthesized initialization-proc bodies) — a compiled unit has no
/// natural owner to hand the source `File` back to, and the alternative is
/// a self-referential struct this crate has no reason to build by hand.
pub struct CompilationResult {
    pub tree: ObjectTree<'static>,
    pub diagnostics: Diagnostics,
}

impl CompilationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Runs the full pipeline: parse, fold constants, populate the object tree,
/// then compile every registered proc's body to bytecode.
///
/// Ordinary source errors (an unknown identifier, a malformed `for` clause)
/// are recorded in the returned [`Diagnostics`], not propagated as `Err` —
/// check [`CompilationResult::has_errors`] after a successful call. `Err`
/// is reserved for the two conditions the pipeline cannot recover a
/// partial result from: the parser's progress watchdog tripping, or a
/// `BytecodeWriter` invariant violation.
///
/// # Errors
/// See above.
pub fn compile_program(tokens: Vec<Token>, settings: &CompilerSettings) -> Result<CompilationResult, CoreError> {
    let mut diagnostics = Diagnostics::new();
    let mut file = parser::parse(tokens, &mut diagnostics, settings)?;
    constant_fold::fold_file(&mut file);
    let file: &'static File = Box::leak(Box::new(file));

    let mut tree = ObjectTree::new();
    CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(file);

    let builtins = BuiltinRegistry::new();
    compile_all_procs(&mut tree, &builtins, settings, &mut diagnostics)?;

    Ok(CompilationResult { tree, diagnostics })
}

/// Compiles every proc the code-tree builder registered, in id order.
///
/// Borrows `tree`'s fields directly rather than through a single `&mut
/// ObjectTree` handle so that the proc being compiled (`tree.all_procs[i]`)
/// and the rest of the tree a [`CompileCtx`] needs (`tree.all_objects`,
/// `tree.globals`, ...) can be held mutably at the same time — the two are
/// disjoint fields of the same struct, which the borrow checker accepts
/// even though a method call taking `&mut self` would not.
fn compile_all_procs(
    tree: &mut ObjectTree<'static>,
    builtins: &BuiltinRegistry,
    settings: &CompilerSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), CoreError> {
    for i in 0..tree.all_procs.len() {
        let mut ctx = CompileCtx {
            objects: &mut tree.all_objects,
            globals: &mut tree.globals,
            strings: &mut tree.strings,
            resources: &mut tree.resources,
            global_procs: &tree.global_procs,
            builtins,
            diagnostics,
            settings,
        };
        let proc = &mut tree.all_procs[i];
        let (bytecode, max_stack) = StatementCompiler::compile_proc(&mut ctx, proc)?;
        proc.bytecode = bytecode;
        proc.max_stack = max_stack;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        intern::StringId,
        location::SourceLocation,
        token::{Keyword, Operator, PathSep, TokenKind},
    };

    fn loc() -> SourceLocation {
        SourceLocation::new(StringId::from_index(0), 1, 1)
    }

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, loc())
    }

    /// `/mob/proc/Greet() return "hi"` end to end: parses, populates the
    /// tree, and emits bytecode for the one registered proc.
    #[test]
    fn compiles_a_minimal_global_proc_to_bytecode() {
        let tokens = vec![
            tok(TokenKind::PathSep(PathSep::Slash)),
            tok(TokenKind::Identifier("mob".to_owned())),
            tok(TokenKind::PathSep(PathSep::Slash)),
            tok(TokenKind::Keyword(Keyword::Proc)),
            tok(TokenKind::PathSep(PathSep::Slash)),
            tok(TokenKind::Identifier("Greet".to_owned())),
            tok(TokenKind::LeftParen),
            tok(TokenKind::RightParen),
            tok(TokenKind::LeftCurly),
            tok(TokenKind::Keyword(Keyword::Return)),
            tok(TokenKind::String(vec![crate::token::StringPart::Literal("hi".to_owned())])),
            tok(TokenKind::RightCurly),
            tok(TokenKind::EndOfFile),
        ];
        let settings = CompilerSettings::default();
        let result = compile_program(tokens, &settings).expect("pipeline should not hard-fail");
        assert!(!result.has_errors());
        let mob = result.tree.find(&crate::path::Path::parse("/mob")).expect("mob type registered");
        let proc_id = *result.tree.all_objects[mob].procs.get("Greet").and_then(|ids| ids.first()).expect("Greet registered");
        assert!(!result.tree.all_procs[proc_id].bytecode.is_empty());
    }

    #[test]
    fn unknown_variable_override_is_a_warning_not_a_hard_error() {
        let tokens = vec![
            tok(TokenKind::PathSep(PathSep::Slash)),
            tok(TokenKind::Identifier("mob".to_owned())),
            tok(TokenKind::PathSep(PathSep::Slash)),
            tok(TokenKind::Identifier("ghost_var".to_owned())),
            tok(TokenKind::Operator(Operator::Assign)),
            tok(TokenKind::Integer(1)),
            tok(TokenKind::EndOfFile),
        ];
        let settings = CompilerSettings::default();
        let result = compile_program(tokens, &settings).expect("pipeline should not hard-fail");
        assert!(!result.has_errors());
        assert!(!result.diagnostics.entries().is_empty());
    }
}
