//! `ExpressionCompiler` exercised through the public crate boundary with
//! expressions built by the real parser instead of hand-written AST nodes.
//! Each expression is smuggled in as a `/proc/Test() { return <expr> }`
//! body so the full `parser::parse` entry point (the only parser surface
//! exposed outside the crate) produces it.

use dreamc::{
    ast::{top::ObjectStmt, ExprNode, Stmt},
    bytecode::{BytecodeWriter, Opcode},
    compiler::{CompileCtx, ExpressionCompiler},
    diagnostics::Diagnostics,
    location::SourceLocation,
    object_tree::{BuiltinRegistry, DMProc, ObjectTree},
    parser,
    path::Path,
    settings::CompilerSettings,
    token::{Keyword, PathSep, Token, TokenKind},
};

fn loc() -> SourceLocation {
    SourceLocation::synthetic()
}

fn tok(kind: TokenKind) -> Token {
    Token::new(kind, loc())
}

/// Parses `expr_tokens` as the sole `return` expression of a throwaway
/// global proc, then compiles just that expression.
fn compile_expression(expr_tokens: Vec<TokenKind>) -> (Vec<u8>, Diagnostics) {
    let mut tokens = vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Proc),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Test".to_owned()),
        TokenKind::LeftParen,
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
    ];
    tokens.extend(expr_tokens);
    tokens.push(TokenKind::RightCurly);
    let mut tokens: Vec<Token> = tokens.into_iter().map(tok).collect();
    tokens.push(tok(TokenKind::EndOfFile));

    let mut parse_diagnostics = Diagnostics::new();
    let settings = CompilerSettings::default();
    let file = parser::parse(tokens, &mut parse_diagnostics, &settings).expect("well-formed input");
    assert!(!parse_diagnostics.has_errors());

    let ObjectStmt::Definition { body, .. } = &file.statements[0].kind else { panic!("expected the /proc owner wrapper") };
    let ObjectStmt::ProcDefinition { body: proc_body, .. } = &body[0].kind else { panic!("expected a proc definition") };
    let Stmt::Return(Some(expr)) = &proc_body[0].kind else { panic!("expected a return with a value") };
    let expr: ExprNode = expr.clone();

    let mut tree = ObjectTree::new();
    let owner = tree.get_or_create(&Path::root());
    let builtins = BuiltinRegistry::new();
    let mut diagnostics = Diagnostics::new();
    let ObjectTree { all_objects, globals, strings, resources, global_procs, .. } = &mut tree;
    let mut ctx = CompileCtx {
        objects: all_objects,
        globals,
        strings,
        resources,
        global_procs,
        builtins: &builtins,
        diagnostics: &mut diagnostics,
        settings: &settings,
    };
    let mut writer = BytecodeWriter::new();
    let mut proc = DMProc::new(0, "test".to_string(), owner, &[], loc());
    let mut compiler =
        ExpressionCompiler { ctx: &mut ctx, writer: &mut writer, owner, _ast: std::marker::PhantomData };
    compiler.compile(&mut proc, &expr);
    (writer.finalize().unwrap(), diagnostics)
}

#[test]
fn additive_expression_compiles_both_operands_then_add() {
    let (bytes, diagnostics) = compile_expression(vec![TokenKind::Integer(2), TokenKind::Operator(dreamc::token::Operator::Plus), TokenKind::Integer(3)]);
    assert!(!diagnostics.has_errors());
    assert_eq!(bytes.last().copied(), Some(Opcode::Add as u8));
}

#[test]
fn unknown_global_proc_call_is_diagnosed() {
    let (_, diagnostics) = compile_expression(vec![
        TokenKind::Identifier("TotallyNotARealProc".to_owned()),
        TokenKind::LeftParen,
        TokenKind::RightParen,
    ]);
    assert!(diagnostics.has_errors());
}

#[test]
fn string_literal_compiles_to_a_push_string_instruction() {
    let (bytes, diagnostics) = compile_expression(vec![TokenKind::String(vec![dreamc::token::StringPart::Literal("hi".to_owned())])]);
    assert!(!diagnostics.has_errors());
    assert_eq!(bytes[0], Opcode::PushString as u8);
}
