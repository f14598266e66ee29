//! Benchmarks the whole pipeline (parse, fold, build tree, compile procs)
//! against representative proc bodies, mirroring the non-foldable shapes
//! used to benchmark runtime execution rather than constant folding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dreamc::{
    compile_program,
    location::SourceLocation,
    settings::CompilerSettings,
    token::{Keyword, Operator, PathSep, Token, TokenKind},
};

fn tok(kind: TokenKind) -> Token {
    Token::new(kind, SourceLocation::synthetic())
}

/// `/proc/AddTwoLocals() { var/x = 1; var/y = 2; return x + y }`
///
/// Two runtime locals summed; avoids the constant folder short-circuiting
/// the whole body into a single literal return.
fn add_two_locals_tokens() -> Vec<Token> {
    vec![
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Keyword(Keyword::Proc)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("AddTwoLocals".to_owned())),
        tok(TokenKind::LeftParen),
        tok(TokenKind::RightParen),
        tok(TokenKind::LeftCurly),
        tok(TokenKind::Keyword(Keyword::Var)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("x".to_owned())),
        tok(TokenKind::Operator(Operator::Assign)),
        tok(TokenKind::Integer(1)),
        tok(TokenKind::Keyword(Keyword::Var)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("y".to_owned())),
        tok(TokenKind::Operator(Operator::Assign)),
        tok(TokenKind::Integer(2)),
        tok(TokenKind::Keyword(Keyword::Return)),
        tok(TokenKind::Identifier("x".to_owned())),
        tok(TokenKind::Operator(Operator::Plus)),
        tok(TokenKind::Identifier("y".to_owned())),
        tok(TokenKind::RightCurly),
        tok(TokenKind::EndOfFile),
    ]
}

/// `/proc/AddLoop() { var/total = 0; for (var/i = 0; i < 1000; i += 1) { total += i }; return total }`
///
/// A runtime loop, so the bytecode for the loop body is compiled once but
/// the parser/folder/tree-builder/statement-compiler pipeline still has to
/// walk a realistically deep statement tree.
fn add_loop_tokens() -> Vec<Token> {
    vec![
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Keyword(Keyword::Proc)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("AddLoop".to_owned())),
        tok(TokenKind::LeftParen),
        tok(TokenKind::RightParen),
        tok(TokenKind::LeftCurly),
        tok(TokenKind::Keyword(Keyword::Var)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("total".to_owned())),
        tok(TokenKind::Operator(Operator::Assign)),
        tok(TokenKind::Integer(0)),
        tok(TokenKind::Keyword(Keyword::For)),
        tok(TokenKind::LeftParen),
        tok(TokenKind::Keyword(Keyword::Var)),
        tok(TokenKind::PathSep(PathSep::Slash)),
        tok(TokenKind::Identifier("i".to_owned())),
        tok(TokenKind::Operator(Operator::Assign)),
        tok(TokenKind::Integer(0)),
        tok(TokenKind::Semicolon),
        tok(TokenKind::Identifier("i".to_owned())),
        tok(TokenKind::Operator(Operator::Lt)),
        tok(TokenKind::Integer(1000)),
        tok(TokenKind::Semicolon),
        tok(TokenKind::Identifier("i".to_owned())),
        tok(TokenKind::Operator(Operator::PlusAssign)),
        tok(TokenKind::Integer(1)),
        tok(TokenKind::RightParen),
        tok(TokenKind::LeftCurly),
        tok(TokenKind::Identifier("total".to_owned())),
        tok(TokenKind::Operator(Operator::PlusAssign)),
        tok(TokenKind::Identifier("i".to_owned())),
        tok(TokenKind::RightCurly),
        tok(TokenKind::Keyword(Keyword::Return)),
        tok(TokenKind::Identifier("total".to_owned())),
        tok(TokenKind::RightCurly),
        tok(TokenKind::EndOfFile),
    ]
}

fn run_pipeline(tokens: Vec<Token>) {
    let settings = CompilerSettings::default();
    let result = compile_program(black_box(tokens), &settings).expect("well-formed benchmark input");
    assert!(!result.has_errors());
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("compile_add_two_locals", |b| {
        b.iter(|| run_pipeline(add_two_locals_tokens()));
    });
    c.bench_function("compile_add_loop", |b| {
        b.iter(|| run_pipeline(add_loop_tokens()));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
