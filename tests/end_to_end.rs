//! Full pipeline tests against the single public entry point: a token
//! stream for a small, realistic program in, a compiled tree and its
//! diagnostics out.

use dreamc::{
    bytecode::Opcode,
    compile_program,
    path::Path,
    settings::CompilerSettings,
    token::{Keyword, Operator, PathSep, Token, TokenKind},
};

fn loc() -> dreamc::location::SourceLocation {
    dreamc::location::SourceLocation::synthetic()
}

fn tok(kind: TokenKind) -> Token {
    Token::new(kind, loc())
}

fn tokens(kinds: Vec<TokenKind>) -> Vec<Token> {
    let mut tokens: Vec<Token> = kinds.into_iter().map(tok).collect();
    tokens.push(tok(TokenKind::EndOfFile));
    tokens
}

#[test]
fn a_small_type_hierarchy_with_a_verb_compiles_clean() {
    // /mob { var/health = 100 } ; /mob/player/verb/Attack() { if (health > 0) return health } (health resolved as implicit src field)
    let program = tokens(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("mob".to_owned()),
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Var),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("health".to_owned()),
        TokenKind::Operator(Operator::Assign),
        TokenKind::Integer(100),
        TokenKind::RightCurly,
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("mob".to_owned()),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("player".to_owned()),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Verb),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Attack".to_owned()),
        TokenKind::LeftParen,
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::If),
        TokenKind::LeftParen,
        TokenKind::Identifier("health".to_owned()),
        TokenKind::Operator(Operator::Gt),
        TokenKind::Integer(0),
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
        TokenKind::Identifier("health".to_owned()),
        TokenKind::RightCurly,
        TokenKind::RightCurly,
    ]);
    let settings = CompilerSettings::default();
    let result = compile_program(program, &settings).expect("pipeline should not hard-fail on well-formed input");
    assert!(!result.has_errors());

    let player = result.tree.find(&Path::parse("/mob/player")).expect("/mob/player registered");
    let attack_id = result.tree.all_objects[player]
        .procs
        .get("Attack")
        .and_then(|ids| ids.first())
        .copied()
        .expect("Attack registered on /mob/player");
    let attack = &result.tree.all_procs[attack_id];
    assert!(attack.is_verb);
    assert!(!attack.bytecode.is_empty());
    assert!(attack.bytecode.iter().any(|&b| b == Opcode::JumpIfFalse as u8));
}

#[test]
fn a_global_proc_calling_another_global_proc_links_through_the_same_tree() {
    let program = tokens(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Proc),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Double".to_owned()),
        TokenKind::LeftParen,
        TokenKind::Identifier("n".to_owned()),
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
        TokenKind::Identifier("n".to_owned()),
        TokenKind::Operator(Operator::Star),
        TokenKind::Integer(2),
        TokenKind::RightCurly,
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Proc),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Quadruple".to_owned()),
        TokenKind::LeftParen,
        TokenKind::Identifier("n".to_owned()),
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
        TokenKind::Identifier("Double".to_owned()),
        TokenKind::LeftParen,
        TokenKind::Identifier("Double".to_owned()),
        TokenKind::LeftParen,
        TokenKind::Identifier("n".to_owned()),
        TokenKind::RightParen,
        TokenKind::RightParen,
        TokenKind::RightCurly,
    ]);
    let settings = CompilerSettings::default();
    let result = compile_program(program, &settings).expect("pipeline should not hard-fail on well-formed input");
    assert!(!result.has_errors());
    assert!(result.tree.global_procs.contains_key("Double"));
    assert!(result.tree.global_procs.contains_key("Quadruple"));
    let quad_id = *result.tree.global_procs.get("Quadruple").unwrap();
    assert!(!result.tree.all_procs[quad_id].bytecode.is_empty());
}

#[test]
fn calling_an_undeclared_global_proc_is_diagnosed_but_does_not_abort_the_pipeline() {
    let program = tokens(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Proc),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Main".to_owned()),
        TokenKind::LeftParen,
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
        TokenKind::Identifier("NeverDeclared".to_owned()),
        TokenKind::LeftParen,
        TokenKind::RightParen,
        TokenKind::RightCurly,
    ]);
    let settings = CompilerSettings::default();
    let result = compile_program(program, &settings).expect("pipeline should not hard-fail even with diagnosed errors");
    assert!(result.has_errors());
}
