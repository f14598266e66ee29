//! End-to-end parser tests: hand-built token streams in, full `File` ASTs
//! out, checked against the shapes the rest of the pipeline expects.

use dreamc::{
    ast::{top::ObjectStmt, Stmt},
    diagnostics::Diagnostics,
    parser,
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

fn parse(tokens: Vec<TokenKind>) -> (dreamc::ast::File, Diagnostics) {
    let mut tokens: Vec<Token> = tokens.into_iter().map(tok).collect();
    tokens.push(tok(TokenKind::EndOfFile));
    let mut diagnostics = Diagnostics::new();
    let settings = CompilerSettings::default();
    let file = parser::parse(tokens, &mut diagnostics, &settings).expect("watchdog should not trip on well-formed input");
    (file, diagnostics)
}

#[test]
fn nested_type_blocks_flatten_into_definitions() {
    let (file, diagnostics) = parse(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("mob".to_owned()),
        TokenKind::LeftCurly,
        TokenKind::Identifier("player".to_owned()),
        TokenKind::LeftCurly,
        TokenKind::RightCurly,
        TokenKind::RightCurly,
    ]);
    assert!(!diagnostics.has_errors());
    assert_eq!(file.statements.len(), 1);
    let ObjectStmt::Definition { path, body } = &file.statements[0].kind else { panic!("expected a definition") };
    assert_eq!(*path, Path::absolute(&["mob"]));
    assert_eq!(body.len(), 1);
    let ObjectStmt::Definition { path: inner_path, .. } = &body[0].kind else { panic!("expected a nested definition") };
    assert_eq!(*inner_path, Path::new(dreamc::path::PathRoot::Relative, vec!["player".to_owned()]));
}

#[test]
fn var_block_inside_a_type_yields_a_var_definition_leaf() {
    let (file, diagnostics) = parse(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("mob".to_owned()),
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Var),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("health".to_owned()),
        TokenKind::Operator(Operator::Assign),
        TokenKind::Integer(100),
        TokenKind::RightCurly,
    ]);
    assert!(!diagnostics.has_errors());
    let ObjectStmt::Definition { body, .. } = &file.statements[0].kind else { panic!("expected a definition") };
    assert_eq!(body.len(), 1);
    let ObjectStmt::VarDefinition(declarator) = &body[0].kind else { panic!("expected a var definition") };
    assert_eq!(declarator.name, "health");
}

#[test]
fn proc_body_statements_parse_into_the_right_shapes() {
    let (file, diagnostics) = parse(vec![
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Keyword(Keyword::Proc),
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("Sum".to_owned()),
        TokenKind::LeftParen,
        TokenKind::Identifier("a".to_owned()),
        TokenKind::Comma,
        TokenKind::Identifier("b".to_owned()),
        TokenKind::RightParen,
        TokenKind::LeftCurly,
        TokenKind::Keyword(Keyword::Return),
        TokenKind::Identifier("a".to_owned()),
        TokenKind::Operator(Operator::Plus),
        TokenKind::Identifier("b".to_owned()),
        TokenKind::RightCurly,
    ]);
    assert!(!diagnostics.has_errors());
    let ObjectStmt::Definition { body, .. } = &file.statements[0].kind else { panic!("expected the /proc owner wrapper") };
    let ObjectStmt::ProcDefinition { name, params, body: proc_body, .. } = &body[0].kind else { panic!("expected a proc definition") };
    assert_eq!(name, "Sum");
    assert_eq!(params.len(), 2);
    assert_eq!(proc_body.len(), 1);
    assert!(matches!(&proc_body[0].kind, Stmt::Return(Some(_))));
}

#[test]
fn malformed_statement_is_diagnosed_and_recovered_from() {
    // `var` with no name at all, followed by a perfectly valid statement.
    let (file, diagnostics) = parse(vec![
        TokenKind::Keyword(Keyword::Var),
        TokenKind::Newline,
        TokenKind::PathSep(PathSep::Slash),
        TokenKind::Identifier("obj".to_owned()),
    ]);
    assert!(diagnostics.has_errors());
    assert!(file.statements.iter().any(|s| matches!(&s.kind, ObjectStmt::Definition { path, .. } if *path == Path::absolute(&["obj"]))));
}
