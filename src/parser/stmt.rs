//! Proc-body statement grammar: one method per statement keyword, dispatched
//! from `parse_proc_statement`. Declarator parsing (`parse_bare_declarator`/
//! `finish_declarator_tail`) lives here because a `var` statement is just
//! the proc-local case of the same declarator shape `top.rs` builds for
//! object-scope var definitions.

use crate::{
    ast::stmt::{CaseValue, Declarator, ForInSource, ForVarDecl, Stmt, StmtNode, SwitchCase},
    diagnostics::DiagnosticKind,
    location::SourceLocation,
    path::{Path, PathRoot, VarModifierFlags, VarModifiers},
    token::{Keyword, Operator, PathSep, TokenKind},
};

use super::Parser;

impl<'t> Parser<'t> {
    pub(super) fn parse_proc_statement(&mut self) -> Option<StmtNode> {
        self.skip_newlines();
        if self.is_eof() {
            return None;
        }
        let location = self.current_location();
        let kind = match self.kind().clone() {
            TokenKind::Keyword(Keyword::Var) => {
                self.advance();
                let declarator = self.parse_bare_declarator();
                self.end_statement();
                Stmt::VarDeclaration(vec![declarator])
            }
            TokenKind::Keyword(Keyword::If) => return Some(self.parse_if(location)),
            TokenKind::Keyword(Keyword::While) => return Some(self.parse_while(location)),
            TokenKind::Keyword(Keyword::Do) => return Some(self.parse_do_while(location)),
            TokenKind::Keyword(Keyword::For) => return Some(self.parse_for(location)),
            TokenKind::Keyword(Keyword::Switch) => return Some(self.parse_switch(location)),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.skip_optional_label();
                self.end_statement();
                Stmt::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.skip_optional_label();
                self.end_statement();
                Stmt::Continue
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.at_statement_end() { None } else { Some(self.parse_expression()) };
                self.end_statement();
                Stmt::Return(value)
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.advance();
                let label = self.expect_identifier_like("label name");
                self.end_statement();
                Stmt::Goto(label)
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.advance();
                let target = self.parse_expression();
                self.end_statement();
                Stmt::Del(target)
            }
            TokenKind::Keyword(Keyword::Spawn) => return Some(self.parse_spawn(location)),
            TokenKind::Keyword(Keyword::Try) => return Some(self.parse_try(location)),
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                let value = self.parse_expression();
                self.end_statement();
                Stmt::Throw(value)
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                let name = self.expect_identifier_like("set attribute name");
                self.expect_operator(Operator::Assign, "`=`");
                let value = self.parse_expression();
                self.end_statement();
                Stmt::Set { name, value }
            }
            _ => return Some(self.parse_expression_or_label_statement(location)),
        };
        Some(StmtNode::new(location, kind))
    }

    /// `break name`/`continue name` parse but the label isn't tracked
    /// anywhere downstream; diagnosed once here rather than silently dropped.
    fn skip_optional_label(&mut self) {
        if let TokenKind::Identifier(name) = self.kind().clone() {
            let location = self.current_location();
            self.advance();
            self.diagnostics.warning(
                DiagnosticKind::UnsupportedFeature,
                location,
                format!("labeled break/continue target '{name}' is not tracked and is treated as unlabeled"),
            );
        }
    }

    fn parse_expression_or_label_statement(&mut self, location: SourceLocation) -> StmtNode {
        if let TokenKind::Identifier(name) = self.kind().clone() {
            if matches!(self.peek_kind_at(1), Some(TokenKind::PathSep(PathSep::Colon))) {
                self.advance();
                self.advance();
                self.end_statement();
                return StmtNode::new(location, Stmt::Label(name));
            }
        }
        let expr = self.parse_expression();
        self.end_statement();
        StmtNode::new(location, Stmt::Expression(expr))
    }

    fn parse_if(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let condition = self.parse_expression();
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        let then_body = self.parse_block(|p| p.parse_proc_statement());
        self.skip_newlines_before_else();
        let else_body = if self.eat_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                let inner_location = self.current_location();
                Some(vec![self.parse_if(inner_location)])
            } else {
                Some(self.parse_block(|p| p.parse_proc_statement()))
            }
        } else {
            None
        };
        StmtNode::new(location, Stmt::If { condition, then_body, else_body })
    }

    /// A blank line between `}` and `else` is still the same `if`; only
    /// consume the newlines if an `else` is actually waiting past them.
    fn skip_newlines_before_else(&mut self) {
        let saved = self.pos;
        self.skip_newlines();
        if !self.check_keyword(Keyword::Else) {
            self.pos = saved;
        }
    }

    fn parse_while(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let condition = self.parse_expression();
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        let body = self.parse_block(|p| p.parse_proc_statement());
        StmtNode::new(location, Stmt::While { condition, body })
    }

    fn parse_do_while(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        let body = self.parse_block(|p| p.parse_proc_statement());
        self.skip_newlines();
        self.expect_keyword(Keyword::While, "`while` after `do` block");
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let condition = self.parse_expression();
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        self.end_statement();
        StmtNode::new(location, Stmt::DoWhile { body, condition })
    }

    fn parse_for(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        if self.eat_punct(|k| matches!(k, TokenKind::RightParen)) {
            let body = self.parse_block(|p| p.parse_proc_statement());
            return StmtNode::new(location, Stmt::For { init: None, condition: None, increment: None, body });
        }

        let declares_new = self.eat_keyword(Keyword::Var);
        if declares_new || matches!(self.kind(), TokenKind::Identifier(_)) {
            let var_location = self.current_location();
            let (name, type_path) = if declares_new {
                self.parse_for_var_path()
            } else {
                let TokenKind::Identifier(name) = self.kind().clone() else { unreachable!() };
                self.advance();
                (name, None)
            };
            let var_decl = ForVarDecl { name, type_path, declares_new, location: var_location };

            if self.eat_keyword(Keyword::In) {
                let low = self.parse_logical_or();
                let source = if self.eat_keyword(Keyword::To) {
                    let high = self.parse_logical_or();
                    ForInSource::Range { low, high }
                } else {
                    ForInSource::List(low)
                };
                self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
                let body = self.parse_block(|p| p.parse_proc_statement());
                return StmtNode::new(location, Stmt::ForIn { var_decl, source, body });
            }

            if self.eat_operator(Operator::Assign) {
                let low = self.parse_logical_or();
                if self.eat_keyword(Keyword::To) {
                    let high = self.parse_logical_or();
                    let step = if self.eat_keyword(Keyword::Step) { Some(self.parse_logical_or()) } else { None };
                    self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
                    let body = self.parse_block(|p| p.parse_proc_statement());
                    return StmtNode::new(location, Stmt::ForRange { var_decl, low, high, step, body });
                }
                return self.finish_c_style_for(location, var_decl, Some(low));
            }

            return self.finish_c_style_for(location, var_decl, None);
        }

        // `for(init_expr; cond; incr)` with no declarator at all.
        let init = if self.at_for_clause_end() {
            None
        } else {
            let init_location = self.current_location();
            let expr = self.parse_expression();
            Some(Box::new(StmtNode::new(init_location, Stmt::Expression(expr))))
        };
        self.finish_c_style_for_tail(location, init)
    }

    fn at_for_clause_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Semicolon | TokenKind::RightParen)
    }

    /// Reads the `/`-separated type segments of a `for(var/T/x ...)` target,
    /// splitting off the trailing name the same way a bare declarator does.
    fn parse_for_var_path(&mut self) -> (String, Option<Path>) {
        let root = if self.eat_path_sep(PathSep::Slash) { PathRoot::Absolute } else { PathRoot::Relative };
        let mut raw = Vec::new();
        loop {
            match self.kind().clone() {
                TokenKind::Identifier(name) => {
                    raw.push(name);
                    self.advance();
                }
                TokenKind::Keyword(kw) => {
                    raw.push(super::keyword_text(kw).to_owned());
                    self.advance();
                }
                _ => break,
            }
            if !self.eat_path_sep(PathSep::Slash) {
                break;
            }
        }
        if raw.is_empty() {
            self.error("expected a loop variable name");
            return (String::new(), None);
        }
        let name = raw.pop().expect("checked non-empty above");
        let type_path = if raw.is_empty() { None } else { Some(Path::new(root, raw)) };
        (name, type_path)
    }

    /// Completes a classic `for(init; cond; incr)` whose init half was a
    /// freshly declared loop variable, optionally already carrying an
    /// initializer value consumed while probing for a `to` range.
    fn finish_c_style_for(&mut self, location: SourceLocation, var_decl: ForVarDecl, initializer: Option<crate::ast::expr::ExprNode>) -> StmtNode {
        let declarator = Declarator {
            name: var_decl.name,
            type_path: var_decl.type_path,
            modifiers: VarModifierFlags::empty(),
            is_list_suffix: false,
            explicit_value_type: None,
            initializer,
            location: var_decl.location,
        };
        let init = Some(Box::new(StmtNode::new(var_decl.location, Stmt::VarDeclaration(vec![declarator]))));
        self.finish_c_style_for_tail(location, init)
    }

    fn finish_c_style_for_tail(&mut self, location: SourceLocation, init: Option<Box<StmtNode>>) -> StmtNode {
        self.expect_punct(|k| matches!(k, TokenKind::Semicolon), "`;`");
        let condition = if self.at_for_clause_end() { None } else { Some(self.parse_expression()) };
        self.expect_punct(|k| matches!(k, TokenKind::Semicolon), "`;`");
        let increment = if matches!(self.kind(), TokenKind::RightParen) { None } else { Some(self.parse_expression()) };
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        let body = self.parse_block(|p| p.parse_proc_statement());
        StmtNode::new(location, Stmt::For { init, condition, increment, body })
    }

    fn parse_switch(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let scrutinee = self.parse_expression();
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        let (cases, default) = self.parse_switch_body();
        StmtNode::new(location, Stmt::Switch { scrutinee, cases, default })
    }

    fn parse_switch_body(&mut self) -> (Vec<SwitchCase>, Option<Vec<StmtNode>>) {
        let mut cases = Vec::new();
        let mut default = None;
        self.skip_newlines();
        let opened_curly = self.eat_punct(|k| matches!(k, TokenKind::LeftCurly));
        let opened_indent = !opened_curly && self.eat_punct(|k| matches!(k, TokenKind::Indent));
        loop {
            self.skip_statement_terminators();
            if opened_curly && self.eat_punct(|k| matches!(k, TokenKind::RightCurly)) {
                break;
            }
            if opened_indent && self.eat_punct(|k| matches!(k, TokenKind::Dedent)) {
                break;
            }
            if self.is_eof() || !self.check_progress() {
                break;
            }
            if self.eat_keyword(Keyword::Case) {
                let values = self.parse_case_value_list();
                self.expect_path_sep(PathSep::Colon, "`:` after case value list");
                let body = self.parse_case_body();
                cases.push(SwitchCase { values, body });
            } else if self.eat_keyword(Keyword::Default) {
                self.expect_path_sep(PathSep::Colon, "`:` after `default`");
                default = Some(self.parse_case_body());
            } else {
                self.error("expected `case` or `default` inside switch body");
                self.recover_to_next_statement();
            }
        }
        (cases, default)
    }

    /// A case/default body ends at the next `case`/`default`/block closer
    /// rather than after one statement, so it can't reuse `parse_block`'s
    /// brace-or-single-statement shape — an empty case (`case 1:` falling
    /// straight into the next `case`) is common and must parse as `vec![]`.
    fn parse_case_body(&mut self) -> Vec<StmtNode> {
        self.skip_newlines();
        if self.eat_punct(|k| matches!(k, TokenKind::LeftCurly)) {
            let mut items = Vec::new();
            loop {
                self.skip_statement_terminators();
                if self.is_eof() || self.eat_punct(|k| matches!(k, TokenKind::RightCurly)) {
                    break;
                }
                if !self.check_progress() {
                    break;
                }
                match self.parse_proc_statement() {
                    Some(stmt) => items.push(stmt),
                    None => {
                        if !self.aborted {
                            self.recover_to_next_statement();
                        }
                    }
                }
            }
            return items;
        }
        let mut items = Vec::new();
        loop {
            self.skip_statement_terminators();
            if self.is_eof()
                || self.check_keyword(Keyword::Case)
                || self.check_keyword(Keyword::Default)
                || matches!(self.kind(), TokenKind::RightCurly | TokenKind::Dedent)
            {
                break;
            }
            if !self.check_progress() {
                break;
            }
            match self.parse_proc_statement() {
                Some(stmt) => items.push(stmt),
                None => {
                    if !self.aborted {
                        self.recover_to_next_statement();
                    }
                }
            }
        }
        items
    }

    fn parse_case_value_list(&mut self) -> Vec<CaseValue> {
        let mut values = Vec::new();
        loop {
            let low = self.parse_logical_or();
            let value = if self.eat_keyword(Keyword::To) {
                let high = self.parse_logical_or();
                CaseValue::Range(low, high)
            } else {
                CaseValue::Single(low)
            };
            values.push(value);
            if !self.eat_punct(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
        }
        values
    }

    fn parse_spawn(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        let delay = if self.eat_punct(|k| matches!(k, TokenKind::LeftParen)) {
            let delay = if matches!(self.kind(), TokenKind::RightParen) { None } else { Some(self.parse_expression()) };
            self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
            delay
        } else {
            None
        };
        let body = self.parse_block(|p| p.parse_proc_statement());
        StmtNode::new(location, Stmt::Spawn { delay, body })
    }

    fn parse_try(&mut self, location: SourceLocation) -> StmtNode {
        self.advance();
        let body = self.parse_block(|p| p.parse_proc_statement());
        self.skip_newlines();
        self.expect_keyword(Keyword::Catch, "`catch` after `try` block");
        let catch_var = if self.eat_punct(|k| matches!(k, TokenKind::LeftParen)) {
            let declarator = if matches!(self.kind(), TokenKind::RightParen) {
                None
            } else if self.eat_keyword(Keyword::Var) {
                Some(self.parse_bare_declarator())
            } else {
                let catch_location = self.current_location();
                let name = self.expect_identifier_like("catch variable name");
                Some(Declarator {
                    name,
                    type_path: None,
                    modifiers: VarModifierFlags::empty(),
                    is_list_suffix: false,
                    explicit_value_type: None,
                    initializer: None,
                    location: catch_location,
                })
            };
            self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
            declarator
        } else {
            None
        };
        let catch_body = self.parse_block(|p| p.parse_proc_statement());
        StmtNode::new(location, Stmt::Try { body, catch_var, catch_body })
    }

    pub(super) fn parse_bare_declarator(&mut self) -> Declarator {
        let location = self.current_location();
        let root = if self.eat_path_sep(PathSep::Slash) { PathRoot::Absolute } else { PathRoot::Relative };
        let mut raw = Vec::new();
        loop {
            match self.kind().clone() {
                TokenKind::Identifier(name) => {
                    raw.push(name);
                    self.advance();
                }
                TokenKind::Keyword(kw) => {
                    raw.push(super::keyword_text(kw).to_owned());
                    self.advance();
                }
                _ => break,
            }
            if !self.eat_path_sep(PathSep::Slash) {
                break;
            }
        }
        if raw.is_empty() {
            self.error("expected a variable name");
            return Declarator {
                name: String::new(),
                type_path: None,
                modifiers: VarModifierFlags::empty(),
                is_list_suffix: false,
                explicit_value_type: None,
                initializer: None,
                location,
            };
        }
        let name = raw.pop().expect("checked non-empty above");
        let prefix = Path::new(root, raw);
        let modifiers = VarModifiers::from_declarator_path(&prefix);
        self.finish_declarator_tail(name, modifiers, location)
    }

    /// Shared tail for both a proc-local `var` statement and an
    /// object-scope `/path/var/...` leaf: optional `[]` list suffix,
    /// optional `as` type clause, optional `= initializer`.
    pub(super) fn finish_declarator_tail(&mut self, name: String, modifiers: VarModifiers, location: SourceLocation) -> Declarator {
        let type_path = if modifiers.type_path.segments.is_empty() { None } else { Some(modifiers.type_path) };
        let mut is_list_suffix = false;
        if self.eat_punct(|k| matches!(k, TokenKind::LeftBracket)) {
            while !matches!(self.kind(), TokenKind::RightBracket) && !self.is_eof() {
                self.advance();
            }
            self.expect_punct(|k| matches!(k, TokenKind::RightBracket), "`]`");
            is_list_suffix = true;
        }
        let explicit_value_type = if self.eat_keyword(Keyword::As) { Some(self.parse_as_type_clause()) } else { None };
        let initializer = if self.eat_operator(Operator::Assign) { Some(self.parse_expression()) } else { None };
        Declarator { name, type_path, modifiers: modifiers.flags, is_list_suffix, explicit_value_type, initializer, location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::Diagnostics, settings::CompilerSettings, token::{Operator as Op, Token}};

    fn loc() -> SourceLocation {
        SourceLocation::synthetic()
    }

    fn toks(kinds: Vec<TokenKind>) -> Vec<Token> {
        let mut tokens: Vec<Token> = kinds.into_iter().map(|k| Token::new(k, loc())).collect();
        tokens.push(Token::new(TokenKind::EndOfFile, loc()));
        tokens
    }

    fn parse_stmt(kinds: Vec<TokenKind>) -> (StmtNode, Diagnostics) {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let stmt = {
            let mut parser = Parser::new(toks(kinds), &mut diags, &settings);
            parser.parse_proc_statement().expect("expected a statement")
        };
        (stmt, diags)
    }

    #[test]
    fn if_else_if_chains_nest_as_if_statements() {
        let (stmt, diags) = parse_stmt(vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::LeftParen,
            TokenKind::Identifier("a".to_owned()),
            TokenKind::RightParen,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
            TokenKind::Keyword(Keyword::Else),
            TokenKind::Keyword(Keyword::If),
            TokenKind::LeftParen,
            TokenKind::Identifier("b".to_owned()),
            TokenKind::RightParen,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
        ]);
        assert!(!diags.has_errors());
        let Stmt::If { else_body: Some(else_body), .. } = stmt.kind else { panic!("expected if/else") };
        assert_eq!(else_body.len(), 1);
        assert!(matches!(else_body[0].kind, Stmt::If { .. }));
    }

    #[test]
    fn break_with_label_warns_but_does_not_error() {
        let (stmt, diags) = parse_stmt(vec![
            TokenKind::Keyword(Keyword::Break),
            TokenKind::Identifier("outer".to_owned()),
        ]);
        assert!(matches!(stmt.kind, Stmt::Break));
        assert!(!diags.has_errors());
        assert_eq!(diags.entries().len(), 1);
    }

    #[test]
    fn for_in_range_builds_range_source() {
        let (stmt, diags) = parse_stmt(vec![
            TokenKind::Keyword(Keyword::For),
            TokenKind::LeftParen,
            TokenKind::Keyword(Keyword::Var),
            TokenKind::Identifier("i".to_owned()),
            TokenKind::Keyword(Keyword::In),
            TokenKind::Integer(1),
            TokenKind::Keyword(Keyword::To),
            TokenKind::Integer(10),
            TokenKind::RightParen,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
        ]);
        assert!(!diags.has_errors());
        let Stmt::ForIn { source: ForInSource::Range { .. }, .. } = stmt.kind else { panic!("expected range source") };
    }

    #[test]
    fn classic_for_loop_parses_all_three_clauses() {
        let (stmt, diags) = parse_stmt(vec![
            TokenKind::Keyword(Keyword::For),
            TokenKind::LeftParen,
            TokenKind::Keyword(Keyword::Var),
            TokenKind::Identifier("i".to_owned()),
            TokenKind::Operator(Op::Assign),
            TokenKind::Integer(0),
            TokenKind::Semicolon,
            TokenKind::Identifier("i".to_owned()),
            TokenKind::Operator(Op::Lt),
            TokenKind::Integer(10),
            TokenKind::Semicolon,
            TokenKind::Identifier("i".to_owned()),
            TokenKind::Operator(Op::PlusPlus),
            TokenKind::RightParen,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
        ]);
        assert!(!diags.has_errors());
        let Stmt::For { init: Some(_), condition: Some(_), increment: Some(_), .. } = stmt.kind else {
            panic!("expected all three for-clauses")
        };
    }

    #[test]
    fn switch_collects_cases_and_default() {
        let (stmt, diags) = parse_stmt(vec![
            TokenKind::Keyword(Keyword::Switch),
            TokenKind::LeftParen,
            TokenKind::Identifier("x".to_owned()),
            TokenKind::RightParen,
            TokenKind::LeftCurly,
            TokenKind::Keyword(Keyword::Case),
            TokenKind::Integer(1),
            TokenKind::PathSep(PathSep::Colon),
            TokenKind::Keyword(Keyword::Default),
            TokenKind::PathSep(PathSep::Colon),
            TokenKind::RightCurly,
        ]);
        assert!(!diags.has_errors());
        let Stmt::Switch { cases, default: Some(_), .. } = stmt.kind else { panic!("expected switch with default") };
        assert_eq!(cases.len(), 1);
    }
}
