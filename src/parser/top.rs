//! Object-definition grammar: type blocks, var definitions/overrides, and
//! proc/verb definitions. DM flattens all three into one path-prefixed
//! statement form at file scope (`/mob/player/proc/Move(dir)`); this module
//! parses the path once and then splits it at the first `proc`/`verb`/`var`
//! segment to decide which leaf it's building.

use crate::{
    ast::top::{ObjectStmt, ObjectStmtNode, ParamDecl},
    location::SourceLocation,
    path::{Path, VarModifiers},
    token::{Keyword, Operator, TokenKind},
};

use super::Parser;

impl<'t> Parser<'t> {
    pub(super) fn parse_object_statement(&mut self) -> Option<ObjectStmtNode> {
        self.skip_newlines();
        if self.is_eof() {
            return None;
        }
        let location = self.current_location();
        if !matches!(self.kind(), TokenKind::PathSep(_) | TokenKind::Identifier(_) | TokenKind::Keyword(_)) {
            self.error("expected a type path, `var` declaration, or proc/verb definition");
            self.advance();
            return None;
        }
        let path = self.parse_type_path();
        Some(self.finish_path_statement(location, path))
    }

    /// `path` may be a plain type (`/mob/player`), a proc/verb definition
    /// flattened into its path (`/mob/player/proc/Move`), a var definition
    /// the same way (`/mob/player/var/const/health`), or — with no `proc`,
    /// `verb`, or `var` segment at all — a var override (`health = 100`)
    /// once an `=` follows. `wrap_in_owner` nests the leaf node under
    /// whatever prefix came before the split point; an empty relative
    /// prefix (the common in-block case, `var/health = 100`) is a no-op
    /// there, so this one function serves both file-scope and in-block
    /// statements without the caller needing to know which it's in.
    fn finish_path_statement(&mut self, location: SourceLocation, path: Path) -> ObjectStmtNode {
        if let Some(idx) = path.segments.iter().position(|s| s == "proc" || s == "verb") {
            let is_verb = path.segments[idx] == "verb";
            let owner = Path::new(path.root, path.segments[..idx].to_vec());
            let name = path.segments.get(idx + 1).cloned().unwrap_or_default();
            if name.is_empty() {
                self.error("expected a proc name after `proc`/`verb`");
            }
            let params = self.parse_param_list();
            let body = self.parse_block(|p| p.parse_proc_statement());
            let leaf = ObjectStmtNode::new(location, ObjectStmt::ProcDefinition { name, is_verb, is_final: false, params, body });
            return self.wrap_in_owner(owner, vec![leaf]);
        }

        if let Some(idx) = path.segments.iter().position(|s| s == "var") {
            let owner = Path::new(path.root, path.segments[..idx].to_vec());
            let mut rest = path.segments[idx + 1..].to_vec();
            if rest.is_empty() {
                self.error("expected a variable name after `var`");
                rest.push(String::new());
            }
            let name = rest.pop().expect("checked non-empty above");
            let prefix = Path::new(path.root, rest);
            let modifiers = VarModifiers::from_declarator_path(&prefix);
            let declarator = self.finish_declarator_tail(name, modifiers, location);
            self.end_statement();
            let leaf = ObjectStmtNode::new(location, ObjectStmt::VarDefinition(declarator));
            return self.wrap_in_owner(owner, vec![leaf]);
        }

        if self.eat_operator(Operator::Assign) {
            let owner = path.without_last_segment();
            let name = path.last_segment().unwrap_or_default().to_owned();
            let value = self.parse_expression();
            self.end_statement();
            let leaf = ObjectStmtNode::new(location, ObjectStmt::VarOverride { name, value });
            return self.wrap_in_owner(owner, vec![leaf]);
        }

        let body = if matches!(self.kind(), TokenKind::LeftCurly | TokenKind::Indent) {
            self.parse_block(|p| p.parse_object_statement())
        } else {
            self.end_statement();
            Vec::new()
        };
        ObjectStmtNode::new(location, ObjectStmt::Definition { path, body })
    }

    pub(super) fn parse_param_list(&mut self) -> Vec<ParamDecl> {
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let mut params = Vec::new();
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::RightParen) && !self.is_eof() {
            if !self.check_progress() {
                break;
            }
            params.push(self.parse_param());
            self.skip_newlines();
            if !self.eat_punct(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        params
    }

    /// Parameters share a declarator's shape (`atom/M`, `num/x = 5 as num`)
    /// without the `var` keyword in front, so this reuses the same
    /// path-plus-tail parsing `var` statements use.
    fn parse_param(&mut self) -> ParamDecl {
        let location = self.current_location();
        let declarator = self.parse_bare_declarator();
        ParamDecl {
            name: declarator.name,
            type_path: declarator.type_path,
            default: declarator.initializer,
            explicit_value_type: declarator.explicit_value_type,
            location,
        }
    }
}
