//! Hand-rolled recursive-descent parser producing a `File` from a token
//! stream (§4.1). Nothing downstream of this module is fed by a borrowed
//! third-party grammar — the token alphabet in `token.rs` is this crate's
//! own, and so is every production below it.
//!
//! Laid out the way the reference implementation's single `DMParser` class
//! is laid out, just split across files by concern instead of by access
//! specifier: `top` parses object/var/proc definitions, `stmt` parses proc
//! statements, `expr` parses expressions precedence level by precedence
//! level, and this module holds the token-stream primitives (`advance`,
//! `check`, `expect`, block parsing) every one of them is built on.

pub mod recursion;
mod expr;
mod stmt;
mod top;

use crate::{
    ast::top::File,
    diagnostics::{DiagnosticKind, Diagnostics, ParseError},
    location::SourceLocation,
    path::{Path, PathRoot},
    settings::CompilerSettings,
    token::{Keyword, Operator, PathSep, Token, TokenKind},
    value::{ComplexValueType, ValueType},
};

use recursion::{DepthBudget, Watchdog};

/// Parses `tokens` into a `File`. Ordinary grammar problems are recorded on
/// `diagnostics` and recovered from; the `Err` path is reserved for the
/// progress watchdog tripping (§4.1, §5), which aborts the whole parse
/// rather than limp along on input that never advances.
pub fn parse(tokens: Vec<Token>, diagnostics: &mut Diagnostics, settings: &CompilerSettings) -> Result<File, ParseError> {
    Parser::new(tokens, diagnostics, settings).parse_file()
}

pub struct Parser<'t> {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: &'t mut Diagnostics,
    settings: &'t CompilerSettings,
    depth: DepthBudget,
    watchdog: Watchdog,
    aborted: bool,
}

impl<'t> Parser<'t> {
    #[must_use]
    pub fn new(tokens: Vec<Token>, diagnostics: &'t mut Diagnostics, settings: &'t CompilerSettings) -> Self {
        let watchdog = Watchdog::new(settings.watchdog_stall_limit);
        Self {
            tokens,
            pos: 0,
            diagnostics,
            settings,
            depth: DepthBudget::new(),
            watchdog,
            aborted: false,
        }
    }

    /// Builds a sub-parser over an already-lexed token slice, for re-entering
    /// expression parsing inside a string's `[...]` interpolation piece.
    fn from_tokens(mut tokens: Vec<Token>, diagnostics: &'t mut Diagnostics, settings: &'t CompilerSettings) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::EndOfFile)) {
            let location = tokens.last().map_or_else(SourceLocation::synthetic, |t| t.location);
            tokens.push(Token::new(TokenKind::EndOfFile, location));
        }
        Self::new(tokens, diagnostics, settings)
    }

    pub fn parse_file(mut self) -> Result<File, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_statement_terminators();
            if self.is_eof() {
                break;
            }
            if !self.check_progress() {
                break;
            }
            match self.parse_object_statement() {
                Some(stmt) => statements.push(stmt),
                None => {
                    if self.aborted {
                        break;
                    }
                    self.recover_to_next_statement();
                }
            }
        }
        if self.aborted {
            return Err(ParseError {
                location: self.current_location(),
                message: "parser made no progress over too many iterations; aborting".to_owned(),
            });
        }
        Ok(File { statements })
    }

    // ---- token-stream primitives shared by expr/stmt/top ----

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().expect("token stream is never empty"))
    }

    fn current_location(&self) -> SourceLocation {
        self.current().location
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn is_eof(&self) -> bool {
        self.current().is_eof()
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn check_operator(&self, op: Operator) -> bool {
        matches!(self.kind(), TokenKind::Operator(o) if *o == op)
    }

    fn check_path_sep(&self, p: PathSep) -> bool {
        matches!(self.kind(), TokenKind::PathSep(s) if *s == p)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if self.check_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_path_sep(&mut self, p: PathSep) -> bool {
        if self.check_path_sep(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, pred: impl Fn(&TokenKind) -> bool) -> bool {
        if pred(self.kind()) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, pred: impl Fn(&TokenKind) -> bool, what: &str) {
        if !self.eat_punct(pred) {
            self.error(format!("expected {what}"));
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, what: &str) {
        if !self.eat_keyword(kw) {
            self.error(format!("expected {what}"));
        }
    }

    fn expect_operator(&mut self, op: Operator, what: &str) {
        if !self.eat_operator(op) {
            self.error(format!("expected {what}"));
        }
    }

    fn expect_path_sep(&mut self, p: PathSep, what: &str) {
        if !self.eat_path_sep(p) {
            self.error(format!("expected {what}"));
        }
    }

    /// Consumes an `Identifier`, or the literal text of a `Keyword` used as
    /// a field/proc/label name outside expression position — DM reserves
    /// words like `New` that still show up as ordinary member names.
    fn expect_identifier_like(&mut self, what: &str) -> String {
        match self.kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                name
            }
            TokenKind::Keyword(kw) => {
                self.advance();
                keyword_text(kw).to_owned()
            }
            _ => {
                self.error(format!("expected {what}"));
                String::new()
            }
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.current_location();
        self.diagnostics.error(DiagnosticKind::ParseError, location, message);
    }

    fn skip_newlines(&mut self) {
        while matches!(self.kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_statement_terminators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RightCurly | TokenKind::Dedent | TokenKind::EndOfFile
        )
    }

    /// Consumes the statement terminator (`;`/newline) if present; anything
    /// else before a block closer is a diagnosed but non-fatal mismatch, the
    /// same shape as `RecoverFromError` in the grammar this is grounded on.
    fn end_statement(&mut self) {
        if matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        } else if !matches!(self.kind(), TokenKind::RightCurly | TokenKind::Dedent) && !self.is_eof() {
            self.error("expected end of statement");
        }
        self.skip_statement_terminators();
    }

    /// Skips to the next statement boundary (newline at baseline, `;`, or a
    /// block closer) after a production fails to parse, so one malformed
    /// statement doesn't take the rest of the block down with it.
    fn recover_to_next_statement(&mut self) {
        while !self.is_eof()
            && !matches!(
                self.kind(),
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Dedent | TokenKind::RightCurly
            )
        {
            self.advance();
        }
        self.skip_statement_terminators();
    }

    fn check_progress(&mut self) -> bool {
        if self.aborted {
            return false;
        }
        let location = self.current_location();
        let position = u64::from(location.line) * 10_000 + u64::from(location.column);
        if self.watchdog.check(position) {
            true
        } else {
            self.aborted = true;
            self.diagnostics.error(DiagnosticKind::MaxDepthExceeded, location, "parser made no progress; aborting");
            false
        }
    }

    /// Parses one of DM's three interchangeable block forms: `{ stmt* }`, an
    /// indented block, or (when neither opener is present) a single trailing
    /// statement — `if(x) return` with no braces at all.
    fn parse_block<T>(&mut self, mut parse_one: impl FnMut(&mut Self) -> Option<T>) -> Vec<T> {
        self.skip_newlines();
        let (opened, closer): (bool, fn(&TokenKind) -> bool) = if self.eat_punct(|k| matches!(k, TokenKind::LeftCurly)) {
            (true, |k| matches!(k, TokenKind::RightCurly))
        } else if self.eat_punct(|k| matches!(k, TokenKind::Indent)) {
            (true, |k| matches!(k, TokenKind::Dedent))
        } else {
            (false, |_| false)
        };
        if !opened {
            return match parse_one(self) {
                Some(item) => vec![item],
                None => Vec::new(),
            };
        }
        let mut items = Vec::new();
        loop {
            self.skip_statement_terminators();
            if self.aborted || self.is_eof() || self.eat_punct(closer) {
                break;
            }
            if !self.check_progress() {
                break;
            }
            match parse_one(self) {
                Some(item) => items.push(item),
                None => {
                    if !self.aborted {
                        self.recover_to_next_statement();
                    }
                }
            }
        }
        items
    }

    /// Wraps `body` in a `Definition` targeting `owner`, the shape
    /// `CodeTreeBuilder` expects every proc/var leaf to arrive nested in
    /// since `ObjectStmt`'s leaf variants carry no path of their own.
    fn wrap_in_owner(&self, owner: Path, body: Vec<crate::ast::top::ObjectStmtNode>) -> crate::ast::top::ObjectStmtNode {
        let location = body.first().map_or_else(SourceLocation::synthetic, |n| n.location);
        crate::ast::top::ObjectStmtNode::new(location, crate::ast::top::ObjectStmt::Definition { path: owner, body })
    }

    /// Reads a `/`- or `.`-prefixed path: zero or more `/segment` pairs
    /// after an optional leading anchor (`/` absolute, `.` relative, `..`
    /// upward). Stops at the first token that isn't a path segment, leaving
    /// the caller's position right after the last consumed identifier.
    fn parse_type_path(&mut self) -> Path {
        let root = if self.eat_path_sep(PathSep::Slash) {
            PathRoot::Absolute
        } else {
            let mut dots = 0;
            while self.eat_path_sep(PathSep::Dot) {
                dots += 1;
            }
            if dots >= 2 {
                PathRoot::UpwardSearch
            } else {
                PathRoot::Relative
            }
        };
        let mut segments = Vec::new();
        loop {
            match self.kind().clone() {
                TokenKind::Identifier(name) => {
                    segments.push(name);
                    self.advance();
                }
                TokenKind::Keyword(kw) => {
                    segments.push(keyword_text(kw).to_owned());
                    self.advance();
                }
                _ => break,
            }
            if !self.eat_path_sep(PathSep::Slash) {
                break;
            }
        }
        Path::new(root, segments)
    }

    /// Parses an `as` type-flag clause: `num`, `num|text`, `/mob`, or any of
    /// those wrapped in parens (`as(num|text)`), used by both proc
    /// parameters and `input()` expressions (§4.1's `input()` type hints).
    fn parse_as_type_clause(&mut self) -> ComplexValueType {
        let parenthesized = self.eat_punct(|k| matches!(k, TokenKind::LeftParen));
        let mut flags = ValueType::ANYTHING;
        let mut constrained_path = None;
        loop {
            match self.kind() {
                TokenKind::Identifier(word) => {
                    flags |= ValueType::parse_as_flags(word);
                    self.advance();
                }
                TokenKind::PathSep(PathSep::Slash) => {
                    constrained_path = Some(self.parse_type_path());
                    flags |= ValueType::PATH;
                }
                _ => break,
            }
            if !self.eat_operator(Operator::Pipe) {
                break;
            }
        }
        if parenthesized {
            self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        }
        if flags.contains(ValueType::PATH) && constrained_path.is_none() {
            constrained_path = Some(Path::root());
        }
        ComplexValueType { flags, constrained_path }
    }
}

/// The literal text of a reserved word, for the cases DM lets a keyword
/// double as a path segment or member name (`var/New`, `obj.New()`).
fn keyword_text(kw: Keyword) -> &'static str {
    match kw {
        Keyword::Var => "var",
        Keyword::Proc => "proc",
        Keyword::Verb => "verb",
        Keyword::If => "if",
        Keyword::Else => "else",
        Keyword::While => "while",
        Keyword::Do => "do",
        Keyword::For => "for",
        Keyword::In => "in",
        Keyword::To => "to",
        Keyword::Step => "step",
        Keyword::Switch => "switch",
        Keyword::Case => "case",
        Keyword::Default => "default",
        Keyword::Break => "break",
        Keyword::Continue => "continue",
        Keyword::Return => "return",
        Keyword::Goto => "goto",
        Keyword::Del => "del",
        Keyword::Spawn => "spawn",
        Keyword::Try => "try",
        Keyword::Catch => "catch",
        Keyword::Throw => "throw",
        Keyword::Set => "set",
        Keyword::New => "New",
        Keyword::As => "as",
        Keyword::Null => "null",
        Keyword::True => "TRUE",
        Keyword::False => "FALSE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Keyword as Kw, TokenKind as TK};

    fn loc() -> SourceLocation {
        SourceLocation::synthetic()
    }

    fn toks(kinds: Vec<TK>) -> Vec<Token> {
        let mut tokens: Vec<Token> = kinds.into_iter().map(|k| Token::new(k, loc())).collect();
        tokens.push(Token::new(TK::EndOfFile, loc()));
        tokens
    }

    #[test]
    fn parses_absolute_type_path() {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let mut parser = Parser::new(
            toks(vec![
                TK::PathSep(PathSep::Slash),
                TK::Identifier("mob".to_owned()),
                TK::PathSep(PathSep::Slash),
                TK::Identifier("player".to_owned()),
            ]),
            &mut diags,
            &settings,
        );
        let path = parser.parse_type_path();
        assert_eq!(path.root, PathRoot::Absolute);
        assert_eq!(path.segments, vec!["mob", "player"]);
    }

    #[test]
    fn parses_upward_search_path() {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let mut parser = Parser::new(
            toks(vec![
                TK::PathSep(PathSep::Dot),
                TK::PathSep(PathSep::Dot),
                TK::Identifier("x".to_owned()),
            ]),
            &mut diags,
            &settings,
        );
        let path = parser.parse_type_path();
        assert_eq!(path.root, PathRoot::UpwardSearch);
        assert_eq!(path.segments, vec!["x"]);
    }

    #[test]
    fn keyword_can_appear_as_path_segment() {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let mut parser = Parser::new(
            toks(vec![TK::PathSep(PathSep::Slash), TK::Keyword(Kw::New)]),
            &mut diags,
            &settings,
        );
        let path = parser.parse_type_path();
        assert_eq!(path.segments, vec!["New"]);
    }

    #[test]
    fn empty_file_parses_to_no_statements() {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let file = parse(toks(vec![]), &mut diags, &settings).unwrap();
        assert!(file.statements.is_empty());
        assert!(!diags.has_errors());
    }
}
