//! The token alphabet the parser consumes (§6.1).
//!
//! The lexer and preprocessor that produce this stream are external
//! collaborators (§1) — this module only defines the shape the parser reads,
//! the way a parser crate built on a hand-rolled lexer still needs a `Token`
//! type even when the lexer itself lives elsewhere.

use crate::location::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Proc,
    Verb,
    If,
    Else,
    While,
    Do,
    For,
    In,
    To,
    Step,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Del,
    Spawn,
    Try,
    Catch,
    Throw,
    Set,
    New,
    As,
    Null,
    True,
    False,
}

/// Path-separator punctuation. Distinguished from `Operator` because the
/// parser treats `/` specially at the start of a primary expression (path
/// literal) versus mid-expression (division).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSep {
    Slash,
    Dot,
    Colon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    AndAndAssign,
    OrOrAssign,
    AssignInto,
    Question,
    AndAnd,
    OrOr,
    Pipe,
    Caret,
    Amp,
    EqEq,
    NotEq,
    TildeEq,
    TildeNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    Bang,
    Tilde,
    PlusPlus,
    MinusMinus,
    QuestionDot,
}

/// One part of a string literal with embedded `[expr]` interpolation. The
/// lexer tokenizes the inner expression inline; the parser re-enters
/// expression parsing over `tokens` when it sees an `Interpolation` part.
#[derive(Debug, Clone)]
pub enum StringPart {
    Literal(String),
    Interpolation(Vec<Token>),
}

#[derive(Debug, Clone)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(Vec<StringPart>),
    Resource(String),
    PathSep(PathSep),
    Operator(Operator),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftCurly,
    RightCurly,
    Comma,
    Semicolon,
    Newline,
    Indent,
    Dedent,
    EndOfFile,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfFile)
    }
}
