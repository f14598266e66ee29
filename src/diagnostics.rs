//! Diagnostics sink shared by every compiler phase.
//!
//! Matches §7: a component holds a reference to a sink and pushes
//! `Diagnostic` values rather than returning `Result` for ordinary parse or
//! compile problems. `Result`-based errors (`ParseError`, `CompileError`,
//! `CoreError`) are reserved for the handful of conditions the core treats
//! as unrecoverable (the progress watchdog tripping, an internal bytecode
//! invariant violation).

use std::fmt;

use crate::location::SourceLocation;

/// Closed set of diagnostic kinds the core can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    ParseError,
    UnknownIdentifier,
    UnknownVariable,
    UnknownType,
    UnresolvedPath,
    UndefinedLabel,
    UnsupportedFeature,
    StackUnderflow,
    MaxDepthExceeded,
    InternalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// Halts emission of the current expression/statement; the containing
    /// proc/file keeps compiling.
    Error,
    /// Recorded; compilation proceeds as if nothing happened.
    Warning,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level} [{:?}] at {}: {}", self.kind, self.location, self.message)
    }
}

/// Collects diagnostics across every phase of one compilation.
///
/// A single `Diagnostics` instance is threaded by `&mut` reference through
/// the parser, `ConstantFolder`, `CodeTreeBuilder`, `ExpressionCompiler`, and
/// `StatementCompiler` for one file, giving callers one place to ask "did
/// this build fail" (`has_errors`) after the pipeline runs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, severity: Severity, location: SourceLocation, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            kind,
            severity,
            location,
            message: message.into(),
        });
    }

    pub fn error(&mut self, kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) {
        self.push(kind, Severity::Error, location, message);
    }

    pub fn warning(&mut self, kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) {
        self.push(kind, Severity::Warning, location, message);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }
}

/// Returned only when the parser's progress watchdog trips (§4.1): the
/// current token position failed to advance over `stall_limit` consecutive
/// iterations, which would otherwise loop forever on malformed input.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Returned only for an `InternalError`-severity condition: an unbound
/// label at `BytecodeWriter::finalize`, or an opcode encoding invariant
/// violated by the compiler itself (never by user input).
#[derive(Debug, Clone)]
pub struct CompileError {
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal compiler error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for CompileError {}

/// Top-level error union for the pipeline entry point.
#[derive(Debug, Clone)]
pub enum CoreError {
    Parse(ParseError),
    Compile(CompileError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Compile(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<ParseError> for CoreError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<CompileError> for CoreError {
    fn from(error: CompileError) -> Self {
        Self::Compile(error)
    }
}
