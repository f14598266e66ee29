//! Source locations attached to AST nodes and emitted bytecode.

use std::fmt;

use crate::intern::StringId;

/// A position in a source file, attached to every AST node and to every
/// emitted jump/label for diagnostics.
///
/// `in_standard_library` lets later passes distinguish code coming from a
/// bundled prelude from user code without threading a second parameter
/// through every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: StringId,
    pub line: u32,
    pub column: u32,
    pub in_standard_library: bool,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: StringId, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            in_standard_library: false,
        }
    }

    /// A placeholder location for internally synthesized nodes (e.g. the
    /// implicit `return` a proc gets appended when it falls off the end).
    #[must_use]
    pub fn synthetic() -> Self {
        Self {
            file: StringId::from_index(0),
            line: 0,
            column: 0,
            in_standard_library: false,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
