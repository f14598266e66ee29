//! Compile-time constants and the `ValueType` flag set used for `as` casts,
//! `set`-attribute hints, and DMStandard type annotations.

use bitflags::bitflags;

use crate::{intern::StringId, path::Path};

bitflags! {
    /// 32-bit type-flag bitset. Zero (`ANYTHING`) means unconstrained.
    ///
    /// Kept in sync with the original `DMValueType` bit layout so emitted
    /// `as` flags and `Prompt`'s type-flags operand remain byte-stable with
    /// a real DM toolchain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct ValueType: u32 {
        const ANYTHING = 0x0;
        const NULL = 0x1;
        const TEXT = 0x2;
        const OBJ = 0x4;
        const MOB = 0x8;
        const TURF = 0x10;
        const NUM = 0x20;
        const MESSAGE = 0x40;
        const AREA = 0x80;
        const COLOR = 0x100;
        const FILE = 0x200;
        const COMMAND_TEXT = 0x400;
        const SOUND = 0x800;
        const ICON = 0x1000;
        const PATH = 0x2000;

        const UNIMPLEMENTED = 0x4000;
        const COMPILETIME_READONLY = 0x8000;
        const NO_CONST_FOLD = 0x10000;
        const UNSUPPORTED = 0x20000;
    }
}

impl ValueType {
    /// Parses a `|`-separated `as` type-flag list (`"num|text"`) into a
    /// bitset. An empty or fully-unrecognized string yields `ANYTHING`,
    /// matching the original `ParseTypeFlags`.
    #[must_use]
    pub fn parse_as_flags(spec: &str) -> Self {
        let mut flags = Self::ANYTHING;
        for word in spec.split('|') {
            let flag = match word.trim() {
                "null" => Self::NULL,
                "text" => Self::TEXT,
                "obj" => Self::OBJ,
                "mob" => Self::MOB,
                "turf" => Self::TURF,
                "num" => Self::NUM,
                "message" => Self::MESSAGE,
                "area" => Self::AREA,
                "color" => Self::COLOR,
                "file" => Self::FILE,
                "command_text" => Self::COMMAND_TEXT,
                "sound" => Self::SOUND,
                "icon" => Self::ICON,
                "path" => Self::PATH,
                _ => continue,
            };
            flags |= flag;
        }
        flags
    }
}

/// A `ValueType` bitset optionally constrained to one type path.
///
/// Invariant: if `PATH` is set in `flags`, `constrained_path` must be
/// `Some`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ComplexValueType {
    pub flags: ValueType,
    pub constrained_path: Option<Path>,
}

impl ComplexValueType {
    #[must_use]
    pub fn anything() -> Self {
        Self {
            flags: ValueType::ANYTHING,
            constrained_path: None,
        }
    }

    #[must_use]
    pub fn with_path(flags: ValueType, path: Path) -> Self {
        Self {
            flags: flags | ValueType::PATH,
            constrained_path: Some(path),
        }
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.flags.contains(ValueType::PATH) || self.constrained_path.is_some()
    }
}

/// A compile-time constant, produced by constant folding or parsed directly
/// from a literal. `Constant` values back `LocalConstVariable`, the `const`
/// global/instance var initializers serialized via `try_as_json`, and
/// `ConstantFolder`'s rewrite targets.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Constant {
    Null,
    Integer(i64),
    Float(f64),
    String(StringId),
    Path(Path),
    Resource(StringId),
}

impl Constant {
    /// Truth value used for `&&`/`||` short-circuit folding and `if`
    /// constant-condition elimination. `null`, `0`, `0.0`, and the empty
    /// string are falsy; everything else (including any path or resource)
    /// is truthy, matching DM's general "zero/null is false" rule.
    #[must_use]
    pub fn truthiness(&self, strings: &crate::intern::StringTable) -> bool {
        match self {
            Self::Null => false,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(id) => !strings.get(*id).is_empty(),
            Self::Path(_) | Self::Resource(_) => true,
        }
    }

    /// Serializes the constant to a JSON value for the object-tree artifact
    /// (§6.5's `try_as_json`). Only constant expressions support this; the
    /// AST-level capability this backs fails for everything else.
    #[must_use]
    pub fn to_json(&self, strings: &crate::intern::StringTable) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::json!(*i),
            Self::Float(f) => serde_json::json!(*f),
            Self::String(id) => serde_json::Value::String(strings.get(*id).to_owned()),
            Self::Path(path) => serde_json::json!({ "type": "path", "value": path.to_string() }),
            Self::Resource(id) => serde_json::json!({ "type": "resource", "value": strings.get(*id) }),
        }
    }

    #[must_use]
    pub fn negate(&self) -> Option<Self> {
        match self {
            Self::Integer(i) => Some(Self::Integer(-i)),
            Self::Float(f) => Some(Self::Float(-f)),
            _ => None,
        }
    }

    #[must_use]
    pub fn logical_not(&self, strings: &crate::intern::StringTable) -> Self {
        Self::Integer(i64::from(!self.truthiness(strings)))
    }
}
