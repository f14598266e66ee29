//! `Reference` — the unit addressed by bytecode reads/writes (§3).
//!
//! A `Reference` is a 1–5 byte payload written directly into bytecode by
//! `BytecodeWriter::write_reference`, not a runtime handle (§9): there is no
//! pointer fix-up, just bytes.

use crate::intern::StringId;

/// The reference-type tag byte. Values match the original DM toolchain's
/// `DMReference::Type` enum so emitted bytecode stays byte-stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum ReferenceType {
    NoRef = 0,
    Src = 1,
    SelfRef = 2,
    Usr = 3,
    Args = 4,
    World = 5,
    ListIndex = 6,
    SuperProc = 7,
    Argument = 8,
    Local = 9,
    Global = 10,
    GlobalProc = 11,
    Field = 13,
    SrcField = 12,
    SrcProc = 14,
    Callee = 15,
    Caller = 16,
    Invalid = 17,
}

/// A tagged lvalue that bytecode reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Reads null; writes are a no-op.
    NoRef,
    /// The implicit receiver.
    Src,
    /// The proc's implicit return slot (`.`).
    SelfRef,
    /// The calling user context.
    Usr,
    /// The arguments list.
    Args,
    /// The world singleton.
    World,
    /// Index reads the two stack operands (list, key); carries no payload
    /// of its own.
    ListIndex,
    /// `..()` dispatch target.
    SuperProc,
    /// A positional argument, by dense id (fits in one byte, 0–255).
    Argument(u8),
    /// A local variable, by dense id (fits in one byte, 0–255).
    Local(u8),
    /// A global variable, by index.
    Global(i32),
    /// A global proc, by id.
    GlobalProc(i32),
    /// A field on the implicit `src`.
    SrcField(StringId),
    /// A field on the value at the top of the stack.
    Field(StringId),
    /// A method on `src`, by name.
    SrcProc(StringId),
    Callee,
    Caller,
    /// Something went wrong constructing this reference; a diagnostic must
    /// already have been raised before producing it.
    Invalid,
}

impl Reference {
    #[must_use]
    pub fn tag(self) -> ReferenceType {
        match self {
            Self::NoRef => ReferenceType::NoRef,
            Self::Src => ReferenceType::Src,
            Self::SelfRef => ReferenceType::SelfRef,
            Self::Usr => ReferenceType::Usr,
            Self::Args => ReferenceType::Args,
            Self::World => ReferenceType::World,
            Self::ListIndex => ReferenceType::ListIndex,
            Self::SuperProc => ReferenceType::SuperProc,
            Self::Argument(_) => ReferenceType::Argument,
            Self::Local(_) => ReferenceType::Local,
            Self::Global(_) => ReferenceType::Global,
            Self::GlobalProc(_) => ReferenceType::GlobalProc,
            Self::SrcField(_) => ReferenceType::SrcField,
            Self::Field(_) => ReferenceType::Field,
            Self::SrcProc(_) => ReferenceType::SrcProc,
            Self::Callee => ReferenceType::Callee,
            Self::Caller => ReferenceType::Caller,
            Self::Invalid => ReferenceType::Invalid,
        }
    }

    /// Constructs an `Argument` reference, enforcing the one-byte id
    /// invariant from the data model.
    ///
    /// # Panics
    /// Panics if `arg_id` exceeds 255; callers mint argument ids from a
    /// per-proc dense counter that can never do this in practice.
    #[must_use]
    pub fn argument(arg_id: usize) -> Self {
        Self::Argument(u8::try_from(arg_id).expect("argument id exceeds 255"))
    }

    /// Constructs a `Local` reference, enforcing the one-byte id invariant.
    ///
    /// # Panics
    /// Panics if `local_id` exceeds 255.
    #[must_use]
    pub fn local(local_id: usize) -> Self {
        Self::Local(u8::try_from(local_id).expect("local id exceeds 255"))
    }
}
