//! The opcode catalog: one byte per instruction, plus metadata describing
//! each opcode's operand shape for disassembly and verification (§6.2).

/// One bytecode instruction. Byte values are fixed by the external wire
/// format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    BitShiftLeft = 0x01,
    PushType = 0x02,
    PushString = 0x03,
    FormatString = 0x04,
    SwitchCaseRange = 0x05,
    PushReferenceValue = 0x06,
    Rgb = 0x07,
    Add = 0x08,
    Assign = 0x09,
    Call = 0x0A,
    MultiplyReference = 0x0B,
    JumpIfFalse = 0x0C,
    CompareEquals = 0x0F,
    Jump = 0x0E,
    PushNull = 0x11,
    Return = 0x10,
    Subtract = 0x12,
    CompareLessThan = 0x13,
    CompareGreaterThan = 0x14,
    BooleanAnd = 0x15,
    BooleanNot = 0x16,
    DivideReference = 0x17,
    Negate = 0x18,
    Modulus = 0x19,
    Append = 0x1A,
    CreateRangeEnumerator = 0x1B,
    CreateAssociativeList = 0x1E,
    CreateList = 0x22,
    Remove = 0x1F,
    DeleteObject = 0x20,
    CallStatement = 0x23,
    BitAnd = 0x24,
    CompareNotEquals = 0x25,
    Divide = 0x27,
    Multiply = 0x28,
    BitXorReference = 0x29,
    BitXor = 0x2A,
    BitOr = 0x2B,
    BitNot = 0x2C,
    Combine = 0x2D,
    CreateObject = 0x2E,
    BooleanOr = 0x2F,
    CompareGreaterThanOrEqual = 0x31,
    SwitchCase = 0x32,
    Mask = 0x33,
    IsInList = 0x36,
    PushFloat = 0x38,
    ModulusReference = 0x39,
    CreateListEnumerator = 0x3A,
    Enumerate = 0x3B,
    DestroyEnumerator = 0x3C,
    CompareLessThanOrEqual = 0x1D,
    Power = 0x42,
    CreateFilteredListEnumerator = 0x41,
    EnumerateAssoc = 0x43,
    Prompt = 0x45,
    LocateCoord = 0x4A,
    Locate = 0x4B,
    Spawn = 0x4D,
    IsType = 0x49,
    Prob = 0x52,
    Pop = 0x51,
    PickUnweighted = 0x54,
    Increment = 0x56,
    Decrement = 0x57,
    PushGlobalVars = 0x5F,
    BitShiftRight = 0x40,
    JumpIfTrueReference = 0x66,
    JumpIfFalseReference = 0x67,
    DereferenceField = 0x68,
    DereferenceIndex = 0x69,
    DereferenceCall = 0x6A,
    BitShiftLeftReference = 0x6D,
    BitShiftRightReference = 0x6E,
    EnumerateNoAssign = 0x72,
    AssignInto = 0x74,
    GetStep = 0x75,
    Length = 0x76,
    GetDir = 0x77,
    Sqrt = 0x80,
}

/// Operand kinds an instruction's trailing bytes can be decoded as; used
/// only by `OpcodeMetadata`, never consulted by `BytecodeWriter::emit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    TypeId,
    String,
    Label,
    Reference,
    StackDelta,
    ArgType,
    FormatCount,
    ListSize,
    Resource,
    ProcId,
    EnumeratorId,
    FilterId,
    PickCount,
    ConcatCount,
    Int,
    Float,
    None,
}

/// Documentation-only description of an opcode's stack effect and operand
/// shape. Not consulted during emission — `BytecodeWriter` callers already
/// know what they're writing; this exists for disassemblers and tests that
/// want to sanity-check stack balance.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeMetadata {
    pub opcode: Opcode,
    pub stack_delta: i32,
    pub args: [ArgKind; 2],
}

const fn meta(opcode: Opcode, stack_delta: i32, a: ArgKind, b: ArgKind) -> OpcodeMetadata {
    OpcodeMetadata { opcode, stack_delta, args: [a, b] }
}

/// The full opcode metadata table, keyed by declaration order (not by byte
/// value — use `Opcode::metadata` for lookup).
pub const OPCODE_TABLE: &[OpcodeMetadata] = &[
    meta(Opcode::Add, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Subtract, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Multiply, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Divide, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Modulus, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Power, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Negate, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::BitAnd, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BitOr, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BitXor, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BitNot, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::BitShiftLeft, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BitShiftRight, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareEquals, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareNotEquals, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareLessThan, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareGreaterThan, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareLessThanOrEqual, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CompareGreaterThanOrEqual, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BooleanAnd, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BooleanOr, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::BooleanNot, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::PushType, 1, ArgKind::TypeId, ArgKind::None),
    meta(Opcode::PushString, 1, ArgKind::String, ArgKind::None),
    meta(Opcode::PushFloat, 1, ArgKind::Float, ArgKind::None),
    meta(Opcode::PushNull, 1, ArgKind::None, ArgKind::None),
    meta(Opcode::PushReferenceValue, 1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::PushGlobalVars, 1, ArgKind::None, ArgKind::None),
    meta(Opcode::Pop, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Assign, 0, ArgKind::Reference, ArgKind::None),
    meta(Opcode::AssignInto, 0, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Append, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Remove, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::MultiplyReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::DivideReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::ModulusReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::BitXorReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Mask, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Combine, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::BitShiftLeftReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::BitShiftRightReference, -1, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Increment, 0, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Decrement, 0, ArgKind::Reference, ArgKind::None),
    meta(Opcode::Jump, 0, ArgKind::Label, ArgKind::None),
    meta(Opcode::JumpIfFalse, -1, ArgKind::Label, ArgKind::None),
    meta(Opcode::JumpIfTrueReference, 0, ArgKind::Reference, ArgKind::Label),
    meta(Opcode::JumpIfFalseReference, 0, ArgKind::Reference, ArgKind::Label),
    meta(Opcode::Return, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::Call, 0, ArgKind::Reference, ArgKind::ArgType),
    meta(Opcode::CallStatement, 0, ArgKind::ArgType, ArgKind::None),
    meta(Opcode::DereferenceCall, 0, ArgKind::String, ArgKind::ArgType),
    meta(Opcode::DereferenceField, 0, ArgKind::String, ArgKind::None),
    meta(Opcode::DereferenceIndex, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CreateList, 1, ArgKind::ListSize, ArgKind::None),
    meta(Opcode::CreateAssociativeList, 1, ArgKind::ListSize, ArgKind::None),
    meta(Opcode::CreateObject, 0, ArgKind::ArgType, ArgKind::None),
    meta(Opcode::DeleteObject, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::CreateListEnumerator, -1, ArgKind::EnumeratorId, ArgKind::None),
    meta(Opcode::CreateFilteredListEnumerator, -1, ArgKind::EnumeratorId, ArgKind::FilterId),
    meta(Opcode::CreateRangeEnumerator, -2, ArgKind::EnumeratorId, ArgKind::None),
    meta(Opcode::Enumerate, 0, ArgKind::EnumeratorId, ArgKind::Reference),
    meta(Opcode::EnumerateAssoc, 0, ArgKind::EnumeratorId, ArgKind::Reference),
    meta(Opcode::EnumerateNoAssign, 0, ArgKind::EnumeratorId, ArgKind::Label),
    meta(Opcode::DestroyEnumerator, 0, ArgKind::EnumeratorId, ArgKind::None),
    meta(Opcode::SwitchCase, -1, ArgKind::Label, ArgKind::None),
    meta(Opcode::SwitchCaseRange, -1, ArgKind::Label, ArgKind::None),
    meta(Opcode::Locate, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::LocateCoord, -2, ArgKind::None, ArgKind::None),
    meta(Opcode::GetDir, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::GetStep, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::Length, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::Sqrt, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::Prob, 0, ArgKind::None, ArgKind::None),
    meta(Opcode::PickUnweighted, 0, ArgKind::PickCount, ArgKind::None),
    meta(Opcode::IsType, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::IsInList, -1, ArgKind::None, ArgKind::None),
    meta(Opcode::FormatString, 1, ArgKind::String, ArgKind::FormatCount),
    meta(Opcode::Spawn, 0, ArgKind::Label, ArgKind::None),
    meta(Opcode::Prompt, 0, ArgKind::Int, ArgKind::None),
    meta(Opcode::Rgb, 0, ArgKind::ArgType, ArgKind::Int),
];

impl Opcode {
    #[must_use]
    pub fn metadata(self) -> OpcodeMetadata {
        OPCODE_TABLE
            .iter()
            .copied()
            .find(|m| m.opcode == self)
            .expect("every Opcode variant has a metadata row")
    }
}

/// Maps a source `BinaryOperator` to its bytecode opcode (§6.6). `In` is
/// handled separately by the expression compiler (it lowers to
/// `IsInList` only after both operands are staged).
#[must_use]
pub fn binary_operator_opcode(op: crate::ast::BinaryOperator) -> Option<Opcode> {
    use crate::ast::BinaryOperator as B;
    Some(match op {
        B::Add => Opcode::Add,
        B::Subtract => Opcode::Subtract,
        B::Multiply => Opcode::Multiply,
        B::Divide => Opcode::Divide,
        B::Modulo => Opcode::Modulus,
        B::Power => Opcode::Power,
        B::Equal => Opcode::CompareEquals,
        B::NotEqual => Opcode::CompareNotEquals,
        B::Less => Opcode::CompareLessThan,
        B::Greater => Opcode::CompareGreaterThan,
        B::LessOrEqual => Opcode::CompareLessThanOrEqual,
        B::GreaterOrEqual => Opcode::CompareGreaterThanOrEqual,
        B::LogicalAnd => Opcode::BooleanAnd,
        B::LogicalOr => Opcode::BooleanOr,
        B::BitwiseAnd => Opcode::BitAnd,
        B::BitwiseOr => Opcode::BitOr,
        B::BitwiseXor => Opcode::BitXor,
        B::LeftShift => Opcode::BitShiftLeft,
        B::RightShift => Opcode::BitShiftRight,
        B::In => Opcode::IsInList,
        B::Equivalent | B::NotEquivalent | B::To => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_match_external_contract() {
        assert_eq!(Opcode::Add as u8, 0x08);
        assert_eq!(Opcode::Subtract as u8, 0x12);
        assert_eq!(Opcode::Multiply as u8, 0x28);
        assert_eq!(Opcode::Sqrt as u8, 0x80);
        assert_eq!(Opcode::AssignInto as u8, 0x74);
        assert_eq!(Opcode::PushFloat as u8, 0x38);
    }

    #[test]
    fn every_variant_has_metadata() {
        assert_eq!(Opcode::Add.metadata().stack_delta, -1);
        assert_eq!(Opcode::PushType.metadata().stack_delta, 1);
    }

    #[test]
    fn binary_operator_maps_per_table() {
        assert_eq!(
            binary_operator_opcode(crate::ast::BinaryOperator::Modulo),
            Some(Opcode::Modulus)
        );
        assert_eq!(binary_operator_opcode(crate::ast::BinaryOperator::To), None);
    }
}
