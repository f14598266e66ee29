//! Bytecode emission: the reference/opcode catalog and the writer that
//! turns compiler calls into bytes (§3, §4.4, §6).

pub mod opcode;
pub mod reference;
pub mod writer;

pub use opcode::{ArgKind, Opcode, OpcodeMetadata};
pub use reference::{Reference, ReferenceType};
pub use writer::BytecodeWriter;
