//! `BytecodeWriter` exercised through the public crate boundary: label
//! patching, reference encoding, and stack-depth tracking across a small
//! hand-assembled program shaped like a compiled `if` statement.

use dreamc::bytecode::{BytecodeWriter, Opcode, Reference};
use dreamc::location::SourceLocation;

fn loc() -> SourceLocation {
    SourceLocation::synthetic()
}

#[test]
fn backward_jump_patches_to_an_earlier_offset() {
    let mut w = BytecodeWriter::new();
    let top = w.create_label();
    w.mark_label(top);
    w.emit(Opcode::PushNull);
    w.emit_jump(Opcode::Jump, top, loc());
    let code = w.finalize().unwrap();

    // Jump at offset 1, 4-byte operand at 2..6, patch_site = 2, target = 0.
    let offset = i32::from_le_bytes([code[2], code[3], code[4], code[5]]);
    assert_eq!(offset, 0 - (2 + 4));
}

#[test]
fn compiled_if_shape_balances_stack_across_both_branches() {
    // if (cond) { push 1 } else { push 2 }; both arms leave one value.
    let mut w = BytecodeWriter::new();
    w.resize_stack(1); // condition already on the stack
    let else_label = w.create_label();
    let end_label = w.create_label();
    w.emit_jump(Opcode::JumpIfFalse, else_label, loc());
    w.resize_stack(-1); // JumpIfFalse consumes the condition
    w.emit_float(Opcode::PushFloat, 1.0);
    w.resize_stack(1);
    w.emit_jump(Opcode::Jump, end_label, loc());
    w.mark_label(else_label);
    w.emit_float(Opcode::PushFloat, 2.0);
    w.resize_stack(1);
    w.mark_label(end_label);

    let max_stack = w.max_stack();
    let code = w.finalize().unwrap();
    assert_eq!(max_stack, 1);
    // Both arms push exactly one float; the else arm's PushFloat is the
    // last 5 bytes of the stream (opcode + 4-byte f32).
    assert_eq!(code[code.len() - 5], Opcode::PushFloat as u8);
}

#[test]
fn field_reference_payload_carries_a_string_id() {
    let mut w = BytecodeWriter::new();
    w.write_reference(Reference::Field(dreamc::intern::StringId::from_index(7)));
    let code = w.finalize().unwrap();
    assert_eq!(code.len(), 5);
    let payload = u32::from_le_bytes([code[1], code[2], code[3], code[4]]);
    assert_eq!(payload, 7);
}

#[test]
fn zero_byte_references_write_only_the_tag() {
    let mut w = BytecodeWriter::new();
    w.write_reference(Reference::Src);
    w.write_reference(Reference::Usr);
    let code = w.finalize().unwrap();
    assert_eq!(code.len(), 2);
}
