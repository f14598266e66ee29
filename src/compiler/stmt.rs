//! `StatementCompiler` — lowers one proc body to bytecode (§4.6).
//!
//! Owns the per-proc `LoopStack` (break/continue targets) and the named-
//! label table; `goto` to a label not yet seen mints its jump target eagerly
//! and resolves it once the matching `Label` statement is reached, the same
//! forward-reference trick `BytecodeWriter::finalize` already relies on for
//! ordinary jumps.

use ahash::AHashMap;

use crate::{
    ast::{
        AssignmentOperator, CaseValue, Declarator, Expr, ExprNode, ForInSource, Stmt, StmtNode,
    },
    bytecode::{Opcode, Reference},
    compiler::{expr::ExpressionCompiler, CompileCtx, LValueKind},
    diagnostics::{CompileError, DiagnosticKind},
    object_tree::{DMProc, LocalConstVariable, LocalVariable, ObjectId},
    path::VarModifierFlags,
};

struct LoopFrame {
    break_label: u32,
    continue_label: u32,
    name: Option<String>,
}

pub struct StatementCompiler<'c, 't, 'ast> {
    pub expr: ExpressionCompiler<'c, 't, 'ast>,
    labels: AHashMap<String, u32>,
    loop_stack: Vec<LoopFrame>,
}

impl<'c, 't, 'ast> StatementCompiler<'c, 't, 'ast> {
    pub fn new(ctx: &'c mut CompileCtx<'t>, writer: &'c mut crate::bytecode::BytecodeWriter, owner: ObjectId) -> Self {
        Self {
            expr: ExpressionCompiler { ctx, writer, owner, _ast: std::marker::PhantomData },
            labels: AHashMap::new(),
            loop_stack: Vec::new(),
        }
    }

    /// Compiles `proc`'s body and returns the finished bytecode.
    ///
    /// # Errors
    /// Propagates `BytecodeWriter::finalize`'s error for an unbound label —
    /// only reachable if a `goto` target named in source was never declared
    /// and the code-tree builder failed to catch it first.
    pub fn compile_proc(ctx: &mut CompileCtx<'t>, proc: &mut DMProc<'ast>) -> Result<(Vec<u8>, i32), CompileError> {
        let mut writer = crate::bytecode::BytecodeWriter::new();
        let body = proc.body;
        {
            let mut compiler = StatementCompiler::new(ctx, &mut writer, proc.owner);
            compiler.compile_block(proc, body);
            compiler.emit_implicit_return();
        }
        let max_stack = writer.max_stack();
        writer.finalize().map(|bytecode| (bytecode, max_stack))
    }

    fn emit_implicit_return(&mut self) {
        self.expr.writer.emit(Opcode::PushNull);
        self.expr.writer.resize_stack(1);
        self.expr.writer.emit(Opcode::Return);
    }

    fn label_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.labels.get(name) {
            return id;
        }
        let id = self.expr.writer.create_label();
        self.labels.insert(name.to_string(), id);
        id
    }

    pub fn compile_block(&mut self, proc: &mut DMProc<'ast>, body: &[StmtNode]) {
        for stmt in body {
            self.compile_stmt(proc, stmt);
        }
    }

    fn compile_stmt(&mut self, proc: &mut DMProc<'ast>, stmt: &StmtNode) {
        match &stmt.kind {
            Stmt::Expression(e) => {
                self.expr.compile(proc, e);
                self.expr.writer.emit(Opcode::Pop);
                self.expr.writer.resize_stack(-1);
            }
            Stmt::VarDeclaration(declarators) => self.compile_var_declaration(proc, declarators),
            Stmt::Return(value) => {
                match value {
                    Some(e) => self.expr.compile(proc, e),
                    None => {
                        self.expr.writer.emit(Opcode::PushNull);
                        self.expr.writer.resize_stack(1);
                    }
                }
                self.expr.writer.emit(Opcode::Return);
            }
            Stmt::If { condition, then_body, else_body } => self.compile_if(proc, condition, then_body, else_body.as_deref()),
            Stmt::While { condition, body } => self.compile_while(proc, condition, body),
            Stmt::DoWhile { body, condition } => self.compile_do_while(proc, body, condition),
            Stmt::For { init, condition, increment, body } => {
                self.compile_c_for(proc, init.as_deref(), condition.as_ref(), increment.as_ref(), body);
            }
            Stmt::ForRange { var_decl, low, high, step, body } => {
                self.compile_for_range(proc, &var_decl.name, low, high, step.as_ref(), body);
            }
            Stmt::ForIn { var_decl, source, body } => self.compile_for_in(proc, &var_decl.name, source, body),
            Stmt::Switch { scrutinee, cases, default } => self.compile_switch(proc, scrutinee, cases, default.as_deref()),
            Stmt::Break => self.compile_break(stmt.location),
            Stmt::Continue => self.compile_continue(stmt.location),
            Stmt::Label(name) => {
                let id = self.label_id(name);
                self.expr.writer.mark_label(id);
            }
            Stmt::Goto(name) => {
                let id = self.label_id(name);
                self.expr.writer.emit_jump(Opcode::Jump, id, stmt.location);
            }
            Stmt::Del(e) => {
                self.expr.compile(proc, e);
                self.expr.writer.emit(Opcode::DeleteObject);
                self.expr.writer.resize_stack(-1);
            }
            Stmt::Spawn { delay, body } => self.compile_spawn(proc, delay.as_ref(), body, stmt.location),
            Stmt::Try { body, catch_var, catch_body } => self.compile_try(proc, body, catch_var.as_ref(), catch_body, stmt.location),
            Stmt::Throw(e) => {
                self.expr.ctx.diagnostics.warning(
                    DiagnosticKind::UnsupportedFeature,
                    stmt.location,
                    "'throw' is not lowered at the present development level and has been skipped",
                );
                self.expr.compile(proc, e);
                self.expr.writer.emit(Opcode::Pop);
                self.expr.writer.resize_stack(-1);
            }
            Stmt::Set { name, value } => self.compile_set(proc, name, value),
        }
    }

    fn compile_var_declaration(&mut self, proc: &mut DMProc<'ast>, declarators: &[Declarator]) {
        for declarator in declarators {
            if declarator.modifiers.contains(VarModifierFlags::CONST) {
                let Some(init) = &declarator.initializer else {
                    self.expr.ctx.diagnostics.error(
                        DiagnosticKind::ParseError,
                        declarator.location,
                        format!("local constant '{}' has no initializer", declarator.name),
                    );
                    continue;
                };
                let Some(value) = init.try_as_constant() else {
                    self.expr.ctx.diagnostics.error(
                        DiagnosticKind::ParseError,
                        declarator.location,
                        format!("local constant '{}' initializer is not a compile-time constant", declarator.name),
                    );
                    continue;
                };
                let base = LocalVariable {
                    name: declarator.name.clone(),
                    id: 0,
                    is_parameter: false,
                    type_path: declarator.type_path.clone(),
                    explicit_value_type: declarator.explicit_value_type.clone(),
                };
                proc.local_consts.insert(declarator.name.clone(), LocalConstVariable { base, value });
                continue;
            }
            let next_id = next_local_id(proc);
            let local = LocalVariable {
                name: declarator.name.clone(),
                id: next_id,
                is_parameter: false,
                type_path: declarator.type_path.clone(),
                explicit_value_type: declarator.explicit_value_type.clone(),
            };
            if let Err(count) = proc.register_local(local) {
                self.expr.ctx.diagnostics.error(
                    DiagnosticKind::InternalError,
                    declarator.location,
                    format!("proc exceeds the {count}-local limit"),
                );
                continue;
            }
            match &declarator.initializer {
                Some(init) => self.expr.compile(proc, init),
                None => {
                    self.expr.writer.emit(Opcode::PushNull);
                    self.expr.writer.resize_stack(1);
                }
            }
            let local_id = proc.locals[&declarator.name].id;
            self.expr.writer.emit(Opcode::Assign);
            self.expr.writer.write_reference(Reference::Local(local_id));
            self.expr.writer.emit(Opcode::Pop);
            self.expr.writer.resize_stack(-1);
        }
    }

    fn compile_if(&mut self, proc: &mut DMProc<'ast>, condition: &ExprNode, then_body: &[StmtNode], else_body: Option<&[StmtNode]>) {
        let else_label = self.expr.writer.create_label();
        let end_label = self.expr.writer.create_label();
        self.expr.compile(proc, condition);
        self.expr.writer.emit_jump(Opcode::JumpIfFalse, else_label, condition.location);
        self.expr.writer.resize_stack(-1);
        self.compile_block(proc, then_body);
        self.expr.writer.emit_jump(Opcode::Jump, end_label, condition.location);
        self.expr.writer.mark_label(else_label);
        if let Some(else_body) = else_body {
            self.compile_block(proc, else_body);
        }
        self.expr.writer.mark_label(end_label);
    }

    fn compile_while(&mut self, proc: &mut DMProc<'ast>, condition: &ExprNode, body: &[StmtNode]) {
        let start_label = self.expr.writer.create_label();
        let end_label = self.expr.writer.create_label();
        self.expr.writer.mark_label(start_label);
        self.expr.compile(proc, condition);
        self.expr.writer.emit_jump(Opcode::JumpIfFalse, end_label, condition.location);
        self.expr.writer.resize_stack(-1);
        self.loop_stack.push(LoopFrame { break_label: end_label, continue_label: start_label, name: None });
        self.compile_block(proc, body);
        self.loop_stack.pop();
        self.expr.writer.emit_jump(Opcode::Jump, start_label, condition.location);
        self.expr.writer.mark_label(end_label);
    }

    fn compile_do_while(&mut self, proc: &mut DMProc<'ast>, body: &[StmtNode], condition: &ExprNode) {
        let start_label = self.expr.writer.create_label();
        let continue_label = self.expr.writer.create_label();
        let end_label = self.expr.writer.create_label();
        self.expr.writer.mark_label(start_label);
        self.loop_stack.push(LoopFrame { break_label: end_label, continue_label, name: None });
        self.compile_block(proc, body);
        self.loop_stack.pop();
        self.expr.writer.mark_label(continue_label);
        self.expr.compile(proc, condition);
        self.expr.writer.emit_jump(Opcode::JumpIfFalse, end_label, condition.location);
        self.expr.writer.resize_stack(-1);
        self.expr.writer.emit_jump(Opcode::Jump, start_label, condition.location);
        self.expr.writer.mark_label(end_label);
    }

    fn compile_c_for(
        &mut self,
        proc: &mut DMProc<'ast>,
        init: Option<&StmtNode>,
        condition: Option<&ExprNode>,
        increment: Option<&ExprNode>,
        body: &[StmtNode],
    ) {
        if let Some(init) = init {
            self.compile_stmt(proc, init);
        }
        let start_label = self.expr.writer.create_label();
        let continue_label = self.expr.writer.create_label();
        let end_label = self.expr.writer.create_label();
        self.expr.writer.mark_label(start_label);
        if let Some(condition) = condition {
            self.expr.compile(proc, condition);
            self.expr.writer.emit_jump(Opcode::JumpIfFalse, end_label, condition.location);
            self.expr.writer.resize_stack(-1);
        }
        self.loop_stack.push(LoopFrame { break_label: end_label, continue_label, name: None });
        self.compile_block(proc, body);
        self.loop_stack.pop();
        self.expr.writer.mark_label(continue_label);
        if let Some(increment) = increment {
            self.expr.compile(proc, increment);
            self.expr.writer.emit(Opcode::Pop);
            self.expr.writer.resize_stack(-1);
        }
        self.expr.writer.emit_jump(Opcode::Jump, start_label, body.first().map_or_else(crate::location::SourceLocation::synthetic, |s| s.location));
        self.expr.writer.mark_label(end_label);
    }

    fn compile_for_range(&mut self, proc: &mut DMProc<'ast>, var_name: &str, low: &ExprNode, high: &ExprNode, step: Option<&ExprNode>, body: &[StmtNode]) {
        self.expr.compile(proc, low);
        self.expr.compile(proc, high);
        if let Some(step) = step {
            self.expr.compile(proc, step);
        } else {
            self.expr.writer.emit_float(Opcode::PushFloat, 1.0);
            self.expr.writer.resize_stack(1);
        }
        let enumerator_id = proc.next_enumerator_id();
        self.expr.writer.emit_short(Opcode::CreateRangeEnumerator, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
        self.expr.writer.resize_stack(-3);
        let var_ref = self.loop_variable_reference(proc, var_name, low.location);
        let start_label = self.expr.writer.create_label();
        let continue_label = self.expr.writer.create_label();
        let end_label = self.expr.writer.create_label();
        self.expr.writer.mark_label(start_label);
        self.expr.writer.emit_short_jump(Opcode::EnumerateNoAssign, u16::try_from(enumerator_id).unwrap_or(u16::MAX), end_label, low.location);
        self.expr.writer.emit_short(Opcode::Enumerate, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
        self.expr.writer.write_reference(var_ref);
        self.loop_stack.push(LoopFrame { break_label: end_label, continue_label, name: None });
        self.compile_block(proc, body);
        self.loop_stack.pop();
        self.expr.writer.mark_label(continue_label);
        self.expr.writer.emit_jump(Opcode::Jump, start_label, low.location);
        self.expr.writer.mark_label(end_label);
        self.expr.writer.emit_short(Opcode::DestroyEnumerator, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
    }

    fn compile_for_in(&mut self, proc: &mut DMProc<'ast>, var_name: &str, source: &ForInSource, body: &[StmtNode]) {
        match source {
            ForInSource::Range { low, high } => self.compile_for_range(proc, var_name, low, high, None, body),
            ForInSource::List(list_expr) => {
                self.expr.compile(proc, list_expr);
                let enumerator_id = proc.next_enumerator_id();
                self.expr.writer.emit_short(Opcode::CreateListEnumerator, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
                self.expr.writer.resize_stack(-1);
                let var_ref = self.loop_variable_reference(proc, var_name, list_expr.location);
                let start_label = self.expr.writer.create_label();
                let continue_label = self.expr.writer.create_label();
                let end_label = self.expr.writer.create_label();
                self.expr.writer.mark_label(start_label);
                self.expr.writer.emit_short_jump(Opcode::EnumerateNoAssign, u16::try_from(enumerator_id).unwrap_or(u16::MAX), end_label, list_expr.location);
                self.expr.writer.emit_short(Opcode::Enumerate, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
                self.expr.writer.write_reference(var_ref);
                self.loop_stack.push(LoopFrame { break_label: end_label, continue_label, name: None });
                self.compile_block(proc, body);
                self.loop_stack.pop();
                self.expr.writer.mark_label(continue_label);
                self.expr.writer.emit_jump(Opcode::Jump, start_label, list_expr.location);
                self.expr.writer.mark_label(end_label);
                self.expr.writer.emit_short(Opcode::DestroyEnumerator, u16::try_from(enumerator_id).unwrap_or(u16::MAX));
            }
        }
    }

    fn loop_variable_reference(&mut self, proc: &mut DMProc<'ast>, name: &str, location: crate::location::SourceLocation) -> Reference {
        if let Some(local) = proc.locals.get(name) {
            return Reference::Local(local.id);
        }
        let next_id = next_local_id(proc);
        let local = LocalVariable { name: name.to_string(), id: next_id, is_parameter: false, type_path: None, explicit_value_type: None };
        if proc.register_local(local).is_err() {
            self.expr.ctx.diagnostics.error(DiagnosticKind::InternalError, location, "proc exceeds the local limit");
        }
        Reference::Local(proc.locals[name].id)
    }

    /// Switch case dispatch: the scrutinee is pushed once and compared
    /// against each case value in turn; `SwitchCase`/`SwitchCaseRange`
    /// consume only the pushed comparison value, whether the comparison
    /// hits or misses, leaving the scrutinee on the stack either way. Each
    /// case body's prologue pops the stale scrutinee before running.
    fn compile_switch(&mut self, proc: &mut DMProc<'ast>, scrutinee: &ExprNode, cases: &[crate::ast::SwitchCase], default: Option<&[StmtNode]>) {
        self.expr.compile(proc, scrutinee);
        let end_label = self.expr.writer.create_label();
        let mut body_labels = Vec::with_capacity(cases.len());
        for case in cases {
            let body_label = self.expr.writer.create_label();
            for value in &case.values {
                match value {
                    CaseValue::Single(e) => {
                        self.expr.compile(proc, e);
                        self.expr.writer.emit_jump(Opcode::SwitchCase, body_label, e.location);
                        self.expr.writer.resize_stack(-1);
                    }
                    CaseValue::Range(low, high) => {
                        self.expr.compile(proc, low);
                        self.expr.compile(proc, high);
                        self.expr.writer.emit_jump(Opcode::SwitchCaseRange, body_label, low.location);
                        self.expr.writer.resize_stack(-2);
                    }
                }
            }
            body_labels.push(body_label);
        }
        self.expr.writer.emit(Opcode::Pop);
        self.expr.writer.resize_stack(-1);
        if let Some(default) = default {
            self.compile_block(proc, default);
        }
        self.expr.writer.emit_jump(Opcode::Jump, end_label, scrutinee.location);
        for (case, body_label) in cases.iter().zip(body_labels) {
            self.expr.writer.mark_label(body_label);
            self.expr.writer.emit(Opcode::Pop);
            self.expr.writer.resize_stack(-1);
            self.compile_block(proc, &case.body);
            self.expr.writer.emit_jump(Opcode::Jump, end_label, scrutinee.location);
        }
        self.expr.writer.mark_label(end_label);
    }

    fn compile_break(&mut self, location: crate::location::SourceLocation) {
        match self.loop_stack.last() {
            Some(frame) => {
                let label = frame.break_label;
                self.expr.writer.emit_jump(Opcode::Jump, label, location);
            }
            None => self.expr.ctx.diagnostics.error(DiagnosticKind::ParseError, location, "'break' outside a loop or switch"),
        }
    }

    fn compile_continue(&mut self, location: crate::location::SourceLocation) {
        match self.loop_stack.last() {
            Some(frame) => {
                let label = frame.continue_label;
                self.expr.writer.emit_jump(Opcode::Jump, label, location);
            }
            None => self.expr.ctx.diagnostics.error(DiagnosticKind::ParseError, location, "'continue' outside a loop"),
        }
    }

    fn compile_spawn(&mut self, proc: &mut DMProc<'ast>, delay: Option<&ExprNode>, body: &[StmtNode], location: crate::location::SourceLocation) {
        match delay {
            Some(delay) => self.expr.compile(proc, delay),
            None => {
                self.expr.writer.emit_float(Opcode::PushFloat, 0.0);
                self.expr.writer.resize_stack(1);
            }
        }
        let resume_label = self.expr.writer.create_label();
        self.expr.writer.emit_jump(Opcode::Spawn, resume_label, location);
        self.expr.writer.resize_stack(-1);
        let saved_loops = std::mem::take(&mut self.loop_stack);
        self.compile_block(proc, body);
        self.loop_stack = saved_loops;
        self.expr.writer.emit(Opcode::Return);
        self.expr.writer.mark_label(resume_label);
    }

    fn compile_try(
        &mut self,
        proc: &mut DMProc<'ast>,
        body: &[StmtNode],
        catch_var: Option<&Declarator>,
        catch_body: &[StmtNode],
        location: crate::location::SourceLocation,
    ) {
        // No dedicated exception-table opcode is in the mandatory surface;
        // the try body is compiled as plain sequential code (its statements
        // run the way they would outside a try block) but the catch clause
        // has no way to become conditionally reachable without one, so it is
        // left uncompiled rather than run unconditionally.
        self.expr.ctx.diagnostics.warning(
            DiagnosticKind::UnsupportedFeature,
            location,
            "'try'/'catch' exception handling is not lowered at the present development level; the catch clause is skipped",
        );
        self.compile_block(proc, body);
        let _ = (catch_var, catch_body);
    }

    fn compile_set(&mut self, proc: &mut DMProc<'ast>, name: &str, value: &ExprNode) {
        match name {
            "src" => self.compile_set_verb_src(proc, value),
            "waitfor" | "background" | "hidden" | "instant" | "popup" => {
                let flag = match const_bool(value) {
                    Some(flag) => flag,
                    None => {
                        self.expr.ctx.diagnostics.error(DiagnosticKind::ParseError, value.location, format!("'set {name}' requires a constant boolean"));
                        return;
                    }
                };
                let metadata = proc.verb_metadata.get_or_insert_with(Default::default);
                metadata.attributes.insert(name.to_string(), (flag.to_string(), Some(flag)));
            }
            other => {
                let metadata = proc.verb_metadata.get_or_insert_with(Default::default);
                let rendered = match &value.kind {
                    Expr::ConstString(s) => s.clone(),
                    _ => format!("{:?}", value.kind),
                };
                metadata.attributes.insert(other.to_string(), (rendered, None));
            }
        }
    }

    fn compile_set_verb_src(&mut self, proc: &mut DMProc<'ast>, value: &ExprNode) {
        let Expr::Identifier(name) = &value.kind else {
            self.expr.ctx.diagnostics.error(DiagnosticKind::ParseError, value.location, "'set src' requires a bare identifier");
            return;
        };
        let src = match name.as_str() {
            "world" => crate::object_tree::VerbSrc::WORLD,
            "view" => crate::object_tree::VerbSrc::VIEW,
            "oview" => crate::object_tree::VerbSrc::OVIEW,
            "usr.contents" => crate::object_tree::VerbSrc::MOB_CONTENTS,
            _ => crate::object_tree::VerbSrc::MOB,
        };
        proc.verb_metadata.get_or_insert_with(Default::default).src = Some(src);
    }
}

fn next_local_id(proc: &DMProc) -> u8 {
    u8::try_from(proc.local_count()).unwrap_or(u8::MAX)
}

fn const_bool(expr: &ExprNode) -> Option<bool> {
    match &expr.kind {
        Expr::ConstInteger(i) => Some(*i != 0),
        Expr::ConstFloat(f) => Some(*f != 0.0),
        _ => None,
    }
}

/// Compiles an `Expr::Assign` node: resolves the target, compiles the
/// value, and emits the opcode the assignment operator maps to (§4.5.1).
pub fn compile_assignment<'c, 't, 'ast>(
    compiler: &mut ExpressionCompiler<'c, 't, 'ast>,
    proc: &mut DMProc<'ast>,
    op: AssignmentOperator,
    target: &ExprNode,
    value: &ExprNode,
) {
    if matches!(op, AssignmentOperator::LogicalAndAssign | AssignmentOperator::LogicalOrAssign) {
        compile_short_circuit_assign(compiler, proc, op, target, value);
        return;
    }
    let resolved = compiler.resolve_lvalue(proc, target.location, target);
    compiler.compile(proc, value);
    let opcode = match op {
        AssignmentOperator::Assign => Opcode::Assign,
        AssignmentOperator::AssignInto => Opcode::AssignInto,
        AssignmentOperator::AddAssign => Opcode::Append,
        AssignmentOperator::SubtractAssign => Opcode::Remove,
        AssignmentOperator::MultiplyAssign => Opcode::MultiplyReference,
        AssignmentOperator::DivideAssign => Opcode::DivideReference,
        AssignmentOperator::ModuloAssign => Opcode::ModulusReference,
        AssignmentOperator::AndAssign => Opcode::Mask,
        AssignmentOperator::OrAssign => Opcode::Combine,
        AssignmentOperator::XorAssign => Opcode::BitXorReference,
        AssignmentOperator::ShiftLeftAssign => Opcode::BitShiftLeftReference,
        AssignmentOperator::ShiftRightAssign => Opcode::BitShiftRightReference,
        AssignmentOperator::LogicalAndAssign | AssignmentOperator::LogicalOrAssign => unreachable!("handled above"),
    };
    compiler.writer.emit(opcode);
    compiler.writer.write_reference(resolved.reference);
}

fn compile_short_circuit_assign<'c, 't, 'ast>(
    compiler: &mut ExpressionCompiler<'c, 't, 'ast>,
    proc: &mut DMProc<'ast>,
    op: AssignmentOperator,
    target: &ExprNode,
    value: &ExprNode,
) {
    let resolved = compiler.resolve_lvalue(proc, target.location, target);
    if resolved.kind != LValueKind::Simple {
        compiler.ctx.diagnostics.warning(
            DiagnosticKind::UnsupportedFeature,
            target.location,
            "'&&='/'||=' on a field or list-index target is not supported at the present development level; compiling as a plain assignment",
        );
        compiler.compile(proc, value);
        compiler.writer.emit(Opcode::Assign);
        compiler.writer.write_reference(resolved.reference);
        return;
    }
    let skip_label = compiler.writer.create_label();
    let jump_op = if op == AssignmentOperator::LogicalAndAssign { Opcode::JumpIfFalseReference } else { Opcode::JumpIfTrueReference };
    compiler.writer.emit_reference_jump(jump_op, resolved.reference, skip_label, target.location);
    compiler.compile(proc, value);
    compiler.writer.emit(Opcode::Assign);
    compiler.writer.write_reference(resolved.reference);
    compiler.writer.emit(Opcode::Pop);
    compiler.writer.resize_stack(-1);
    compiler.writer.mark_label(skip_label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Expr, ExprNode},
        diagnostics::Diagnostics,
        location::SourceLocation,
        object_tree::{BuiltinRegistry, ObjectTree},
        path::Path,
        settings::CompilerSettings,
    };

    fn build(body: &[StmtNode]) -> Vec<u8> {
        let mut tree = ObjectTree::new();
        let owner = tree.get_or_create(&Path::root());
        let builtins = BuiltinRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let settings = CompilerSettings::default();
        let ObjectTree { all_objects, globals, strings, resources, global_procs, .. } = &mut tree;
        let mut ctx = CompileCtx {
            objects: all_objects,
            globals,
            strings,
            resources,
            global_procs,
            builtins: &builtins,
            diagnostics: &mut diagnostics,
            settings: &settings,
        };
        let mut proc = DMProc::new(0, "test".to_string(), owner, body, SourceLocation::synthetic());
        // SAFETY net for the borrow checker is unnecessary here: `body` is
        // reborrowed through `proc.body`, not through the `body` argument,
        // once `compile_proc` runs.
        StatementCompiler::compile_proc(&mut ctx, &mut proc).unwrap().0
    }

    #[test]
    fn empty_body_falls_through_to_implicit_null_return() {
        let bytecode = build(&[]);
        assert_eq!(bytecode.last().copied(), Some(Opcode::Return as u8));
    }

    #[test]
    fn return_with_value_skips_the_implicit_return() {
        let stmt = StmtNode::new(
            SourceLocation::synthetic(),
            Stmt::Return(Some(ExprNode::new(SourceLocation::synthetic(), Expr::ConstInteger(1)))),
        );
        let bytecode = build(std::slice::from_ref(&stmt));
        assert_eq!(bytecode[0], Opcode::PushFloat as u8);
        assert_eq!(bytecode[5], Opcode::Return as u8);
    }

    #[test]
    fn break_outside_loop_is_diagnosed() {
        let mut tree = ObjectTree::new();
        let owner = tree.get_or_create(&Path::root());
        let builtins = BuiltinRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let settings = CompilerSettings::default();
        let ObjectTree { all_objects, globals, strings, resources, global_procs, .. } = &mut tree;
        let mut ctx = CompileCtx {
            objects: all_objects,
            globals,
            strings,
            resources,
            global_procs,
            builtins: &builtins,
            diagnostics: &mut diagnostics,
            settings: &settings,
        };
        let body = [StmtNode::new(SourceLocation::synthetic(), Stmt::Break)];
        let mut proc = DMProc::new(0, "test".to_string(), owner, &body, SourceLocation::synthetic());
        let _ = StatementCompiler::compile_proc(&mut ctx, &mut proc);
        assert!(diagnostics.has_errors());
    }
}
