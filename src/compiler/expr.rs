//! `ExpressionCompiler` — lowers one expression to bytecode that leaves
//! exactly one value on the stack (§4.5).

use crate::{
    ast::{Arg, BinaryOperator, CallTarget, Expr, ExprNode, StringPiece, UnaryOperator},
    bytecode::{opcode::binary_operator_opcode, BytecodeWriter, Opcode, Reference},
    compiler::{CompileCtx, LValueKind},
    diagnostics::DiagnosticKind,
    location::SourceLocation,
    object_tree::{DMProc, ObjectId},
    path::Path,
    value::Constant,
};

const INTRINSICS: &[&str] =
    &["locate", "pick", "input", "rgb", "prob", "istype", "get_dir", "get_step", "length", "sqrt"];

/// Bundles the borrows an expression-compilation call needs: the shared
/// tree/registry context, the writer for the proc currently being built,
/// and the owning object (for implicit-field and inherited-proc lookups).
pub struct ExpressionCompiler<'c, 't, 'ast> {
    pub ctx: &'c mut CompileCtx<'t>,
    pub writer: &'c mut BytecodeWriter,
    pub owner: ObjectId,
    pub _ast: std::marker::PhantomData<&'ast ()>,
}

/// The outcome of resolving an expression as an assignment target.
pub struct ResolvedLValue {
    pub kind: LValueKind,
    pub reference: Reference,
}

impl<'c, 't, 'ast> ExpressionCompiler<'c, 't, 'ast> {
    pub fn compile(&mut self, proc: &mut DMProc<'ast>, expr: &ExprNode) {
        match &expr.kind {
            Expr::Invalid | Expr::Void => {
                self.writer.emit(Opcode::PushNull);
                self.writer.resize_stack(1);
            }
            Expr::ConstInteger(i) => self.push_float(*i as f64),
            Expr::ConstFloat(f) => self.push_float(*f),
            Expr::ConstString(s) => {
                let id = self.ctx.strings.intern(s);
                self.writer.emit_string(Opcode::PushString, id);
                self.writer.resize_stack(1);
            }
            Expr::ConstNull => {
                self.writer.emit(Opcode::PushNull);
                self.writer.resize_stack(1);
            }
            Expr::ConstPath(path) => self.compile_const_path(expr.location, path),
            Expr::ConstResource(path) => {
                self.ctx.resources.insert(path.clone());
                let id = self.ctx.strings.intern(path);
                self.writer.emit_string(Opcode::PushString, id);
                self.writer.resize_stack(1);
            }
            Expr::Identifier(name) => self.compile_identifier(proc, expr.location, name),
            Expr::Unary { op, operand } => self.compile_unary(proc, expr.location, *op, operand),
            Expr::Binary { op, left, right } => self.compile_binary(proc, *op, left, right),
            Expr::Ternary { condition, if_true, if_false } => {
                self.compile_ternary(proc, condition, if_true, if_false);
            }
            Expr::Assign { op, target, value } => {
                super::stmt::compile_assignment(self, proc, *op, target, value);
            }
            Expr::DereferenceField { base, field, .. } => {
                self.compile(proc, base);
                let id = self.ctx.strings.intern(field);
                self.writer.emit_string(Opcode::DereferenceField, id);
            }
            Expr::DereferenceIndex { base, index } => {
                self.compile(proc, base);
                self.compile(proc, index);
                self.writer.emit(Opcode::DereferenceIndex);
                self.writer.resize_stack(-1);
            }
            Expr::Call { target, args } => self.compile_call(proc, expr.location, target, args),
            Expr::ListLiteral(entries) => self.compile_list_literal(proc, entries),
            Expr::NewList(exprs) => {
                for e in exprs {
                    self.compile(proc, e);
                    self.writer.emit_byte(Opcode::CreateObject, 0);
                }
                self.writer.emit_int(Opcode::CreateList, i32::try_from(exprs.len()).unwrap_or(i32::MAX));
                for _ in exprs {
                    self.writer.resize_stack(-1);
                }
                self.writer.resize_stack(1);
            }
            Expr::New { path, target, args } => self.compile_new(proc, expr.location, path.as_ref(), target, args),
            Expr::InterpolatedString(pieces) => self.compile_interpolated_string(proc, pieces),
            Expr::Input { args, as_types: _, in_list } => {
                for arg in args {
                    self.compile_arg(proc, arg);
                }
                if let Some(in_list) = in_list {
                    self.compile(proc, in_list);
                }
                self.writer.emit(Opcode::Prompt);
                self.writer.push_int(0);
                self.writer.resize_stack(1);
            }
            Expr::CaseRange { low, high } => {
                self.compile(proc, low);
                self.compile(proc, high);
            }
        }
    }

    fn push_float(&mut self, value: f64) {
        self.writer.emit_float(Opcode::PushFloat, value as f32);
        self.writer.resize_stack(1);
    }

    fn compile_const_path(&mut self, location: SourceLocation, path: &Path) {
        let owner_path = self.ctx.objects[self.owner].path.clone();
        let candidates = [owner_path.combine(path), path.clone(), Path::root().combine(path)];
        for candidate in &candidates {
            if let Some(id) = self.find_object(candidate) {
                self.writer.emit_int(Opcode::PushType, i32::try_from(id).unwrap_or(i32::MAX));
                self.writer.resize_stack(1);
                return;
            }
        }
        self.ctx.diagnostics.error(
            DiagnosticKind::UnresolvedPath,
            location,
            format!("could not resolve type path '{path}' (tried relative-to-owner, as-is, and from root)"),
        );
        self.writer.emit(Opcode::PushNull);
        self.writer.resize_stack(1);
    }

    fn find_object(&self, path: &Path) -> Option<ObjectId> {
        self.ctx.objects.iter().find(|o| o.path == *path).map(|o| o.id)
    }

    fn compile_identifier(&mut self, proc: &mut DMProc<'ast>, location: SourceLocation, name: &str) {
        if let Some(local) = proc.locals.get(name) {
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::Local(local.id));
            self.writer.resize_stack(1);
            return;
        }
        if let Some(konst) = proc.local_consts.get(name) {
            self.push_constant(&konst.value.clone());
            return;
        }
        let special = match name {
            "." => Some(Reference::SelfRef),
            "src" => Some(Reference::Src),
            "usr" => Some(Reference::Usr),
            "args" => Some(Reference::Args),
            "world" => Some(Reference::World),
            _ => None,
        };
        if let Some(reference) = special {
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(reference);
            self.writer.resize_stack(1);
            return;
        }
        if self.ctx.objects[self.owner].instance_vars.contains_key(name)
            || self.owner_has_inherited_var(name)
        {
            let id = self.ctx.strings.intern(name);
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::SrcField(id));
            self.writer.resize_stack(1);
            return;
        }
        if let Some(&index) = self.global_index(name) {
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::Global(i32::try_from(index).unwrap_or(i32::MAX)));
            self.writer.resize_stack(1);
            return;
        }
        let owner_path = self.ctx.objects[self.owner].path.to_string();
        if self.ctx.builtins.type_var(&owner_path, name).is_some() {
            let id = self.ctx.strings.intern(name);
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::SrcField(id));
            self.writer.resize_stack(1);
            return;
        }
        self.ctx.diagnostics.warning(
            DiagnosticKind::UnknownIdentifier,
            location,
            format!("unresolved identifier '{name}', compiling as an implicit field access"),
        );
        let id = self.ctx.strings.intern(name);
        self.writer.emit(Opcode::PushReferenceValue);
        self.writer.write_reference(Reference::SrcField(id));
        self.writer.resize_stack(1);
    }

    fn owner_has_inherited_var(&self, name: &str) -> bool {
        let mut current = Some(self.owner);
        while let Some(id) = current {
            let object = &self.ctx.objects[id];
            if object.instance_vars.contains_key(name) || object.variable_overrides.contains_key(name) {
                return true;
            }
            current = object.parent;
        }
        false
    }

    fn global_index(&self, name: &str) -> Option<&usize> {
        self.ctx.objects[self.owner].global_var_indices.get(name)
    }

    fn push_constant(&mut self, constant: &Constant) {
        match constant {
            Constant::Null => {
                self.writer.emit(Opcode::PushNull);
                self.writer.resize_stack(1);
            }
            Constant::Integer(i) => self.push_float(*i as f64),
            Constant::Float(f) => self.push_float(*f),
            Constant::String(id) | Constant::Resource(id) => {
                self.writer.emit_string(Opcode::PushString, *id);
                self.writer.resize_stack(1);
            }
            Constant::Path(path) => {
                if let Some(id) = self.find_object(path) {
                    self.writer.emit_int(Opcode::PushType, i32::try_from(id).unwrap_or(i32::MAX));
                } else {
                    self.writer.emit(Opcode::PushNull);
                }
                self.writer.resize_stack(1);
            }
        }
    }

    fn compile_unary(&mut self, proc: &mut DMProc<'ast>, location: SourceLocation, op: UnaryOperator, operand: &ExprNode) {
        match op {
            UnaryOperator::Negate => {
                self.compile(proc, operand);
                self.writer.emit(Opcode::Negate);
            }
            UnaryOperator::Not => {
                self.compile(proc, operand);
                self.writer.emit(Opcode::BooleanNot);
            }
            UnaryOperator::BitNot => {
                self.compile(proc, operand);
                self.writer.emit(Opcode::BitNot);
            }
            UnaryOperator::PreIncrement
            | UnaryOperator::PreDecrement
            | UnaryOperator::PostIncrement
            | UnaryOperator::PostDecrement => {
                let opcode = if matches!(op, UnaryOperator::PreIncrement | UnaryOperator::PostIncrement) {
                    Opcode::Increment
                } else {
                    Opcode::Decrement
                };
                let resolved = self.resolve_lvalue(proc, location, operand);
                self.writer.emit(opcode);
                self.writer.write_reference(resolved.reference);
                self.writer.resize_stack(1);
            }
        }
    }

    fn compile_binary(&mut self, proc: &mut DMProc<'ast>, op: BinaryOperator, left: &ExprNode, right: &ExprNode) {
        self.compile(proc, left);
        self.compile(proc, right);
        match binary_operator_opcode(op) {
            Some(opcode) => {
                self.writer.emit(opcode);
                self.writer.resize_stack(-1);
            }
            None => {
                // `Equivalent`/`NotEquivalent`/`To` have no standalone opcode
                // at this development level; compile as a reference equality
                // fallback so execution can still proceed.
                self.writer.emit(Opcode::CompareEquals);
                self.writer.resize_stack(-1);
                if op == BinaryOperator::NotEquivalent {
                    self.writer.emit(Opcode::BooleanNot);
                }
            }
        }
    }

    fn compile_ternary(&mut self, proc: &mut DMProc<'ast>, condition: &ExprNode, if_true: &ExprNode, if_false: &ExprNode) {
        let false_label = self.writer.create_label();
        let end_label = self.writer.create_label();
        self.compile(proc, condition);
        self.writer.emit_jump(Opcode::JumpIfFalse, false_label, condition.location);
        self.writer.resize_stack(-1);
        self.compile(proc, if_true);
        self.writer.emit_jump(Opcode::Jump, end_label, if_true.location);
        self.writer.mark_label(false_label);
        self.compile(proc, if_false);
        self.writer.mark_label(end_label);
    }

    fn compile_list_literal(&mut self, proc: &mut DMProc<'ast>, entries: &[crate::ast::ListEntry]) {
        let has_keys = entries.iter().any(|e| e.key.is_some());
        if !has_keys {
            for entry in entries {
                self.compile(proc, &entry.value);
            }
            self.writer.emit_int(Opcode::CreateList, i32::try_from(entries.len()).unwrap_or(i32::MAX));
            for _ in entries {
                self.writer.resize_stack(-1);
            }
            self.writer.resize_stack(1);
            return;
        }
        for entry in entries {
            match &entry.key {
                Some(key) => self.compile(proc, key),
                None => {
                    self.writer.emit(Opcode::PushNull);
                    self.writer.resize_stack(1);
                }
            }
            self.compile(proc, &entry.value);
        }
        self.writer.emit_int(Opcode::CreateAssociativeList, i32::try_from(entries.len()).unwrap_or(i32::MAX));
        for _ in entries {
            self.writer.resize_stack(-2);
        }
        self.writer.resize_stack(1);
    }

    fn compile_new(
        &mut self,
        proc: &mut DMProc<'ast>,
        location: SourceLocation,
        path: Option<&Path>,
        target: &Option<Box<ExprNode>>,
        args: &[Arg],
    ) {
        if let Some(path) = path {
            self.compile_const_path(location, path);
        } else if let Some(target) = target {
            self.compile(proc, target);
        } else {
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::Src);
            self.writer.resize_stack(1);
        }
        let args_type: u8 = u8::from(!args.is_empty());
        for arg in args {
            self.compile_arg(proc, arg);
        }
        self.writer.emit_byte(Opcode::CreateObject, args_type);
        self.writer.push_int(i32::try_from(args.len()).unwrap_or(i32::MAX));
        for _ in args {
            self.writer.resize_stack(-1);
        }
    }

    fn compile_interpolated_string(&mut self, proc: &mut DMProc<'ast>, pieces: &[StringPiece]) {
        let mut format = String::new();
        let mut exprs = Vec::new();
        for piece in pieces {
            match piece {
                StringPiece::Literal(s) => format.push_str(s),
                StringPiece::Expr(e) => {
                    format.push_str("\u{fffd}");
                    exprs.push(e);
                }
            }
        }
        let id = self.ctx.strings.intern(&format);
        for e in &exprs {
            self.compile(proc, e);
        }
        self.writer.emit_string(Opcode::FormatString, id);
        self.writer.push_int(i32::try_from(exprs.len()).unwrap_or(i32::MAX));
        for _ in &exprs {
            self.writer.resize_stack(-1);
        }
        self.writer.resize_stack(1);
    }

    fn compile_arg(&mut self, proc: &mut DMProc<'ast>, arg: &Arg) {
        match arg {
            Arg::Positional(e) => self.compile(proc, e),
            Arg::Named(name, e) => {
                self.ctx.diagnostics.error(
                    DiagnosticKind::UnsupportedFeature,
                    e.location,
                    format!("named argument '{name}' is not supported at the present development level"),
                );
                self.compile(proc, e);
            }
        }
    }

    fn compile_call(&mut self, proc: &mut DMProc<'ast>, location: SourceLocation, target: &CallTarget, args: &[Arg]) {
        match target {
            CallTarget::Super => {
                for arg in args {
                    self.compile_arg(proc, arg);
                }
                self.writer.emit_byte(Opcode::CallStatement, u8::from(!args.is_empty()));
                self.writer.write_reference(Reference::SuperProc);
                self.writer.resize_stack(1 - i32::try_from(args.len()).unwrap_or(0));
            }
            CallTarget::Method { receiver, name } => {
                self.compile(proc, receiver);
                for arg in args {
                    self.compile_arg(proc, arg);
                }
                let id = self.ctx.strings.intern(name);
                self.writer.emit_string(Opcode::DereferenceCall, id);
                self.writer.push_byte(u8::from(!args.is_empty()));
                self.writer.push_int(i32::try_from(args.len()).unwrap_or(0));
                self.writer.resize_stack(-i32::try_from(args.len()).unwrap_or(0));
            }
            CallTarget::Identifier(name) => self.compile_identifier_call(proc, location, name, args),
            CallTarget::Dynamic { call_args } => {
                for arg in args {
                    self.compile_arg(proc, arg);
                }
                for e in call_args.iter().rev() {
                    self.compile(proc, e);
                }
                self.writer.emit_byte(Opcode::CallStatement, u8::from(!args.is_empty()));
                self.writer.resize_stack(1 - i32::try_from(args.len() + call_args.len()).unwrap_or(0));
            }
            CallTarget::Expression(expr) => {
                self.compile(proc, expr);
                for arg in args {
                    self.compile_arg(proc, arg);
                }
                self.writer.emit_byte(Opcode::CallStatement, u8::from(!args.is_empty()));
                self.writer.resize_stack(-i32::try_from(args.len()).unwrap_or(0));
            }
        }
    }

    fn compile_identifier_call(&mut self, proc: &mut DMProc<'ast>, location: SourceLocation, name: &str, args: &[Arg]) {
        if INTRINSICS.contains(&name) {
            for arg in args {
                self.compile_arg(proc, arg);
            }
            match name {
                "pick" => self.writer.emit_int(Opcode::PickUnweighted, i32::try_from(args.len()).unwrap_or(i32::MAX)),
                "rgb" => {
                    self.writer.emit_byte(Opcode::Rgb, u8::from(!args.is_empty()));
                    self.writer.push_int(i32::try_from(args.len()).unwrap_or(i32::MAX));
                }
                "input" => {
                    self.writer.emit(Opcode::Prompt);
                    self.writer.push_int(0);
                }
                "locate" => self.writer.emit(Opcode::Locate),
                "prob" => self.writer.emit(Opcode::Prob),
                "istype" => self.writer.emit(Opcode::IsType),
                "get_dir" => self.writer.emit(Opcode::GetDir),
                "get_step" => self.writer.emit(Opcode::GetStep),
                "length" => self.writer.emit(Opcode::Length),
                "sqrt" => self.writer.emit(Opcode::Sqrt),
                _ => unreachable!("checked by INTRINSICS membership"),
            }
            self.writer.resize_stack(1 - i32::try_from(args.len()).unwrap_or(0));
            return;
        }
        if self.ctx.objects[self.owner].procs.contains_key(name) || self.owner_has_inherited_proc(name) {
            self.writer.emit(Opcode::PushReferenceValue);
            self.writer.write_reference(Reference::Src);
            self.writer.resize_stack(1);
            for arg in args {
                self.compile_arg(proc, arg);
            }
            let id = self.ctx.strings.intern(name);
            self.writer.emit_string(Opcode::DereferenceCall, id);
            self.writer.push_byte(u8::from(!args.is_empty()));
            self.writer.push_int(i32::try_from(args.len()).unwrap_or(0));
            self.writer.resize_stack(-i32::try_from(args.len()).unwrap_or(0));
            return;
        }
        for arg in args {
            self.compile_arg(proc, arg);
        }
        let id = self.ctx.strings.intern(name);
        let proc_id = i32::try_from(self.global_proc_id(name)).unwrap_or(-1);
        self.writer.emit(Opcode::Call);
        self.writer.write_reference(Reference::GlobalProc(proc_id));
        self.writer.push_byte(u8::from(!args.is_empty()));
        self.writer.push_int(i32::try_from(args.len()).unwrap_or(0));
        self.writer.resize_stack(1 - i32::try_from(args.len()).unwrap_or(0));
        let _ = (id, location);
    }

    fn owner_has_inherited_proc(&self, name: &str) -> bool {
        let mut current = Some(self.owner);
        while let Some(id) = current {
            let object = &self.ctx.objects[id];
            if object.procs.contains_key(name) {
                return true;
            }
            current = object.parent;
        }
        false
    }

    fn global_proc_id(&self, name: &str) -> usize {
        self.ctx.global_procs.get(name).copied().unwrap_or(0)
    }

    /// Resolves `expr` as an assignment target per §4.5.1.
    pub fn resolve_lvalue(&mut self, proc: &mut DMProc<'ast>, location: SourceLocation, expr: &ExprNode) -> ResolvedLValue {
        match &expr.kind {
            Expr::Identifier(name) => {
                if let Some(local) = proc.locals.get(name) {
                    return ResolvedLValue { kind: LValueKind::Simple, reference: Reference::Local(local.id) };
                }
                let special = match name.as_str() {
                    "." => Some(Reference::SelfRef),
                    "src" => Some(Reference::Src),
                    "usr" => Some(Reference::Usr),
                    "args" => Some(Reference::Args),
                    "world" => Some(Reference::World),
                    _ => None,
                };
                if let Some(reference) = special {
                    return ResolvedLValue { kind: LValueKind::Simple, reference };
                }
                if let Some(&index) = self.global_index(name) {
                    return ResolvedLValue {
                        kind: LValueKind::Simple,
                        reference: Reference::Global(i32::try_from(index).unwrap_or(i32::MAX)),
                    };
                }
                let id = self.ctx.strings.intern(name);
                ResolvedLValue { kind: LValueKind::Simple, reference: Reference::SrcField(id) }
            }
            Expr::DereferenceField { base, field, .. } => {
                self.compile(proc, base);
                let id = self.ctx.strings.intern(field);
                ResolvedLValue { kind: LValueKind::Field, reference: Reference::Field(id) }
            }
            Expr::DereferenceIndex { base, index } => {
                self.compile(proc, base);
                self.compile(proc, index);
                ResolvedLValue { kind: LValueKind::ListIndex, reference: Reference::ListIndex }
            }
            _ => {
                self.ctx.diagnostics.error(
                    DiagnosticKind::ParseError,
                    location,
                    "expression is not a valid assignment target".to_string(),
                );
                ResolvedLValue { kind: LValueKind::Simple, reference: Reference::Invalid }
            }
        }
    }
}
