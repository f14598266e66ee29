//! `ConstantFolder` — a post-order AST rewrite run once between the parser
//! and the code-tree builder (§4.2).
//!
//! Only `Negate`/`Not` (unary) and `LogicalAnd`/`LogicalOr` (binary) fold;
//! every other node is recursed into unchanged. Folding never crosses a
//! call boundary, so a subexpression containing a call is left alone even
//! if its other operand is constant.

use crate::{
    ast::{
        top::{File, ObjectStmt, ObjectStmtNode},
        Expr, ExprNode, Stmt, StmtNode, UnaryOperator, BinaryOperator,
    },
};

/// Runs the fold over every proc body and object-var initializer in `file`.
pub fn fold_file(file: &mut File) {
    for stmt in &mut file.statements {
        fold_object_stmt(stmt);
    }
}

fn fold_object_stmt(node: &mut ObjectStmtNode) {
    match &mut node.kind {
        ObjectStmt::Definition { body, .. } => {
            for child in body {
                fold_object_stmt(child);
            }
        }
        ObjectStmt::VarDefinition(declarator) => {
            if let Some(init) = &mut declarator.initializer {
                fold_expr(init);
            }
        }
        ObjectStmt::VarOverride { value, .. } => fold_expr(value),
        ObjectStmt::ProcDefinition { params, body, .. } => {
            for param in params {
                if let Some(default) = &mut param.default {
                    fold_expr(default);
                }
            }
            for stmt in body {
                fold_stmt(stmt);
            }
        }
    }
}

fn fold_stmt(node: &mut StmtNode) {
    match &mut node.kind {
        Stmt::Expression(e) | Stmt::Del(e) | Stmt::Throw(e) => fold_expr(e),
        Stmt::VarDeclaration(declarators) => {
            for declarator in declarators {
                if let Some(init) = &mut declarator.initializer {
                    fold_expr(init);
                }
            }
        }
        Stmt::Return(e) => {
            if let Some(e) = e {
                fold_expr(e);
            }
        }
        Stmt::If { condition, then_body, else_body } => {
            fold_expr(condition);
            fold_block(then_body);
            if let Some(else_body) = else_body {
                fold_block(else_body);
            }
        }
        Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
            fold_expr(condition);
            fold_block(body);
        }
        Stmt::For { init, condition, increment, body } => {
            if let Some(init) = init {
                fold_stmt(init);
            }
            if let Some(condition) = condition {
                fold_expr(condition);
            }
            if let Some(increment) = increment {
                fold_expr(increment);
            }
            fold_block(body);
        }
        Stmt::ForRange { low, high, step, body, .. } => {
            fold_expr(low);
            fold_expr(high);
            if let Some(step) = step {
                fold_expr(step);
            }
            fold_block(body);
        }
        Stmt::ForIn { source, body, .. } => {
            match source {
                crate::ast::ForInSource::Range { low, high } => {
                    fold_expr(low);
                    fold_expr(high);
                }
                crate::ast::ForInSource::List(e) => fold_expr(e),
            }
            fold_block(body);
        }
        Stmt::Switch { scrutinee, cases, default } => {
            fold_expr(scrutinee);
            for case in cases {
                for value in &mut case.values {
                    match value {
                        crate::ast::CaseValue::Single(e) => fold_expr(e),
                        crate::ast::CaseValue::Range(low, high) => {
                            fold_expr(low);
                            fold_expr(high);
                        }
                    }
                }
                fold_block(&mut case.body);
            }
            if let Some(default) = default {
                fold_block(default);
            }
        }
        Stmt::Spawn { delay, body } => {
            if let Some(delay) = delay {
                fold_expr(delay);
            }
            fold_block(body);
        }
        Stmt::Try { body, catch_body, .. } => {
            fold_block(body);
            fold_block(catch_body);
        }
        Stmt::Set { value, .. } => fold_expr(value),
        Stmt::Break | Stmt::Continue | Stmt::Label(_) | Stmt::Goto(_) => {}
    }
}

fn fold_block(stmts: &mut [StmtNode]) {
    for stmt in stmts {
        fold_stmt(stmt);
    }
}

fn fold_expr(node: &mut ExprNode) {
    match &mut node.kind {
        Expr::Unary { op, operand } => {
            fold_expr(operand);
            if let Some(folded) = try_fold_unary(*op, &*operand) {
                node.kind = folded;
            }
        }
        Expr::Binary { op, left, right } => {
            fold_expr(left);
            fold_expr(right);
            if let Some(folded) = try_fold_binary(*op, &*left, &*right) {
                node.kind = folded;
            }
        }
        Expr::Ternary { condition, if_true, if_false } => {
            fold_expr(condition);
            fold_expr(if_true);
            fold_expr(if_false);
        }
        Expr::Assign { target, value, .. } => {
            fold_expr(target);
            fold_expr(value);
        }
        Expr::DereferenceField { base, .. } => fold_expr(base),
        Expr::DereferenceIndex { base, index } => {
            fold_expr(base);
            fold_expr(index);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                fold_arg(arg);
            }
        }
        Expr::ListLiteral(entries) => {
            for entry in entries {
                if let Some(key) = &mut entry.key {
                    fold_expr(key);
                }
                fold_expr(&mut entry.value);
            }
        }
        Expr::NewList(exprs) => {
            for e in exprs {
                fold_expr(e);
            }
        }
        Expr::New { target, args, .. } => {
            if let Some(target) = target {
                fold_expr(target);
            }
            for arg in args {
                fold_arg(arg);
            }
        }
        Expr::InterpolatedString(pieces) => {
            for piece in pieces {
                if let crate::ast::StringPiece::Expr(e) = piece {
                    fold_expr(e);
                }
            }
        }
        Expr::Input { args, in_list, .. } => {
            for arg in args {
                fold_arg(arg);
            }
            if let Some(in_list) = in_list {
                fold_expr(in_list);
            }
        }
        Expr::CaseRange { low, high } => {
            fold_expr(low);
            fold_expr(high);
        }
        Expr::Invalid
        | Expr::Void
        | Expr::ConstInteger(_)
        | Expr::ConstFloat(_)
        | Expr::ConstString(_)
        | Expr::ConstNull
        | Expr::ConstPath(_)
        | Expr::ConstResource(_)
        | Expr::Identifier(_) => {}
    }
}

fn fold_arg(arg: &mut crate::ast::Arg) {
    match arg {
        crate::ast::Arg::Positional(e) | crate::ast::Arg::Named(_, e) => fold_expr(e),
    }
}

fn try_fold_unary(op: UnaryOperator, operand: &ExprNode) -> Option<Expr> {
    match op {
        UnaryOperator::Negate => match &operand.kind {
            Expr::ConstInteger(i) => Some(Expr::ConstInteger(-i)),
            Expr::ConstFloat(f) => Some(Expr::ConstFloat(-f)),
            _ => None,
        },
        UnaryOperator::Not => match &operand.kind {
            Expr::ConstInteger(i) => Some(Expr::ConstInteger(i64::from(*i == 0))),
            Expr::ConstFloat(f) => Some(Expr::ConstInteger(i64::from(*f == 0.0))),
            Expr::ConstNull => Some(Expr::ConstInteger(1)),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the boolean literal value of `expr` if it is a constant whose
/// truthiness can be determined without a string table — string constants
/// are left to the expression compiler to fold (it owns the interner).
fn const_truthiness(expr: &ExprNode) -> Option<bool> {
    match &expr.kind {
        Expr::ConstInteger(i) => Some(*i != 0),
        Expr::ConstFloat(f) => Some(*f != 0.0),
        Expr::ConstNull => Some(false),
        Expr::ConstPath(_) | Expr::ConstResource(_) => Some(true),
        _ => None,
    }
}

fn try_fold_binary(op: BinaryOperator, left: &ExprNode, right: &ExprNode) -> Option<Expr> {
    match op {
        BinaryOperator::LogicalAnd => {
            // `false && x` folds to `false` without evaluating `x` (and
            // `x` may have side effects we must not drop in general, but
            // since we never fold across calls this is only reached when
            // `x` is itself side-effect-free or also constant).
            match const_truthiness(left) {
                Some(false) => Some(left.kind.clone()),
                Some(true) => Some(right.kind.clone()),
                None => None,
            }
        }
        BinaryOperator::LogicalOr => match const_truthiness(left) {
            Some(true) => Some(left.kind.clone()),
            Some(false) => Some(right.kind.clone()),
            None => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;

    fn node(kind: Expr) -> ExprNode {
        ExprNode::new(SourceLocation::synthetic(), kind)
    }

    #[test]
    fn negate_constant_integer_folds() {
        let mut expr = node(Expr::Unary {
            op: UnaryOperator::Negate,
            operand: Box::new(node(Expr::ConstInteger(5))),
        });
        fold_expr(&mut expr);
        assert!(matches!(expr.kind, Expr::ConstInteger(-5)));
    }

    #[test]
    fn logical_and_short_circuits_on_false_left() {
        let mut expr = node(Expr::Binary {
            op: BinaryOperator::LogicalAnd,
            left: Box::new(node(Expr::ConstInteger(0))),
            right: Box::new(node(Expr::Identifier("side_effecting".to_string()))),
        });
        fold_expr(&mut expr);
        assert!(matches!(expr.kind, Expr::ConstInteger(0)));
    }

    #[test]
    fn logical_or_keeps_right_when_left_is_falsy() {
        let mut expr = node(Expr::Binary {
            op: BinaryOperator::LogicalOr,
            left: Box::new(node(Expr::ConstNull)),
            right: Box::new(node(Expr::ConstInteger(7))),
        });
        fold_expr(&mut expr);
        assert!(matches!(expr.kind, Expr::ConstInteger(7)));
    }

    #[test]
    fn does_not_fold_non_constant_operands() {
        let mut expr = node(Expr::Unary {
            op: UnaryOperator::Negate,
            operand: Box::new(node(Expr::Identifier("x".to_string()))),
        });
        fold_expr(&mut expr);
        assert!(matches!(expr.kind, Expr::Unary { .. }));
    }
}
