//! Expression grammar, one precedence level per method, loosest binding
//! (`parse_expression`) down to `parse_primary`. Each level tries the
//! next-tighter level first and only handles the operators that belong to
//! it, the standard precedence-climbing shape.

use crate::{
    ast::{Arg, BinaryOperator, CallTarget, Expr, ExprNode, ListEntry, StringPiece, UnaryOperator},
    ast::stmt::AssignmentOperator,
    location::SourceLocation,
    token::{Keyword, Operator, PathSep, StringPart, TokenKind},
    value::ValueType,
};

use super::Parser;

impl<'t> Parser<'t> {
    pub(super) fn parse_expression(&mut self) -> ExprNode {
        if !self.depth.enter(self.settings.max_expression_depth) {
            let location = self.current_location();
            self.error("expression nested too deeply");
            return ExprNode::invalid(location);
        }
        let result = self.parse_assignment();
        self.depth.leave();
        result
    }

    fn parse_assignment(&mut self) -> ExprNode {
        let location = self.current_location();
        let target = self.parse_ternary();
        if let Some(op) = self.assignment_operator() {
            self.advance();
            let value = self.parse_assignment();
            return ExprNode::new(
                location,
                Expr::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
            );
        }
        target
    }

    fn assignment_operator(&self) -> Option<AssignmentOperator> {
        let TokenKind::Operator(op) = self.kind() else { return None };
        Some(match op {
            Operator::Assign => AssignmentOperator::Assign,
            Operator::PlusAssign => AssignmentOperator::AddAssign,
            Operator::MinusAssign => AssignmentOperator::SubtractAssign,
            Operator::StarAssign => AssignmentOperator::MultiplyAssign,
            Operator::SlashAssign => AssignmentOperator::DivideAssign,
            Operator::PercentAssign => AssignmentOperator::ModuloAssign,
            Operator::AndAssign => AssignmentOperator::AndAssign,
            Operator::OrAssign => AssignmentOperator::OrAssign,
            Operator::XorAssign => AssignmentOperator::XorAssign,
            Operator::ShlAssign => AssignmentOperator::ShiftLeftAssign,
            Operator::ShrAssign => AssignmentOperator::ShiftRightAssign,
            Operator::AndAndAssign => AssignmentOperator::LogicalAndAssign,
            Operator::OrOrAssign => AssignmentOperator::LogicalOrAssign,
            Operator::AssignInto => AssignmentOperator::AssignInto,
            _ => return None,
        })
    }

    fn parse_ternary(&mut self) -> ExprNode {
        let location = self.current_location();
        let condition = self.parse_range();
        if self.eat_operator(Operator::Question) {
            let if_true = self.parse_assignment();
            self.expect_path_sep(PathSep::Colon, "`:` in ternary expression");
            let if_false = self.parse_assignment();
            return ExprNode::new(
                location,
                Expr::Ternary {
                    condition: Box::new(condition),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                },
            );
        }
        condition
    }

    /// Free-standing `lo to hi`, outside the dedicated `for`/`switch` range
    /// fields that bypass this level and call `parse_logical_or` directly.
    fn parse_range(&mut self) -> ExprNode {
        let location = self.current_location();
        let low = self.parse_logical_or();
        if self.eat_keyword(Keyword::To) {
            let high = self.parse_logical_or();
            return ExprNode::new(
                location,
                Expr::Binary {
                    op: BinaryOperator::To,
                    left: Box::new(low),
                    right: Box::new(high),
                },
            );
        }
        low
    }

    /// Exposed for `for`/`switch` range fields, which need two separate
    /// expressions rather than a single `To`-shaped `Binary` node.
    pub(super) fn parse_logical_or(&mut self) -> ExprNode {
        let mut left = self.parse_logical_and();
        while self.eat_operator(Operator::OrOr) {
            let location = left.location;
            let right = self.parse_logical_and();
            left = binary(location, BinaryOperator::LogicalOr, left, right);
        }
        left
    }

    fn parse_logical_and(&mut self) -> ExprNode {
        let mut left = self.parse_bitwise_or();
        while self.eat_operator(Operator::AndAnd) {
            let location = left.location;
            let right = self.parse_bitwise_or();
            left = binary(location, BinaryOperator::LogicalAnd, left, right);
        }
        left
    }

    fn parse_bitwise_or(&mut self) -> ExprNode {
        let mut left = self.parse_bitwise_xor();
        while self.eat_operator(Operator::Pipe) {
            let location = left.location;
            let right = self.parse_bitwise_xor();
            left = binary(location, BinaryOperator::BitwiseOr, left, right);
        }
        left
    }

    fn parse_bitwise_xor(&mut self) -> ExprNode {
        let mut left = self.parse_bitwise_and();
        while self.eat_operator(Operator::Caret) {
            let location = left.location;
            let right = self.parse_bitwise_and();
            left = binary(location, BinaryOperator::BitwiseXor, left, right);
        }
        left
    }

    fn parse_bitwise_and(&mut self) -> ExprNode {
        let mut left = self.parse_equality();
        while self.eat_operator(Operator::Amp) {
            let location = left.location;
            let right = self.parse_equality();
            left = binary(location, BinaryOperator::BitwiseAnd, left, right);
        }
        left
    }

    fn parse_equality(&mut self) -> ExprNode {
        let mut left = self.parse_relational();
        loop {
            let op = if self.eat_operator(Operator::EqEq) {
                BinaryOperator::Equal
            } else if self.eat_operator(Operator::NotEq) {
                BinaryOperator::NotEqual
            } else if self.eat_operator(Operator::TildeEq) {
                BinaryOperator::Equivalent
            } else if self.eat_operator(Operator::TildeNotEq) {
                BinaryOperator::NotEquivalent
            } else {
                break;
            };
            let location = left.location;
            let right = self.parse_relational();
            left = binary(location, op, left, right);
        }
        left
    }

    fn parse_relational(&mut self) -> ExprNode {
        let mut left = self.parse_shift();
        loop {
            let op = if self.eat_operator(Operator::Lt) {
                BinaryOperator::Less
            } else if self.eat_operator(Operator::LtEq) {
                BinaryOperator::LessOrEqual
            } else if self.eat_operator(Operator::Gt) {
                BinaryOperator::Greater
            } else if self.eat_operator(Operator::GtEq) {
                BinaryOperator::GreaterOrEqual
            } else if self.eat_keyword(Keyword::In) {
                BinaryOperator::In
            } else {
                break;
            };
            let location = left.location;
            let right = self.parse_shift();
            left = binary(location, op, left, right);
        }
        left
    }

    fn parse_shift(&mut self) -> ExprNode {
        let mut left = self.parse_additive();
        loop {
            let op = if self.eat_operator(Operator::Shl) {
                BinaryOperator::LeftShift
            } else if self.eat_operator(Operator::Shr) {
                BinaryOperator::RightShift
            } else {
                break;
            };
            let location = left.location;
            let right = self.parse_additive();
            left = binary(location, op, left, right);
        }
        left
    }

    fn parse_additive(&mut self) -> ExprNode {
        let mut left = self.parse_multiplicative();
        loop {
            let op = if self.eat_operator(Operator::Plus) {
                BinaryOperator::Add
            } else if self.eat_operator(Operator::Minus) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            let location = left.location;
            let right = self.parse_multiplicative();
            left = binary(location, op, left, right);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> ExprNode {
        let mut left = self.parse_power();
        loop {
            let op = if self.eat_operator(Operator::Star) {
                BinaryOperator::Multiply
            } else if self.eat_path_sep(PathSep::Slash) {
                BinaryOperator::Divide
            } else if self.eat_operator(Operator::Percent) {
                BinaryOperator::Modulo
            } else {
                break;
            };
            let location = left.location;
            let right = self.parse_power();
            left = binary(location, op, left, right);
        }
        left
    }

    /// Right-associative: `2 ** 3 ** 2` is `2 ** (3 ** 2)`.
    fn parse_power(&mut self) -> ExprNode {
        let left = self.parse_unary();
        if self.eat_operator(Operator::StarStar) {
            let location = left.location;
            let right = self.parse_power();
            return binary(location, BinaryOperator::Power, left, right);
        }
        left
    }

    fn parse_unary(&mut self) -> ExprNode {
        let location = self.current_location();
        if self.eat_operator(Operator::Minus) {
            let operand = self.parse_unary();
            return ExprNode::new(location, Expr::Unary { op: UnaryOperator::Negate, operand: Box::new(operand) });
        }
        if self.eat_operator(Operator::Bang) {
            let operand = self.parse_unary();
            return ExprNode::new(location, Expr::Unary { op: UnaryOperator::Not, operand: Box::new(operand) });
        }
        if self.eat_operator(Operator::Tilde) {
            let operand = self.parse_unary();
            return ExprNode::new(location, Expr::Unary { op: UnaryOperator::BitNot, operand: Box::new(operand) });
        }
        if self.eat_operator(Operator::PlusPlus) {
            let operand = self.parse_unary();
            return ExprNode::new(location, Expr::Unary { op: UnaryOperator::PreIncrement, operand: Box::new(operand) });
        }
        if self.eat_operator(Operator::MinusMinus) {
            let operand = self.parse_unary();
            return ExprNode::new(location, Expr::Unary { op: UnaryOperator::PreDecrement, operand: Box::new(operand) });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ExprNode {
        let location = self.current_location();
        let mut expr = self.parse_primary();
        loop {
            if self.eat_path_sep(PathSep::Dot) {
                let field = self.expect_identifier_like("field or method name");
                expr = self.finish_field_or_call(location, expr, field, false);
            } else if self.eat_operator(Operator::QuestionDot) {
                let field = self.expect_identifier_like("field or method name");
                expr = self.finish_field_or_call(location, expr, field, true);
            } else if self.eat_path_sep(PathSep::Colon) {
                let field = self.expect_identifier_like("dynamic dispatch member name");
                expr = self.finish_field_or_call(location, expr, field, false);
            } else if self.eat_punct(|k| matches!(k, TokenKind::LeftBracket)) {
                let index = self.parse_expression();
                self.expect_punct(|k| matches!(k, TokenKind::RightBracket), "`]`");
                expr = ExprNode::new(location, Expr::DereferenceIndex { base: Box::new(expr), index: Box::new(index) });
            } else if matches!(self.kind(), TokenKind::LeftParen) {
                let args = self.parse_arg_list();
                let target = match expr.kind {
                    Expr::Identifier(name) => CallTarget::Identifier(name),
                    other => CallTarget::Expression(Box::new(ExprNode::new(expr.location, other))),
                };
                expr = ExprNode::new(location, Expr::Call { target, args });
            } else if self.eat_operator(Operator::PlusPlus) {
                expr = ExprNode::new(location, Expr::Unary { op: UnaryOperator::PostIncrement, operand: Box::new(expr) });
            } else if self.eat_operator(Operator::MinusMinus) {
                expr = ExprNode::new(location, Expr::Unary { op: UnaryOperator::PostDecrement, operand: Box::new(expr) });
            } else {
                break;
            }
        }
        expr
    }

    /// A `base.field`/`base:field` that isn't immediately called is a field
    /// dereference; one immediately followed by `(` is a method call on
    /// `base`, collapsing the intermediate field node the reference grammar
    /// never actually materializes.
    fn finish_field_or_call(&mut self, location: SourceLocation, base: ExprNode, field: String, safe: bool) -> ExprNode {
        if matches!(self.kind(), TokenKind::LeftParen) {
            let args = self.parse_arg_list();
            ExprNode::new(location, Expr::Call { target: CallTarget::Method { receiver: Box::new(base), name: field }, args })
        } else {
            ExprNode::new(location, Expr::DereferenceField { base: Box::new(base), field, safe })
        }
    }

    fn parse_primary(&mut self) -> ExprNode {
        let location = self.current_location();
        if matches!(self.kind(), TokenKind::PathSep(PathSep::Dot))
            && matches!(self.peek_kind_at(1), Some(TokenKind::PathSep(PathSep::Dot)))
            && matches!(self.peek_kind_at(2), Some(TokenKind::LeftParen))
        {
            self.advance();
            self.advance();
            let args = self.parse_arg_list();
            return ExprNode::new(location, Expr::Call { target: CallTarget::Super, args });
        }
        match self.kind().clone() {
            TokenKind::Integer(value) => {
                self.advance();
                ExprNode::new(location, Expr::ConstInteger(value))
            }
            TokenKind::Float(value) => {
                self.advance();
                ExprNode::new(location, Expr::ConstFloat(value))
            }
            TokenKind::String(parts) => {
                self.advance();
                self.build_string_literal(location, parts)
            }
            TokenKind::Resource(path) => {
                self.advance();
                ExprNode::new(location, Expr::ConstResource(path))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                ExprNode::new(location, Expr::ConstNull)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ExprNode::new(location, Expr::ConstInteger(1))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ExprNode::new(location, Expr::ConstInteger(0))
            }
            TokenKind::Keyword(Keyword::New) => self.parse_new_expression(),
            TokenKind::PathSep(PathSep::Slash | PathSep::Dot) => {
                let path = self.parse_type_path();
                ExprNode::new(location, Expr::ConstPath(path))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                match name.as_str() {
                    "list" if matches!(self.kind(), TokenKind::LeftParen) => {
                        let args = self.parse_positional_expr_list();
                        ExprNode::new(location, Expr::NewList(args))
                    }
                    "input" if matches!(self.kind(), TokenKind::LeftParen) => self.parse_input_expression(location),
                    "call" if matches!(self.kind(), TokenKind::LeftParen) => {
                        let call_args = self.parse_positional_expr_list();
                        let args = self.parse_arg_list();
                        ExprNode::new(location, Expr::Call { target: CallTarget::Dynamic { call_args }, args })
                    }
                    _ => ExprNode::new(location, Expr::Identifier(name)),
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
                inner
            }
            TokenKind::LeftBracket => self.parse_list_literal(location),
            _ => {
                self.error("expected an expression");
                self.advance();
                ExprNode::invalid(location)
            }
        }
    }

    fn build_string_literal(&mut self, location: SourceLocation, parts: Vec<StringPart>) -> ExprNode {
        if parts.iter().all(|p| matches!(p, StringPart::Literal(_))) {
            let text = parts
                .into_iter()
                .map(|p| match p {
                    StringPart::Literal(s) => s,
                    StringPart::Interpolation(_) => unreachable!(),
                })
                .collect::<String>();
            return ExprNode::new(location, Expr::ConstString(text));
        }
        let pieces = parts
            .into_iter()
            .map(|p| match p {
                StringPart::Literal(s) => StringPiece::Literal(s),
                StringPart::Interpolation(tokens) => {
                    let sub = Parser::from_tokens(tokens, &mut *self.diagnostics, self.settings);
                    StringPiece::Expr(sub.parse_interpolation_expr())
                }
            })
            .collect();
        ExprNode::new(location, Expr::InterpolatedString(pieces))
    }

    /// Entry point for a re-entrant sub-parser over one `[...]` piece's
    /// token slice: a single expression with no surrounding statement.
    fn parse_interpolation_expr(mut self) -> ExprNode {
        self.parse_expression()
    }

    fn parse_new_expression(&mut self) -> ExprNode {
        let location = self.current_location();
        self.advance();
        let path = if matches!(self.kind(), TokenKind::PathSep(PathSep::Slash | PathSep::Dot)) {
            Some(self.parse_type_path())
        } else {
            None
        };
        let target = if path.is_none() && matches!(self.kind(), TokenKind::LeftParen) {
            None
        } else if path.is_none() {
            Some(Box::new(self.parse_postfix()))
        } else {
            None
        };
        let args = if matches!(self.kind(), TokenKind::LeftParen) { self.parse_arg_list() } else { Vec::new() };
        ExprNode::new(location, Expr::New { path, target, args })
    }

    fn parse_input_expression(&mut self, location: SourceLocation) -> ExprNode {
        let args = self.parse_arg_list();
        let as_types = if self.eat_keyword(Keyword::As) {
            self.parse_as_type_clause().flags
        } else {
            ValueType::ANYTHING
        };
        let in_list = if self.eat_keyword(Keyword::In) { Some(Box::new(self.parse_logical_or())) } else { None };
        ExprNode::new(location, Expr::Input { args, as_types, in_list })
    }

    /// `[a, b=c, ...]`: no key means a plain list entry, `key = value` makes
    /// an associative one.
    fn parse_list_literal(&mut self, location: SourceLocation) -> ExprNode {
        self.advance();
        let mut entries = Vec::new();
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::RightBracket) && !self.is_eof() {
            if !self.check_progress() {
                break;
            }
            let first = self.parse_assignment();
            let entry = if self.eat_operator(Operator::Assign) {
                let value = self.parse_assignment();
                ListEntry { key: Some(first), value }
            } else {
                ListEntry { key: None, value: first }
            };
            entries.push(entry);
            self.skip_newlines();
            if !self.eat_punct(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_punct(|k| matches!(k, TokenKind::RightBracket), "`]`");
        ExprNode::new(location, Expr::ListLiteral(entries))
    }

    /// Parses `(arg, arg, ...)` where each `arg` may be `name = expr`
    /// (keyword argument) or a plain positional expression.
    pub(super) fn parse_arg_list(&mut self) -> Vec<Arg> {
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let mut args = Vec::new();
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::RightParen) && !self.is_eof() {
            if !self.check_progress() {
                break;
            }
            args.push(self.parse_arg());
            self.skip_newlines();
            if !self.eat_punct(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        args
    }

    fn parse_arg(&mut self) -> Arg {
        if let TokenKind::Identifier(name) = self.kind().clone() {
            if matches!(self.peek_kind_at(1), Some(TokenKind::Operator(Operator::Assign))) {
                self.advance();
                self.advance();
                let value = self.parse_assignment();
                return Arg::Named(name, value);
            }
        }
        Arg::Positional(self.parse_assignment())
    }

    /// `(expr, expr, ...)` with no keyword-argument form, used by `list(...)`
    /// and as `call(...)`'s first, callee-selecting argument list.
    fn parse_positional_expr_list(&mut self) -> Vec<ExprNode> {
        self.expect_punct(|k| matches!(k, TokenKind::LeftParen), "`(`");
        let mut exprs = Vec::new();
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::RightParen) && !self.is_eof() {
            if !self.check_progress() {
                break;
            }
            exprs.push(self.parse_assignment());
            self.skip_newlines();
            if !self.eat_punct(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_punct(|k| matches!(k, TokenKind::RightParen), "`)`");
        exprs
    }
}

fn binary(location: SourceLocation, op: BinaryOperator, left: ExprNode, right: ExprNode) -> ExprNode {
    ExprNode::new(location, Expr::Binary { op, left: Box::new(left), right: Box::new(right) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::Diagnostics, location::SourceLocation, settings::CompilerSettings, token::Token};

    fn loc() -> SourceLocation {
        SourceLocation::synthetic()
    }

    fn toks(kinds: Vec<TokenKind>) -> Vec<Token> {
        let mut tokens: Vec<Token> = kinds.into_iter().map(|k| Token::new(k, loc())).collect();
        tokens.push(Token::new(TokenKind::EndOfFile, loc()));
        tokens
    }

    fn parse_expr(kinds: Vec<TokenKind>) -> (ExprNode, Diagnostics) {
        let mut diags = Diagnostics::new();
        let settings = CompilerSettings::default();
        let expr = {
            let mut parser = Parser::new(toks(kinds), &mut diags, &settings);
            parser.parse_expression()
        };
        (expr, diags)
    }

    #[test]
    fn additive_is_left_associative() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Integer(1),
            TokenKind::Operator(Operator::Plus),
            TokenKind::Integer(2),
            TokenKind::Operator(Operator::Minus),
            TokenKind::Integer(3),
        ]);
        let Expr::Binary { op: BinaryOperator::Subtract, left, .. } = expr.kind else { panic!("expected subtract at top") };
        assert!(matches!(left.kind, Expr::Binary { op: BinaryOperator::Add, .. }));
    }

    #[test]
    fn power_is_right_associative() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Integer(2),
            TokenKind::Operator(Operator::StarStar),
            TokenKind::Integer(3),
            TokenKind::Operator(Operator::StarStar),
            TokenKind::Integer(2),
        ]);
        let Expr::Binary { op: BinaryOperator::Power, right, .. } = expr.kind else { panic!("expected power at top") };
        assert!(matches!(right.kind, Expr::Binary { op: BinaryOperator::Power, .. }));
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Integer(1),
            TokenKind::Operator(Operator::Plus),
            TokenKind::Integer(2),
            TokenKind::Operator(Operator::Star),
            TokenKind::Integer(3),
        ]);
        let Expr::Binary { op: BinaryOperator::Add, right, .. } = expr.kind else { panic!("expected add at top") };
        assert!(matches!(right.kind, Expr::Binary { op: BinaryOperator::Multiply, .. }));
    }

    #[test]
    fn ternary_nests_on_the_false_branch() {
        let (expr, diags) = parse_expr(vec![
            TokenKind::Identifier("a".to_owned()),
            TokenKind::Operator(Operator::Question),
            TokenKind::Identifier("b".to_owned()),
            TokenKind::PathSep(PathSep::Colon),
            TokenKind::Identifier("c".to_owned()),
        ]);
        assert!(!diags.has_errors());
        assert!(matches!(expr.kind, Expr::Ternary { .. }));
    }

    #[test]
    fn field_access_collapses_into_method_call() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Identifier("src".to_owned()),
            TokenKind::PathSep(PathSep::Dot),
            TokenKind::Identifier("bump".to_owned()),
            TokenKind::LeftParen,
            TokenKind::RightParen,
        ]);
        let Expr::Call { target: CallTarget::Method { name, .. }, .. } = expr.kind else { panic!("expected method call") };
        assert_eq!(name, "bump");
    }

    #[test]
    fn bare_field_access_stays_a_dereference() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Identifier("src".to_owned()),
            TokenKind::PathSep(PathSep::Dot),
            TokenKind::Identifier("name".to_owned()),
        ]);
        assert!(matches!(expr.kind, Expr::DereferenceField { safe: false, .. }));
    }

    #[test]
    fn super_call_parses_with_no_path_segments() {
        let (expr, _) = parse_expr(vec![
            TokenKind::PathSep(PathSep::Dot),
            TokenKind::PathSep(PathSep::Dot),
            TokenKind::LeftParen,
            TokenKind::RightParen,
        ]);
        assert!(matches!(expr.kind, Expr::Call { target: CallTarget::Super, .. }));
    }

    #[test]
    fn list_call_produces_newlist_node() {
        let (expr, _) = parse_expr(vec![
            TokenKind::Identifier("list".to_owned()),
            TokenKind::LeftParen,
            TokenKind::Integer(1),
            TokenKind::Comma,
            TokenKind::Integer(2),
            TokenKind::RightParen,
        ]);
        let Expr::NewList(items) = expr.kind else { panic!("expected NewList") };
        assert_eq!(items.len(), 2);
    }
}
