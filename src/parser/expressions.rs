//! Expression parsing by precedence climbing.

use super::Parser;
use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::{CResult, CompilerError};
use crate::lexer::TokenKind;
use symbol_table::GlobalSymbol as Symbol;

/// Binding power of a binary operator, or `None` for non-operators.
fn binary_precedence(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::LogicalOr => (BinaryOp::LogicalOr, 1),
        TokenKind::LogicalAnd => (BinaryOp::LogicalAnd, 2),
        TokenKind::Pipe => (BinaryOp::BitOr, 3),
        TokenKind::Caret => (BinaryOp::BitXor, 4),
        TokenKind::Amp => (BinaryOp::BitAnd, 5),
        TokenKind::EqualEqual => (BinaryOp::Eq, 6),
        TokenKind::NotEqual => (BinaryOp::Ne, 6),
        TokenKind::Less => (BinaryOp::Lt, 7),
        TokenKind::Greater => (BinaryOp::Gt, 7),
        TokenKind::LessEqual => (BinaryOp::Le, 7),
        TokenKind::GreaterEqual => (BinaryOp::Ge, 7),
        TokenKind::LeftShift => (BinaryOp::Shl, 8),
        TokenKind::RightShift => (BinaryOp::Shr, 8),
        TokenKind::Plus => (BinaryOp::Add, 9),
        TokenKind::Minus => (BinaryOp::Sub, 9),
        TokenKind::Star => (BinaryOp::Mul, 10),
        TokenKind::Slash => (BinaryOp::Div, 10),
        TokenKind::Percent => (BinaryOp::Rem, 10),
        _ => return None,
    };
    Some(entry)
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::PlusAssign => AssignOp::Add,
        TokenKind::MinusAssign => AssignOp::Sub,
        TokenKind::StarAssign => AssignOp::Mul,
        TokenKind::SlashAssign => AssignOp::Div,
        TokenKind::PercentAssign => AssignOp::Rem,
        TokenKind::LeftShiftAssign => AssignOp::Shl,
        TokenKind::RightShiftAssign => AssignOp::Shr,
        TokenKind::AmpAssign => AssignOp::BitAnd,
        TokenKind::PipeAssign => AssignOp::BitOr,
        TokenKind::CaretAssign => AssignOp::BitXor,
        _ => return None,
    };
    Some(op)
}

impl Parser {
    /// Full expression, including the comma operator.
    pub(super) fn parse_expr(&mut self) -> CResult<Expr> {
        let mut expr = self.parse_assign_expr()?;
        while self.peek() == TokenKind::Comma {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_assign_expr()?;
            expr = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Comma,
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(expr)
    }

    pub(super) fn parse_assign_expr(&mut self) -> CResult<Expr> {
        let lhs = self.parse_conditional_expr()?;
        if let Some(op) = assign_op(self.peek()) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_assign_expr()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            ));
        }
        Ok(lhs)
    }

    pub(super) fn parse_conditional_expr(&mut self) -> CResult<Expr> {
        let cond = self.parse_binary_expr(1)?;
        if self.peek() != TokenKind::Question {
            return Ok(cond);
        }
        let loc = self.loc();
        self.advance();
        let then_expr = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_assign_expr()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            loc,
        ))
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> CResult<Expr> {
        let mut lhs = self.parse_cast_expr()?;
        while let Some((op, prec)) = binary_precedence(self.peek()) {
            if prec < min_prec {
                break;
            }
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_binary_expr(prec + 1)?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                loc,
            );
        }
        Ok(lhs)
    }

    /// True when `(` at the cursor is followed by the start of a type name.
    fn paren_opens_type(&self) -> bool {
        if self.peek() != TokenKind::LeftParen {
            return false;
        }
        match self.peek_at(1) {
            TokenKind::Void
            | TokenKind::Char
            | TokenKind::Short
            | TokenKind::Int
            | TokenKind::Long
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Signed
            | TokenKind::Unsigned
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Const
            | TokenKind::Volatile => true,
            TokenKind::Identifier(name) => self.is_typedef_name(name),
            _ => false,
        }
    }

    fn parse_cast_expr(&mut self) -> CResult<Expr> {
        if self.paren_opens_type() {
            let loc = self.loc();
            self.advance();
            let type_name = self.parse_type_name()?;
            self.expect(TokenKind::RightParen)?;
            let operand = self.parse_cast_expr()?;
            return Ok(Expr::new(
                ExprKind::Cast {
                    type_name: Box::new(type_name),
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_unary_expr()
    }

    fn parse_unary_expr(&mut self) -> CResult<Expr> {
        let loc = self.loc();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Bang => Some(UnaryOp::LogicalNot),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_cast_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }

        match self.peek() {
            TokenKind::Increment | TokenKind::Decrement => {
                let inc = self.peek() == TokenKind::Increment;
                self.advance();
                let operand = self.parse_unary_expr()?;
                Ok(Expr::new(
                    ExprKind::PreIncDec {
                        inc,
                        operand: Box::new(operand),
                    },
                    loc,
                ))
            }
            TokenKind::Sizeof => {
                self.advance();
                if self.paren_opens_type() {
                    self.advance();
                    let type_name = self.parse_type_name()?;
                    self.expect(TokenKind::RightParen)?;
                    Ok(Expr::new(ExprKind::SizeofType(Box::new(type_name)), loc))
                } else {
                    let operand = self.parse_unary_expr()?;
                    Ok(Expr::new(ExprKind::SizeofExpr(Box::new(operand)), loc))
                }
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> CResult<Expr> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            let loc = self.loc();
            match self.peek() {
                TokenKind::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek() != TokenKind::RightParen {
                        loop {
                            args.push(self.parse_assign_expr()?);
                            if !self.accept(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RightParen)?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        loc,
                    );
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RightBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        loc,
                    );
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.peek() == TokenKind::Arrow;
                    self.advance();
                    let (field, _) = self.expect_identifier()?;
                    expr = Expr::new(
                        ExprKind::Member {
                            base: Box::new(expr),
                            field,
                            arrow,
                        },
                        loc,
                    );
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    let inc = self.peek() == TokenKind::Increment;
                    self.advance();
                    expr = Expr::new(
                        ExprKind::PostIncDec {
                            inc,
                            operand: Box::new(expr),
                        },
                        loc,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary_expr(&mut self) -> CResult<Expr> {
        let loc = self.loc();
        match self.peek() {
            TokenKind::IntLiteral { value, suffix } => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral { value, suffix }, loc))
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::FloatLiteral(value), loc))
            }
            TokenKind::CharLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::CharLiteral(value), loc))
            }
            TokenKind::StringLiteral(first) => {
                self.advance();
                // Adjacent string literals concatenate.
                let mut text = first.as_str().to_string();
                let mut joined = false;
                while let TokenKind::StringLiteral(next) = self.peek() {
                    self.advance();
                    text.push_str(next.as_str());
                    joined = true;
                }
                let symbol = if joined {
                    Symbol::from(text.as_str())
                } else {
                    first
                };
                Ok(Expr::new(ExprKind::StringLiteral(symbol), loc))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Ident {
                        name,
                        resolved: None,
                    },
                    loc,
                ))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            other => Err(CompilerError::syntax(
                format!("Unexpected token \"{}\"", other.text()),
                loc,
            )),
        }
    }
}
