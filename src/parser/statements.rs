//! Statement parsing.

use super::Parser;
use crate::ast::{BlockItem, ForInit, Stmt};
use crate::error::{CResult, CompilerError};
use crate::lexer::TokenKind;
use log::trace;

impl Parser {
    pub(super) fn parse_compound_stmt(&mut self) -> CResult<Stmt> {
        self.expect(TokenKind::LeftBrace)?;
        self.push_name_scope();
        let mut items = Vec::new();
        while self.peek() != TokenKind::RightBrace {
            if self.peek() == TokenKind::EndOfFile {
                self.pop_name_scope();
                return Err(CompilerError::syntax("Expected \"}\"", self.loc()));
            }
            if self.starts_declaration() {
                items.push(BlockItem::Declaration(self.parse_declaration()?));
            } else {
                items.push(BlockItem::Stmt(self.parse_stmt()?));
            }
        }
        self.expect(TokenKind::RightBrace)?;
        self.pop_name_scope();
        Ok(Stmt::Compound(items))
    }

    pub(super) fn parse_stmt(&mut self) -> CResult<Stmt> {
        let loc = self.loc();
        match self.peek() {
            TokenKind::LeftBrace => self.parse_compound_stmt(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::If => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                let then_stmt = Box::new(self.parse_stmt()?);
                let else_stmt = if self.accept(TokenKind::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_stmt,
                    else_stmt,
                })
            }
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::While { cond, body })
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_stmt()?);
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::DoWhile { body, cond })
            }
            TokenKind::For => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                self.push_name_scope();
                let init = if self.accept(TokenKind::Semicolon) {
                    None
                } else if self.starts_declaration() {
                    Some(ForInit::Declaration(self.parse_declaration()?))
                } else {
                    let expr = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    Some(ForInit::Expr(expr))
                };
                let cond = if self.peek() == TokenKind::Semicolon {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                let step = if self.peek() == TokenKind::RightParen {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::RightParen)?;
                let body = Box::new(self.parse_stmt()?);
                self.pop_name_scope();
                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                })
            }
            TokenKind::Switch => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                self.enter_switch();
                let body = self.parse_stmt();
                self.leave_switch();
                Ok(Stmt::Switch {
                    cond,
                    body: Box::new(body?),
                    loc,
                })
            }
            TokenKind::Case => {
                if !self.in_switch() {
                    return Err(CompilerError::syntax(
                        "Case statement outside a switch",
                        loc,
                    ));
                }
                self.advance();
                let value = self.parse_conditional_expr()?;
                self.expect(TokenKind::Colon)?;
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Case { value, stmt, loc })
            }
            TokenKind::Default => {
                if !self.in_switch() {
                    return Err(CompilerError::syntax(
                        "Default statement outside a switch",
                        loc,
                    ));
                }
                self.advance();
                self.expect(TokenKind::Colon)?;
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Default { stmt, loc })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break(loc))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue(loc))
            }
            TokenKind::Goto => {
                self.advance();
                let (label, _) = self.expect_identifier()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Goto { label, loc })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.peek() == TokenKind::Semicolon {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return { value, loc })
            }
            TokenKind::Identifier(label) if self.peek_at(1) == TokenKind::Colon => {
                trace!("label '{}'", label);
                self.advance();
                self.advance();
                let stmt = Box::new(self.parse_stmt()?);
                Ok(Stmt::Labeled { label, stmt, loc })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::options::COptions;

    fn parse(src: &str) -> CResult<crate::ast::TranslationUnit> {
        let tokens = Lexer::new(src, &COptions::default()).tokenize()?;
        Parser::new(tokens).parse_translation_unit()
    }

    #[test]
    fn function_with_control_flow() {
        let src = r#"
        int main(int a) {
            int b = 0;
            for (int i = 0; i < a; i++) {
                if (i % 2 == 0)
                    b += i;
                else
                    continue;
            }
            while (b > 100) { b--; }
            do { b++; } while (b < 10);
            return b;
        }
        "#;
        parse(src).unwrap();
    }

    #[test]
    fn bitfield_outside_struct_is_rejected() {
        let err = parse("\nint b:2;\n").unwrap_err();
        assert_eq!(err.message, "Expected \";\"");
        assert_eq!(err.loc.row, 2);
    }

    #[test]
    fn case_outside_switch_is_rejected() {
        let err = parse("\nint main() {\n case 234: break; }").unwrap_err();
        assert!(err.message.contains("Case statement outside"));
        assert_eq!(err.loc.row, 3);
    }

    #[test]
    fn default_outside_switch_is_rejected() {
        let err = parse("\nint main() {\n default: break; }").unwrap_err();
        assert!(err.message.contains("Default statement outside"));
        assert_eq!(err.loc.row, 3);
    }

    #[test]
    fn declarator_shapes() {
        use crate::ast::{DeclaratorPart, ExternalDecl};
        let unit = parse("int *a[3];\nint (*p)[3];\n").unwrap();
        let decl = |i: usize| match &unit.decls[i] {
            ExternalDecl::Declaration(d) => &d.declarators[0].declarator,
            _ => panic!("expected declaration"),
        };
        assert!(matches!(
            decl(0).parts.as_slice(),
            [DeclaratorPart::Array(Some(_)), DeclaratorPart::Pointer(_)]
        ));
        assert!(matches!(
            decl(1).parts.as_slice(),
            [DeclaratorPart::Pointer(_), DeclaratorPart::Array(Some(_))]
        ));
    }

    #[test]
    fn typedef_names_disambiguate() {
        let src = r#"
        typedef int mytype;
        mytype x;
        int main() {
            mytype y = (mytype)2;
            return y;
        }
        "#;
        parse(src).unwrap();
    }

    #[test]
    fn unnamed_parameters() {
        parse("int add(int, int c) { return c; }").unwrap();
    }

    #[test]
    fn sizeof_forms() {
        parse("int main() { int w = sizeof w; return sizeof(int *(void)); }").unwrap();
    }
}
