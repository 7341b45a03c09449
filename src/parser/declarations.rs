//! Declaration parsing: specifiers, declarators, initializers.

use super::Parser;
use crate::ast::{
    BasicSpec, DeclSpecifiers, Declaration, Declarator, DeclaratorPart, Enumerator, ExternalDecl,
    FunctionDef, InitDeclarator, Initializer, ParamDecl, RecordKeyword, StorageClass,
    StructMemberDecl, StructMemberDeclarator, TypeName, TypeQualifiers, TypeSpec, TypeSpecNode,
};
use crate::error::{CResult, CompilerError};
use crate::lexer::TokenKind;
use thin_vec::ThinVec;

impl Parser {
    /// True when the next token opens a declaration.
    pub(super) fn starts_declaration(&self) -> bool {
        match self.peek() {
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
            | TokenKind::Typedef
            | TokenKind::Extern
            | TokenKind::Static
            | TokenKind::Auto
            | TokenKind::Register
            | TokenKind::Const
            | TokenKind::Volatile
            | TokenKind::Inline => true,
            TokenKind::Identifier(name) => self.is_typedef_name(name),
            _ => false,
        }
    }

    /// Parse one external declaration, which is a function definition when a
    /// function declarator is directly followed by `{`.
    pub(super) fn parse_declaration_or_function(&mut self) -> CResult<ExternalDecl> {
        let loc = self.loc();
        let specifiers = self.parse_decl_specifiers()?;

        if self.accept(TokenKind::Semicolon) {
            // Specifier-only declaration such as `struct s { … };`.
            return Ok(ExternalDecl::Declaration(Declaration {
                specifiers,
                declarators: ThinVec::new(),
                loc,
            }));
        }

        let declarator = self.parse_declarator()?;
        if self.peek() == TokenKind::LeftBrace
            && matches!(declarator.parts.first(), Some(DeclaratorPart::Function { .. }))
        {
            if let Some(name) = declarator.name {
                self.register_name(name, false);
            }
            let body = self.parse_compound_stmt()?;
            return Ok(ExternalDecl::FunctionDef(FunctionDef {
                specifiers,
                declarator,
                body,
            }));
        }

        let declaration = self.finish_declaration(specifiers, declarator, loc)?;
        Ok(ExternalDecl::Declaration(declaration))
    }

    /// Parse a declaration statement inside a block.
    pub(super) fn parse_declaration(&mut self) -> CResult<Declaration> {
        let loc = self.loc();
        let specifiers = self.parse_decl_specifiers()?;
        if self.accept(TokenKind::Semicolon) {
            return Ok(Declaration {
                specifiers,
                declarators: ThinVec::new(),
                loc,
            });
        }
        let declarator = self.parse_declarator()?;
        self.finish_declaration(specifiers, declarator, loc)
    }

    /// Shared tail of a declaration: the init-declarator list after its
    /// first declarator, up to and including `;`.
    fn finish_declaration(
        &mut self,
        specifiers: DeclSpecifiers,
        first: Declarator,
        loc: crate::source::SourceLoc,
    ) -> CResult<Declaration> {
        let is_typedef = specifiers.storage == Some(StorageClass::Typedef);
        let mut declarators = ThinVec::new();

        let mut declarator = first;
        loop {
            if let Some(name) = declarator.name {
                self.register_name(name, is_typedef);
            }
            let init = if self.accept(TokenKind::Assign) {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            declarators.push(InitDeclarator {
                declarator,
                init,
                resolved: None,
            });
            if !self.accept(TokenKind::Comma) {
                break;
            }
            declarator = self.parse_declarator()?;
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(Declaration {
            specifiers,
            declarators,
            loc,
        })
    }

    /// Parse declaration specifiers: storage class, qualifiers and exactly
    /// one type specification (possibly spread over several keywords).
    pub(super) fn parse_decl_specifiers(&mut self) -> CResult<DeclSpecifiers> {
        let start = self.loc();
        let mut storage: Option<StorageClass> = None;
        let mut qualifiers = TypeQualifiers::empty();
        let mut basic = BasicSpec::default();
        let mut seen_basic = false;
        let mut type_spec: Option<TypeSpecNode> = None;

        loop {
            let loc = self.loc();
            match self.peek() {
                TokenKind::Typedef => self.set_storage(&mut storage, StorageClass::Typedef)?,
                TokenKind::Extern => self.set_storage(&mut storage, StorageClass::Extern)?,
                TokenKind::Static => self.set_storage(&mut storage, StorageClass::Static)?,
                TokenKind::Auto => self.set_storage(&mut storage, StorageClass::Auto)?,
                TokenKind::Register => self.set_storage(&mut storage, StorageClass::Register)?,
                TokenKind::Inline => {
                    self.advance();
                }
                TokenKind::Const => {
                    qualifiers |= TypeQualifiers::CONST;
                    self.advance();
                }
                TokenKind::Volatile => {
                    qualifiers |= TypeQualifiers::VOLATILE;
                    self.advance();
                }
                TokenKind::Void => {
                    basic.void = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Char => {
                    basic.char = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Short => {
                    basic.short = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Int => {
                    basic.int = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Long => {
                    basic.long_count += 1;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Float => {
                    basic.float = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Double => {
                    basic.double = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Signed => {
                    basic.signed = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Unsigned => {
                    basic.unsigned = true;
                    seen_basic = true;
                    self.advance();
                }
                TokenKind::Struct | TokenKind::Union => {
                    if seen_basic || type_spec.is_some() {
                        break;
                    }
                    type_spec = Some(self.parse_record_spec()?);
                }
                TokenKind::Enum => {
                    if seen_basic || type_spec.is_some() {
                        break;
                    }
                    type_spec = Some(self.parse_enum_spec()?);
                }
                TokenKind::Identifier(name) => {
                    if seen_basic || type_spec.is_some() || !self.is_typedef_name(name) {
                        break;
                    }
                    self.advance();
                    type_spec = Some(TypeSpecNode {
                        kind: TypeSpec::TypedefName(name),
                        loc,
                    });
                }
                _ => break,
            }
        }

        let type_spec = match type_spec {
            Some(spec) => {
                if seen_basic {
                    return Err(CompilerError::syntax("Invalid type specification", start));
                }
                spec
            }
            None => {
                if !seen_basic {
                    return Err(CompilerError::syntax("Expected type specifier", start));
                }
                TypeSpecNode {
                    kind: TypeSpec::Basic(basic),
                    loc: start,
                }
            }
        };

        Ok(DeclSpecifiers {
            storage,
            qualifiers,
            type_spec,
        })
    }

    fn set_storage(
        &mut self,
        storage: &mut Option<StorageClass>,
        class: StorageClass,
    ) -> CResult<()> {
        let loc = self.loc();
        self.advance();
        if storage.is_some() {
            return Err(CompilerError::syntax(
                "Multiple storage class specifiers",
                loc,
            ));
        }
        *storage = Some(class);
        Ok(())
    }

    fn parse_record_spec(&mut self) -> CResult<TypeSpecNode> {
        let loc = self.loc();
        let keyword = match self.advance().kind {
            TokenKind::Struct => RecordKeyword::Struct,
            _ => RecordKeyword::Union,
        };
        let tag = match self.peek() {
            TokenKind::Identifier(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let members = if self.accept(TokenKind::LeftBrace) {
            let mut members = Vec::new();
            while self.peek() != TokenKind::RightBrace {
                members.push(self.parse_struct_member_decl()?);
            }
            self.expect(TokenKind::RightBrace)?;
            Some(members)
        } else {
            if tag.is_none() {
                return Err(CompilerError::syntax("Expected identifier", self.loc()));
            }
            None
        };
        Ok(TypeSpecNode {
            kind: TypeSpec::Record {
                keyword,
                tag,
                members,
            },
            loc,
        })
    }

    fn parse_struct_member_decl(&mut self) -> CResult<StructMemberDecl> {
        let loc = self.loc();
        let specifiers = self.parse_decl_specifiers()?;
        let mut declarators = ThinVec::new();
        if !self.accept(TokenKind::Semicolon) {
            loop {
                // `int :3;` pads without naming a member.
                let declarator = if self.peek() == TokenKind::Colon {
                    Declarator {
                        name: None,
                        parts: ThinVec::new(),
                        loc: self.loc(),
                    }
                } else {
                    self.parse_declarator()?
                };
                let bit_width = if self.accept(TokenKind::Colon) {
                    Some(self.parse_conditional_expr()?)
                } else {
                    None
                };
                declarators.push(StructMemberDeclarator {
                    declarator,
                    bit_width,
                });
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(StructMemberDecl {
            specifiers,
            declarators,
            loc,
        })
    }

    fn parse_enum_spec(&mut self) -> CResult<TypeSpecNode> {
        let loc = self.loc();
        self.advance(); // enum
        let tag = match self.peek() {
            TokenKind::Identifier(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let enumerators = if self.accept(TokenKind::LeftBrace) {
            let mut list = Vec::new();
            loop {
                let (name, name_loc) = self.expect_identifier()?;
                let value = if self.accept(TokenKind::Assign) {
                    Some(self.parse_conditional_expr()?)
                } else {
                    None
                };
                self.register_name(name, false);
                list.push(Enumerator {
                    name,
                    value,
                    loc: name_loc,
                });
                if !self.accept(TokenKind::Comma) {
                    break;
                }
                if self.peek() == TokenKind::RightBrace {
                    break; // trailing comma
                }
            }
            self.expect(TokenKind::RightBrace)?;
            Some(list)
        } else {
            if tag.is_none() {
                return Err(CompilerError::syntax("Expected identifier", self.loc()));
            }
            None
        };
        Ok(TypeSpecNode {
            kind: TypeSpec::Enum { tag, enumerators },
            loc,
        })
    }

    /// Parse a (possibly abstract) declarator. Parts end up in reading
    /// order starting from the name, so resolving folds them in reverse.
    pub(super) fn parse_declarator(&mut self) -> CResult<Declarator> {
        let mut pointers = Vec::new();
        while self.accept(TokenKind::Star) {
            let mut quals = TypeQualifiers::empty();
            loop {
                match self.peek() {
                    TokenKind::Const => {
                        quals |= TypeQualifiers::CONST;
                        self.advance();
                    }
                    TokenKind::Volatile => {
                        quals |= TypeQualifiers::VOLATILE;
                        self.advance();
                    }
                    _ => break,
                }
            }
            pointers.push(DeclaratorPart::Pointer(quals));
        }
        let mut declarator = self.parse_direct_declarator()?;
        declarator.parts.extend(pointers.into_iter().rev());
        Ok(declarator)
    }

    fn parse_direct_declarator(&mut self) -> CResult<Declarator> {
        let loc = self.loc();
        let mut declarator = match self.peek() {
            TokenKind::Identifier(name) => {
                self.advance();
                Declarator {
                    name: Some(name),
                    parts: ThinVec::new(),
                    loc,
                }
            }
            TokenKind::LeftParen if self.parens_hold_declarator() => {
                self.advance();
                let inner = self.parse_declarator()?;
                self.expect(TokenKind::RightParen)?;
                inner
            }
            _ => Declarator {
                name: None,
                parts: ThinVec::new(),
                loc,
            },
        };

        loop {
            match self.peek() {
                TokenKind::LeftBracket => {
                    self.advance();
                    let size = if self.peek() == TokenKind::RightBracket {
                        None
                    } else {
                        Some(self.parse_conditional_expr()?)
                    };
                    self.expect(TokenKind::RightBracket)?;
                    declarator.parts.push(DeclaratorPart::Array(size));
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let (params, variadic, unspecified) = self.parse_param_list()?;
                    declarator.parts.push(DeclaratorPart::Function {
                        params,
                        variadic,
                        unspecified,
                    });
                }
                _ => break,
            }
        }
        Ok(declarator)
    }

    /// Decide whether `(` opens a nested declarator rather than a parameter
    /// list. A parameter list starts with `)`, `...` or declaration
    /// specifiers; anything else nests.
    fn parens_hold_declarator(&self) -> bool {
        match self.peek_at(1) {
            TokenKind::Star | TokenKind::LeftParen | TokenKind::LeftBracket => true,
            TokenKind::Identifier(name) => !self.is_typedef_name(name),
            _ => false,
        }
    }

    /// Parse the inside of a function parameter list, consuming `)`.
    fn parse_param_list(&mut self) -> CResult<(Vec<ParamDecl>, bool, bool)> {
        if self.accept(TokenKind::RightParen) {
            return Ok((Vec::new(), false, true));
        }
        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.accept(TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            let specifiers = self.parse_decl_specifiers()?;
            let declarator = self.parse_declarator()?;
            params.push(ParamDecl {
                specifiers,
                declarator,
                ty: None,
            });
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        // `(void)` declares an empty parameter list.
        if params.len() == 1 && !variadic {
            let only = &params[0];
            let is_plain_void = matches!(
                only.specifiers.type_spec.kind,
                TypeSpec::Basic(BasicSpec { void: true, .. })
            ) && only.declarator.name.is_none()
                && only.declarator.parts.is_empty();
            if is_plain_void {
                params.clear();
            }
        }
        Ok((params, variadic, false))
    }

    /// Parse a type name as used by casts and `sizeof`.
    pub(super) fn parse_type_name(&mut self) -> CResult<TypeName> {
        let specifiers = self.parse_decl_specifiers()?;
        let declarator = self.parse_declarator()?;
        if declarator.name.is_some() {
            return Err(CompilerError::syntax(
                "Type name must not declare an identifier",
                declarator.loc,
            ));
        }
        Ok(TypeName {
            specifiers,
            declarator,
        })
    }

    fn parse_initializer(&mut self) -> CResult<Initializer> {
        if self.accept(TokenKind::LeftBrace) {
            let mut items = Vec::new();
            loop {
                if self.peek() == TokenKind::RightBrace {
                    break;
                }
                items.push(self.parse_initializer()?);
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RightBrace)?;
            Ok(Initializer::List(items))
        } else {
            Ok(Initializer::Expr(self.parse_assign_expr()?))
        }
    }
}
