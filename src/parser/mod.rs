//! Recursive-descent parser.
//!
//! Consumes the token stream and produces a [`TranslationUnit`]. The parser
//! keeps its own stack of declared names so a typedef name can be told apart
//! from an expression at the start of a statement; it performs no other
//! semantic work. The first unexpected token aborts with a syntax error at
//! that token's location.

mod declarations;
mod expressions;
mod statements;

use crate::ast::{ExternalDecl, TranslationUnit};
use crate::error::{CResult, CompilerError};
use crate::lexer::{Token, TokenKind};
use crate::source::SourceLoc;
use hashbrown::HashMap;
use log::debug;
use symbol_table::GlobalSymbol as Symbol;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Per-scope name table; `true` marks a typedef name. A variable
    /// declared over an outer typedef name shadows it.
    names: Vec<HashMap<Symbol, bool>>,
    switch_depth: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            names: vec![HashMap::new()],
            switch_depth: 0,
        }
    }

    pub fn parse_translation_unit(mut self) -> CResult<TranslationUnit> {
        let mut decls = Vec::new();
        while !matches!(self.peek(), TokenKind::EndOfFile) {
            decls.push(self.parse_external_decl()?);
        }
        debug!("parsed {} external declarations", decls.len());
        Ok(TranslationUnit { decls })
    }

    fn parse_external_decl(&mut self) -> CResult<ExternalDecl> {
        self.parse_declaration_or_function()
    }

    // Cursor primitives.

    pub(super) fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    pub(super) fn peek_at(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfFile)
    }

    pub(super) fn loc(&self) -> SourceLoc {
        self.tokens[self.pos].loc
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if !matches!(token.kind, TokenKind::EndOfFile) {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it matches.
    pub(super) fn accept(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require the next token to match, or fail with `Expected "…"`.
    pub(super) fn expect(&mut self, kind: TokenKind) -> CResult<Token> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(CompilerError::syntax(
                format!("Expected \"{}\"", kind.text()),
                self.loc(),
            ))
        }
    }

    pub(super) fn expect_identifier(&mut self) -> CResult<(Symbol, SourceLoc)> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let token = self.advance();
                Ok((name, token.loc))
            }
            _ => Err(CompilerError::syntax("Expected identifier", self.loc())),
        }
    }

    // Name tracking for typedef disambiguation.

    pub(super) fn push_name_scope(&mut self) {
        self.names.push(HashMap::new());
    }

    pub(super) fn pop_name_scope(&mut self) {
        self.names.pop();
    }

    pub(super) fn register_name(&mut self, name: Symbol, is_typedef: bool) {
        self.names
            .last_mut()
            .expect("name scope stack is never empty")
            .insert(name, is_typedef);
    }

    pub(super) fn is_typedef_name(&self, name: Symbol) -> bool {
        for frame in self.names.iter().rev() {
            if let Some(&is_typedef) = frame.get(&name) {
                return is_typedef;
            }
        }
        false
    }

    pub(super) fn in_switch(&self) -> bool {
        self.switch_depth > 0
    }

    pub(super) fn enter_switch(&mut self) {
        self.switch_depth += 1;
    }

    pub(super) fn leave_switch(&mut self) {
        self.switch_depth -= 1;
    }
}
