//! Lexical scopes for semantic analysis.
//!
//! Two namespaces per scope, as C requires: the ordinary namespace for
//! variables, functions, typedefs and enum constants, and the tag namespace
//! for struct, union and enum tags. Lookup walks innermost outward.

use crate::ast::RecordKeyword;
use crate::types::{EnumId, RecordId, TypeId};
use hashbrown::HashMap;
use symbol_table::GlobalSymbol as Symbol;

/// What an ordinary-namespace name refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrdinaryEntry {
    /// Local variable: its type and slot index in the current function.
    Local { ty: TypeId, slot: u32 },
    /// Global variable: its type and index in the module global table.
    Global { ty: TypeId, index: u32 },
    /// Function: its type and index in the module function table.
    Function { ty: TypeId, index: u32 },
    Typedef(TypeId),
    EnumConst { ty: TypeId, value: i64 },
}

/// A tag-namespace entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagEntry {
    Record { keyword: RecordKeyword, id: RecordId },
    Enum(EnumId),
}

#[derive(Debug, Default)]
struct ScopeFrame {
    ordinary: HashMap<Symbol, OrdinaryEntry>,
    tags: HashMap<Symbol, TagEntry>,
}

/// Scope stack. The bottom frame is file scope.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<ScopeFrame>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes {
            frames: vec![ScopeFrame::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1);
        self.frames.pop();
    }

    pub fn lookup(&self, name: Symbol) -> Option<OrdinaryEntry> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.ordinary.get(&name).copied())
    }

    /// Lookup restricted to the innermost frame, for redeclaration checks.
    pub fn lookup_current(&self, name: Symbol) -> Option<OrdinaryEntry> {
        self.frames
            .last()
            .and_then(|f| f.ordinary.get(&name).copied())
    }

    pub fn define(&mut self, name: Symbol, entry: OrdinaryEntry) {
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .ordinary
            .insert(name, entry);
    }

    pub fn lookup_tag(&self, name: Symbol) -> Option<TagEntry> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.tags.get(&name).copied())
    }

    pub fn lookup_tag_current(&self, name: Symbol) -> Option<TagEntry> {
        self.frames.last().and_then(|f| f.tags.get(&name).copied())
    }

    pub fn define_tag(&mut self, name: Symbol, entry: TagEntry) {
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .tags
            .insert(name, entry);
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows() {
        let mut scopes = Scopes::new();
        let name = Symbol::from("x");
        scopes.define(
            name,
            OrdinaryEntry::Global {
                ty: TypeId(0),
                index: 0,
            },
        );
        scopes.push();
        assert!(scopes.lookup(name).is_some());
        assert!(scopes.lookup_current(name).is_none());
        scopes.pop();
        assert!(scopes.lookup(name).is_some());
    }

    #[test]
    fn namespaces_are_separate() {
        let mut scopes = Scopes::new();
        let name = Symbol::from("s");
        scopes.define_tag(
            name,
            TagEntry::Record {
                keyword: RecordKeyword::Struct,
                id: RecordId(0),
            },
        );
        assert!(scopes.lookup(name).is_none());
        assert!(scopes.lookup_tag(name).is_some());
    }
}
