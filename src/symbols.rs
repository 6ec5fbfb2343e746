use std::collections::HashMap;

use crate::{ast::DefnId, util::intern::Interned};

/// Table of symbols for a single scope.
///
/// Entries are non-owning back-references into the AST's definition arena;
/// the scope owns the definitions themselves. Parent-chain lookup across
/// nested scopes lives on [`crate::ast::Ast::lookup`].
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<Interned<str>, DefnId>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Binds a name to a definition.
    ///
    /// Binding the same name twice in one table is a contract violation.
    pub fn bind(&mut self, name: Interned<str>, defn: DefnId) {
        let previous = self.entries.insert(name, defn);
        assert!(previous.is_none(), "symbol bound twice in the same scope");
    }

    /// Searches for `name` in this table only.
    pub fn get(&self, name: Interned<str>) -> Option<DefnId> {
        self.entries.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
