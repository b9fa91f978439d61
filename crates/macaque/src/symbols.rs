//! Compile-time symbol table: lexically nested scopes resolving names to
//! (scope, index) pairs.

use hashbrown::HashMap;

/// Where a resolved name lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// A slot in the VM globals store (u16 index).
    Global,
    /// A slot relative to the current frame's base pointer (u8 index).
    Local,
    /// An entry in the fixed builtin registry (u8 index).
    Builtin,
}

/// A compile-time binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: u16,
}

#[derive(Debug, Default)]
struct Scope {
    store: HashMap<String, Symbol>,
    num_definitions: u16,
}

/// A stack of scopes. The outermost scope defines globals; each compiled
/// function body pushes one local scope. Builtin names sit in an implicit
/// scope consulted after all others, so a user binding shadows a builtin for
/// as long as its scope is live.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    builtins: HashMap<String, Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            builtins: HashMap::new(),
        }
    }

    /// Pushes a fresh local scope. Mirrors entering a function literal.
    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pops the current scope, returning how many names it defined — the
    /// local count the compiler attaches to the function being finalised.
    ///
    /// # Panics
    /// If called on the global scope.
    pub fn leave_scope(&mut self) -> u16 {
        assert!(self.scopes.len() > 1, "cannot leave the global scope");
        self.scopes.pop().expect("scope stack is never empty").num_definitions
    }

    /// Defines `name` in the current scope and returns its symbol. The n-th
    /// definition in a scope gets index n, starting at 0; redefining a name
    /// consumes a fresh index and masks the old binding.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.scopes.len() == 1 {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let top = self.scopes.last_mut().expect("scope stack is never empty");
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: top.num_definitions,
        };
        top.num_definitions += 1;
        top.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Binds a builtin at its fixed registry index.
    pub fn define_builtin(&mut self, index: u8, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index: u16::from(index),
        };
        self.builtins.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolves `name` from the current scope outwards, consulting builtins
    /// last. Inner definitions mask outer ones.
    ///
    /// There is no closure capture: a local of an enclosing function is not
    /// reachable from a nested one. Such a hit ends resolution with `None` —
    /// the name is lexically bound to a slot this function cannot see, so
    /// neither outer scopes nor builtins may claim it.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(symbol) = scope.store.get(name) {
                if symbol.scope == SymbolScope::Local && distance > 0 {
                    return None;
                }
                return Some(symbol.clone());
            }
        }
        self.builtins.get(name).cloned()
    }
}
