//! The SSA lowering result: all modules plus the inter-symbol dependency graph.
//!
//! Grounded on `ssa.c`'s `ssa_result_t` (`{ modules, deps }` returned from
//! `ssa_compile`).

use std::collections::{HashMap, HashSet};

use crate::module::ModuleRef;
use crate::symbol::SymbolRef;

pub struct Program {
    pub modules: Vec<ModuleRef>,
    pub deps: HashMap<SymbolRef, HashSet<SymbolRef>>,
}

impl Program {
    pub fn new(modules: Vec<ModuleRef>) -> Self {
        Program {
            modules,
            deps: HashMap::new(),
        }
    }

    /// Records a direct-use edge: `from`'s body/initializer names `to`.
    pub fn add_dependency(&mut self, from: SymbolRef, to: SymbolRef) {
        self.deps.entry(from).or_default().insert(to);
    }

    pub fn dependencies_of(&self, symbol: &SymbolRef) -> Option<&HashSet<SymbolRef>> {
        self.deps.get(symbol)
    }
}
