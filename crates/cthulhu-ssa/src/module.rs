//! Modules: a name, logical path, and owned vectors of types/globals/functions.
//!
//! Grounded on `ssa.c`'s `ssa_module_t` (`module_create`, `add_module_globals`,
//! `add_module_functions`, `add_module_types`).

use std::cell::RefCell;

use crate::ptr::ByPtr;
use crate::symbol::SymbolRef;
use crate::types::TypeRef;

#[derive(Debug)]
pub struct ModuleNode {
    pub name: String,
    pub path: Vec<String>,
    pub types: RefCell<Vec<TypeRef>>,
    pub globals: RefCell<Vec<SymbolRef>>,
    pub functions: RefCell<Vec<SymbolRef>>,
}

pub type ModuleRef = ByPtr<ModuleNode>;

impl ModuleNode {
    /// Module path joined with `::`, matching `get_namespace` in the C
    /// emitter (used for both the C++ namespace mirror and as a default
    /// file-path basis in per-module layout).
    pub fn namespace(&self) -> String {
        self.path.join("::")
    }

    /// Filesystem-safe form of the path: `-` replaced with `_`, joined with
    /// `/`.
    pub fn file_path(&self) -> String {
        self.path
            .iter()
            .map(|seg| seg.replace('-', "_"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

pub fn new_module(name: impl Into<String>, path: Vec<String>) -> ModuleRef {
    ByPtr::new(ModuleNode {
        name: name.into(),
        path,
        types: RefCell::new(Vec::new()),
        globals: RefCell::new(Vec::new()),
        functions: RefCell::new(Vec::new()),
    })
}
