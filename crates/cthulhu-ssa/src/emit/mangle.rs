//! Symbol name mangling.
//!
//! Grounded on `emit.c`'s `get_symbol_name`: explicit `link_name` wins, then
//! the process-entry special cases, then the declared name, falling back to
//! a run-stable `anon<n>` for symbols lowering never names.

use std::cell::Cell;
use std::collections::HashMap;
use std::cell::RefCell;

use crate::symbol::{Linkage, SymbolRef};

/// Per-emitter-run mangled-name cache, so an anonymous symbol's `anon<n>`
/// stays stable across every reference within one run (spec.md §4.5).
#[derive(Default)]
pub struct Mangler {
    anon_counter: Cell<u64>,
    cache: RefCell<HashMap<SymbolRef, String>>,
}

impl Mangler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mangle(&self, symbol: &SymbolRef) -> String {
        if let Some(name) = self.cache.borrow().get(symbol) {
            return name.clone();
        }
        let name = self.compute(symbol);
        self.cache.borrow_mut().insert(symbol.clone(), name.clone());
        name
    }

    fn compute(&self, symbol: &SymbolRef) -> String {
        if let Some(link_name) = &symbol.link_name {
            return link_name.clone();
        }
        match symbol.linkage {
            Linkage::EntryCli => return "main".into(),
            Linkage::EntryGui => return "WinMain".into(),
            _ => {}
        }
        if symbol.name.is_empty() {
            let n = self.anon_counter.get();
            self.anon_counter.set(n + 1);
            return format!("anon{n}");
        }
        symbol.name.clone()
    }
}

/// Block label text, per the concrete scenarios in spec.md §8: `bb_<name>`.
pub fn block_label(name: &str) -> String {
    format!("bb_{name}")
}

pub fn vreg_name(n: u64) -> String {
    format!("vreg{n}")
}

pub fn local_name(name: &str) -> String {
    if name.is_empty() {
        "l_anon".into()
    } else {
        format!("l_{name}")
    }
}

pub fn string_global_name(n: u64) -> String {
    format!("ANON{n}_string")
}
