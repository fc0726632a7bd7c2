//! Symbols: globals and functions.
//!
//! Grounded on `ssa.c`'s `ssa_symbol_t` (`symbol_new`, `symbol_create_decl`,
//! `function_create`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::block::BlockRef;
use crate::ptr::ByPtr;
use crate::types::{Quals, TypeRef};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Global,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Import,
    Export,
    Module,
    EntryCli,
    EntryGui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct Storage {
    pub element_type: TypeRef,
    pub count: usize,
    pub quals: Quals,
}

#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub storage: Storage,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug)]
pub struct SymbolNode {
    pub kind: SymbolKind,
    pub name: String,
    pub link_name: Option<String>,
    pub linkage: Linkage,
    pub visibility: Visibility,
    pub ty: TypeRef,
    pub storage: Option<Storage>,
    pub locals: RefCell<Vec<Local>>,
    pub params: RefCell<Vec<Param>>,
    pub blocks: RefCell<Vec<BlockRef>>,
    pub entry: RefCell<Option<BlockRef>>,
    pub value: RefCell<Option<Rc<Value>>>,
}

pub type SymbolRef = ByPtr<SymbolNode>;

impl SymbolNode {
    pub fn is_import(&self) -> bool {
        self.linkage == Linkage::Import
    }

    pub fn is_entry_point(&self) -> bool {
        matches!(self.linkage, Linkage::EntryCli | Linkage::EntryGui)
    }

    pub fn entry_block(&self) -> BlockRef {
        self.entry
            .borrow()
            .clone()
            .expect("symbol has no entry block yet")
    }
}

#[allow(clippy::too_many_arguments)]
pub fn new_symbol(
    kind: SymbolKind,
    name: impl Into<String>,
    link_name: Option<String>,
    linkage: Linkage,
    visibility: Visibility,
    ty: TypeRef,
    storage: Option<Storage>,
) -> SymbolRef {
    ByPtr::new(SymbolNode {
        kind,
        name: name.into(),
        link_name,
        linkage,
        visibility,
        ty,
        storage,
        locals: RefCell::new(Vec::new()),
        params: RefCell::new(Vec::new()),
        blocks: RefCell::new(Vec::new()),
        entry: RefCell::new(None),
        value: RefCell::new(None),
    })
}
