//! Operands: the source of a value at a step.
//!
//! Grounded on `ssa.c`'s `ssa_operand_t` (`eOperandEmpty`, `eOperandImm`,
//! `eOperandReg`, `eOperandLocal`, `eOperandParam`, `eOperandGlobal`,
//! `eOperandFunction`, `eOperandBlock`).

use std::rc::Rc;

use crate::block::BlockRef;
use crate::symbol::SymbolRef;
use crate::types::{self, TypeRef};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Operand {
    Empty,
    Imm(Rc<Value>),
    /// A reference to the result of step `index` in `block`.
    Reg { block: BlockRef, index: usize },
    Local(usize),
    Param(usize),
    Global(SymbolRef),
    Function(SymbolRef),
    Block(BlockRef),
}

impl Operand {
    pub fn is_empty(&self) -> bool {
        matches!(self, Operand::Empty)
    }
}

/// Resolves the type produced by reading `operand`, relative to the symbol
/// the operand occurs in (needed for `local`/`param` indices). Grounded on
/// `emit.c`'s `get_operand_type`, used both by the optimizer and by the
/// emitter to type call results, casts, and vreg declarations.
pub fn operand_type(symbol: &SymbolRef, operand: &Operand) -> TypeRef {
    match operand {
        Operand::Empty => types::empty(),
        Operand::Imm(v) => v.ty.clone(),
        Operand::Reg { block, index } => block.steps()[*index].result_type.clone(),
        Operand::Local(i) => symbol.locals.borrow()[*i].storage.element_type.clone(),
        Operand::Param(i) => symbol.params.borrow()[*i].ty.clone(),
        Operand::Global(s) => s.ty.clone(),
        Operand::Function(s) => s.ty.clone(),
        Operand::Block(_) => types::empty(),
    }
}
