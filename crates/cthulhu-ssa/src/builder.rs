//! Per-symbol SSA construction.
//!
//! Grounded on `ssa.c`'s `begin_compile`/`bb_add_step`/`ssa_block_create`
//! and the `symbol_loops` map used for nested break/continue targets.

use std::cell::{Cell, RefCell};

use crate::block::{self, BlockRef};
use crate::operand::Operand;
use crate::step::{Step, StepKind};
use crate::symbol::SymbolRef;
use crate::types::TypeRef;

/// The (enter, exit) block pair a `break`/`continue` inside a loop body
/// resolves against.
#[derive(Debug, Clone)]
pub struct LoopTarget {
    pub enter: BlockRef,
    pub exit: BlockRef,
}

/// Explicit builder context for one symbol under construction, replacing
/// the "ambient globals for current module/symbol/block/loop stack" idiom
/// (spec.md §9) with a value passed by exclusive reference.
pub struct SsaBuilder {
    pub symbol: SymbolRef,
    current_block: RefCell<Option<BlockRef>>,
    block_counter: Cell<u64>,
    loop_stack: RefCell<Vec<LoopTarget>>,
}

impl SsaBuilder {
    /// Creates the entry block for `symbol` and sets it current.
    pub fn begin_symbol(symbol: SymbolRef) -> Self {
        let builder = SsaBuilder {
            symbol,
            current_block: RefCell::new(None),
            block_counter: Cell::new(0),
            loop_stack: RefCell::new(Vec::new()),
        };
        let entry = builder.new_block(Some("entry"));
        *builder.symbol.entry.borrow_mut() = Some(entry.clone());
        builder.current_block.replace(Some(entry));
        builder
    }

    /// Creates a new block owned by the symbol under construction.
    /// Unnamed blocks receive an auto-incremented numeric name, reset per
    /// symbol (one counter per `SsaBuilder`).
    pub fn new_block(&self, name: Option<&str>) -> BlockRef {
        let name = match name {
            Some(n) => n.to_string(),
            None => {
                let n = self.block_counter.get();
                self.block_counter.set(n + 1);
                n.to_string()
            }
        };
        let block = block::new_block(name);
        self.symbol.blocks.borrow_mut().push(block.clone());
        block
    }

    pub fn current(&self) -> BlockRef {
        self.current_block
            .borrow()
            .clone()
            .expect("builder has no current block")
    }

    pub fn set_current(&self, block: BlockRef) {
        self.current_block.replace(Some(block));
    }

    /// Appends `step` to the builder's current block and returns the
    /// `reg` operand referencing its result.
    pub fn add_step(&self, kind: StepKind, result_type: TypeRef) -> Operand {
        self.block_push_step(&self.current(), kind, result_type)
    }

    /// Appends `step` to an arbitrary block (not necessarily current),
    /// returning the `reg` operand referencing its result.
    pub fn block_push_step(
        &self,
        block: &BlockRef,
        kind: StepKind,
        result_type: TypeRef,
    ) -> Operand {
        let step = Step::new(kind, result_type);
        let index = block.push(step);
        Operand::Reg {
            block: block.clone(),
            index,
        }
    }

    pub fn enter_loop(&self, enter: BlockRef, exit: BlockRef) {
        self.loop_stack.borrow_mut().push(LoopTarget { enter, exit });
    }

    pub fn leave_loop(&self) {
        let popped = self.loop_stack.borrow_mut().pop();
        debug_assert!(popped.is_some(), "leave_loop with no enclosing loop");
    }

    /// The innermost loop's (enter, exit) targets, for lowering
    /// `continue`/`break`. `None` with no enclosing loop is a programming
    /// error at the call site (spec.md §4.2 failure semantics).
    pub fn loop_target(&self) -> Option<LoopTarget> {
        self.loop_stack.borrow().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{self, Linkage, SymbolKind, Visibility};
    use crate::types;
    use crate::value::Value;

    fn function_symbol() -> SymbolRef {
        symbol::new_symbol(
            SymbolKind::Function,
            "f",
            None,
            Linkage::Module,
            Visibility::Private,
            types::unit(),
            None,
        )
    }

    #[test]
    fn begin_symbol_creates_named_entry_block() {
        let sym = function_symbol();
        let builder = SsaBuilder::begin_symbol(sym.clone());
        assert_eq!(builder.current().name(), "entry");
        assert_eq!(sym.blocks.borrow().len(), 1);
    }

    #[test]
    fn unnamed_blocks_auto_increment_per_symbol() {
        let sym = function_symbol();
        let builder = SsaBuilder::begin_symbol(sym);
        let b0 = builder.new_block(None);
        let b1 = builder.new_block(None);
        assert_eq!(b0.name(), "0");
        assert_eq!(b1.name(), "1");
    }

    #[test]
    fn add_step_returns_reg_operand_pointing_at_pushed_index() {
        let sym = function_symbol();
        let builder = SsaBuilder::begin_symbol(sym);
        let ty = types::unit();
        let operand = builder.add_step(StepKind::Value(Value::unit(ty.clone())), ty);
        match operand {
            Operand::Reg { index, .. } => assert_eq!(index, 0),
            _ => panic!("expected reg operand"),
        }
    }

    #[test]
    #[should_panic]
    fn pushing_after_terminator_panics_in_debug() {
        let sym = function_symbol();
        let builder = SsaBuilder::begin_symbol(sym);
        let ty = types::unit();
        builder.add_step(
            StepKind::Return {
                value: Operand::Empty,
            },
            ty.clone(),
        );
        builder.add_step(StepKind::Nop, ty);
    }

    #[test]
    fn loop_stack_tracks_innermost_target() {
        let sym = function_symbol();
        let builder = SsaBuilder::begin_symbol(sym);
        let enter = builder.new_block(Some("loop"));
        let exit = builder.new_block(Some("tail"));
        assert!(builder.loop_target().is_none());
        builder.enter_loop(enter.clone(), exit.clone());
        let target = builder.loop_target().unwrap();
        assert_eq!(target.enter.name(), "loop");
        assert_eq!(target.exit.name(), "tail");
        builder.leave_loop();
        assert!(builder.loop_target().is_none());
    }
}
