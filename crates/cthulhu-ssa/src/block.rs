//! Basic blocks: an owned name and an ordered, terminator-final step list.
//!
//! Grounded on `ssa.c`'s `ssa_block_create`/`bb_add_step`.

use std::cell::RefCell;

use crate::ptr::ByPtr;
use crate::step::Step;

#[derive(Debug)]
pub struct BlockNode {
    name: String,
    steps: RefCell<Vec<Step>>,
}

pub type BlockRef = ByPtr<BlockNode>;

impl BlockNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> std::cell::Ref<'_, Vec<Step>> {
        self.steps.borrow()
    }

    pub fn len(&self) -> usize {
        self.steps.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.borrow().is_empty()
    }

    pub fn is_terminated(&self) -> bool {
        self.steps.borrow().last().is_some_and(Step::is_terminator)
    }

    /// Appends `step` and returns its index. Programming error (debug
    /// assertion) to push onto an already-terminated block, per §4.2's
    /// failure semantics.
    pub fn push(&self, step: Step) -> usize {
        let mut steps = self.steps.borrow_mut();
        debug_assert!(
            steps.last().is_none_or(|s| !s.is_terminator()),
            "cannot add a step to block `{}`: already terminated",
            self.name
        );
        steps.push(step);
        steps.len() - 1
    }
}

pub fn new_block(name: impl Into<String>) -> BlockRef {
    ByPtr::new(BlockNode {
        name: name.into(),
        steps: RefCell::new(Vec::new()),
    })
}
