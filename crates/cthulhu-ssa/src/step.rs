//! Steps: the opcode plus payload that forms one SSA instruction.
//!
//! Grounded on `ssa.c`'s step constructors (`add_step`, `ssa_step_t`) and
//! the opcode set dispatched over in `opt.c`/`emit.c`.

use crate::block::BlockRef;
use crate::operand::Operand;
use crate::types::TypeRef;
use crate::value::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Flip,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Xor,
    BitAnd,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub enum StepKind {
    Nop,
    Value(Rc<Value>),
    Store {
        dst: Operand,
        src: Operand,
    },
    Load {
        src: Operand,
    },
    Address {
        symbol: Operand,
    },
    Offset {
        array: Operand,
        index: Operand,
    },
    Member {
        object: Operand,
        field_index: usize,
    },
    Cast {
        operand: Operand,
        target_type: TypeRef,
    },
    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        target: Operand,
        args: Vec<Operand>,
    },
    Jump {
        target: BlockRef,
    },
    Branch {
        cond: Operand,
        then_block: BlockRef,
        else_block: Option<BlockRef>,
    },
    Return {
        value: Operand,
    },
}

/// A step's implied result type, keyed separately by the builder/optimizer/
/// emitter (§3: "the emitter and optimizer maintain a per-step result type
/// map"). Stored alongside the opcode here rather than recomputed per
/// consumer, since every payload already carries enough to derive it once.
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub result_type: TypeRef,
}

impl Step {
    pub fn new(kind: StepKind, result_type: TypeRef) -> Self {
        Step { kind, result_type }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            StepKind::Jump { .. } | StepKind::Branch { .. } | StepKind::Return { .. }
        )
    }
}
