//! Per-block, per-step C statement emission.
//!
//! Grounded on `emit.c`'s `c89_write_block`/`c89_write_step` switch over
//! opcodes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::block::BlockRef;
use crate::diagnostics::{DiagnosticId, DiagnosticNode, DiagnosticSink};
use crate::emit::mangle::{self, Mangler};
use crate::emit::type_format;
use crate::emit::value_format;
use crate::operand::{self, Operand};
use crate::step::{BinaryOp, CompareOp, Step, StepKind, UnaryOp};
use crate::symbol::SymbolRef;
use crate::types::TypeKind;

fn unary_sym(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Abs => "llabs",
        UnaryOp::Flip => "~",
        UnaryOp::Not => "!",
    }
}

fn binary_sym(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Xor => "^",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn compare_sym(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Neq => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

/// One function body's emission state: vreg names are assigned the first
/// time a step's result is referenced (which, for a well-formed SSA
/// program, is always when the defining step itself is written), and reset
/// per symbol by constructing a fresh `BlockEmitter`.
pub struct BlockEmitter<'a> {
    sink: &'a dyn DiagnosticSink,
    mangler: &'a Mangler,
    symbol: &'a SymbolRef,
    vreg_names: RefCell<HashMap<(BlockRef, usize), String>>,
    vreg_counter: Cell<u64>,
}

impl<'a> BlockEmitter<'a> {
    pub fn new(sink: &'a dyn DiagnosticSink, mangler: &'a Mangler, symbol: &'a SymbolRef) -> Self {
        BlockEmitter {
            sink,
            mangler,
            symbol,
            vreg_names: RefCell::new(HashMap::new()),
            vreg_counter: Cell::new(0),
        }
    }

    fn internal(&self, message: &str) {
        self.sink.notify(
            DiagnosticId::Internal,
            DiagnosticNode(self.symbol.name.clone()),
            message.into(),
        );
    }

    fn vreg_name(&self, block: &BlockRef, index: usize) -> (String, bool) {
        let key = (block.clone(), index);
        if let Some(existing) = self.vreg_names.borrow().get(&key) {
            return (existing.clone(), false);
        }
        let n = self.vreg_counter.get();
        self.vreg_counter.set(n + 1);
        let name = mangle::vreg_name(n);
        self.vreg_names.borrow_mut().insert(key, name.clone());
        (name, true)
    }

    fn format_operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Empty => String::new(),
            Operand::Imm(v) => value_format::format_value(self.mangler, v, false),
            Operand::Reg { block, index } => self.vreg_name(block, *index).0,
            Operand::Local(i) => {
                let locals = self.symbol.locals.borrow();
                mangle::local_name(&locals[*i].name)
            }
            Operand::Param(i) => self.symbol.params.borrow()[*i].name.clone(),
            Operand::Global(s) | Operand::Function(s) => self.mangler.mangle(s),
            Operand::Block(b) => mangle::block_label(b.name()),
        }
    }

    /// Declares the result of a value-producing step at first use:
    /// `<type> vreg<n>`, or bare `vreg<n>` on a later reference.
    fn declare_result(&self, block: &BlockRef, index: usize, ty: &crate::types::TypeRef) -> String {
        let (name, is_new) = self.vreg_name(block, index);
        if is_new {
            type_format::format_type(self.sink, ty, &name)
        } else {
            name
        }
    }

    fn field_name(&self, object: &Operand, field_index: usize) -> String {
        let object_ty = operand::operand_type(self.symbol, object);
        let pointee = match &*object_ty.kind() {
            TypeKind::Pointer { target, .. } => target.clone(),
            _ => object_ty.clone(),
        };
        match &*pointee.kind() {
            TypeKind::Struct { fields } | TypeKind::Union { fields } => fields
                .get(field_index)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| {
                    self.internal("member field index out of range");
                    format!("field{field_index}")
                }),
            _ => {
                self.internal("member access on non-aggregate type");
                format!("field{field_index}")
            }
        }
    }

    /// Emits one step as a C statement (or an empty string for `nop` and
    /// fall-through jumps to the textually-next block, which callers may
    /// still choose to print explicitly for clarity).
    pub fn write_step(&self, block: &BlockRef, index: usize, step: &Step) -> String {
        match &step.kind {
            StepKind::Nop => String::new(),
            StepKind::Value(v) => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!("{decl} = {};", value_format::format_value(self.mangler, v, false))
            }
            StepKind::Store { dst, src } => {
                format!(
                    "*({}) = {};",
                    self.format_operand(dst),
                    self.format_operand(src)
                )
            }
            StepKind::Load { src } => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!("{decl} = *({});", self.format_operand(src))
            }
            StepKind::Address { symbol } => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!("{decl} = &({});", self.format_operand(symbol))
            }
            StepKind::Offset { array, index: idx } => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!(
                    "{decl} = &{}[{}];",
                    self.format_operand(array),
                    self.format_operand(idx)
                )
            }
            StepKind::Member { object, field_index } => {
                let decl = self.declare_result(block, index, &step.result_type);
                let field = self.field_name(object, *field_index);
                format!("{decl} = &{}->{field};", self.format_operand(object))
            }
            StepKind::Cast { operand: inner, target_type } => {
                let decl = self.declare_result(block, index, &step.result_type);
                let cast_ty = type_format::format_type(self.sink, target_type, "");
                format!("{decl} = ({cast_ty})({});", self.format_operand(inner))
            }
            StepKind::Unary { op, operand: inner } => {
                let decl = self.declare_result(block, index, &step.result_type);
                match op {
                    UnaryOp::Abs => format!(
                        "{decl} = ({}({}));",
                        unary_sym(*op),
                        self.format_operand(inner)
                    ),
                    _ => format!(
                        "{decl} = ({}{});",
                        unary_sym(*op),
                        self.format_operand(inner)
                    ),
                }
            }
            StepKind::Binary { op, lhs, rhs } => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!(
                    "{decl} = ({} {} {});",
                    self.format_operand(lhs),
                    binary_sym(*op),
                    self.format_operand(rhs)
                )
            }
            StepKind::Compare { op, lhs, rhs } => {
                let decl = self.declare_result(block, index, &step.result_type);
                format!(
                    "{decl} = ({} {} {});",
                    self.format_operand(lhs),
                    compare_sym(*op),
                    self.format_operand(rhs)
                )
            }
            StepKind::Call { target, args } => {
                let callee = self.format_operand(target);
                let arg_text = args
                    .iter()
                    .map(|a| self.format_operand(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                if matches!(&*step.result_type.kind(), TypeKind::Empty | TypeKind::Unit) {
                    format!("{callee}({arg_text});")
                } else {
                    let decl = self.declare_result(block, index, &step.result_type);
                    format!("{decl} = {callee}({arg_text});")
                }
            }
            StepKind::Jump { target } => format!("goto {};", mangle::block_label(target.name())),
            StepKind::Branch {
                cond,
                then_block,
                else_block,
            } => {
                let mut text = format!(
                    "if ({}) {{ goto {}; }}",
                    self.format_operand(cond),
                    mangle::block_label(then_block.name())
                );
                if let Some(else_block) = else_block {
                    let _ = write!(
                        text,
                        " else {{ goto {}; }}",
                        mangle::block_label(else_block.name())
                    );
                }
                text
            }
            StepKind::Return { value } => {
                if value.is_empty() || matches!(&*step.result_type.kind(), TypeKind::Empty | TypeKind::Unit) {
                    "return;".into()
                } else {
                    format!("return {};", self.format_operand(value))
                }
            }
        }
    }

    /// Renders an entire block as `bb_<name>: { ... }`.
    pub fn write_block(&self, block: &BlockRef) -> String {
        let mut body = String::new();
        for (index, step) in block.steps().iter().enumerate() {
            let text = self.write_step(block, index, step);
            if !text.is_empty() {
                let _ = write!(body, " {text}");
            }
        }
        format!("{}: {{{body} }}", mangle::block_label(block.name()))
    }
}
