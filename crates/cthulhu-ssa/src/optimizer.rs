//! Constant-folding optimizer: a small abstract machine that evaluates SSA
//! global initializers.
//!
//! Grounded on `ssa/src/opt.c` (`ssa_opt_operand`, `ssa_opt_global`,
//! `ssa_opt_unary`, `ssa_opt_binary`, `ssa_opt_cast`). The memoized
//! recursive-evaluate shape (`global->value != NULL` in the original) is
//! kept; the in-progress tracking set is new (see SPEC_FULL.md §4.4
//! supplement — the original leaves cycle handling undefined).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::diagnostics::{DiagnosticId, DiagnosticNode, DiagnosticSink};
use crate::operand::Operand;
use crate::program::Program;
use crate::step::{BinaryOp, CompareOp, Step, StepKind, UnaryOp};
use crate::symbol::SymbolRef;
use crate::types::{self, TypeKind, TypeRef};
use crate::value::{Literal, Relative, Value, ValueKind};

pub struct Optimizer<'a> {
    sink: &'a dyn DiagnosticSink,
    in_progress: RefCell<HashSet<SymbolRef>>,
}

impl<'a> Optimizer<'a> {
    pub fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Optimizer {
            sink,
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Computes `symbol.value` for every global in the program. Idempotent:
    /// re-running leaves already-resolved globals untouched.
    pub fn run(&self, program: &Program) {
        for module in &program.modules {
            let globals: Vec<_> = module.globals.borrow().clone();
            for global in globals {
                self.eval_global(&global);
            }
        }
    }

    fn eval_global(&self, symbol: &SymbolRef) -> Rc<Value> {
        if let Some(value) = symbol.value.borrow().clone() {
            return value;
        }

        if self.in_progress.borrow().contains(symbol) {
            self.sink.notify(
                DiagnosticId::EvaluationCycle,
                DiagnosticNode(symbol.name.clone()),
                format!("evaluation of `{}` depends on itself", symbol.name),
            );
            return Value::noinit(symbol.ty.clone());
        }
        self.in_progress.borrow_mut().insert(symbol.clone());

        let block = symbol.entry_block();
        let mut regs: HashMap<usize, Rc<Value>> = HashMap::new();
        let mut returned = None;
        for (index, step) in block.steps().iter().enumerate() {
            if returned.is_some() {
                break;
            }
            if let StepKind::Return { value } = &step.kind {
                returned = Some(self.eval_operand(symbol, &regs, value));
                continue;
            }
            if let Some(result) = self.eval_step(symbol, &regs, step) {
                regs.insert(index, result);
            }
        }

        let value = returned.unwrap_or_else(|| Value::noinit(symbol.ty.clone()));
        *symbol.value.borrow_mut() = Some(value.clone());
        self.in_progress.borrow_mut().remove(symbol);
        value
    }

    fn eval_operand(
        &self,
        current: &SymbolRef,
        regs: &HashMap<usize, Rc<Value>>,
        operand: &Operand,
    ) -> Rc<Value> {
        match operand {
            Operand::Empty => Value::empty(types::empty()),
            Operand::Imm(v) => v.clone(),
            Operand::Reg { index, .. } => regs.get(index).cloned().unwrap_or_else(|| {
                self.internal(current, "reference to an unevaluated step result");
                Value::empty(types::empty())
            }),
            Operand::Local(_) | Operand::Param(_) => {
                self.internal(current, "local/param operand in a constant initializer");
                Value::empty(types::empty())
            }
            Operand::Global(g) => self.eval_global(g),
            Operand::Function(f) => Rc::new(Value {
                ty: f.ty.clone(),
                init: true,
                kind: ValueKind::Relative(Relative { target: f.clone() }),
            }),
            Operand::Block(_) => Value::empty(types::empty()),
        }
    }

    fn eval_step(
        &self,
        current: &SymbolRef,
        regs: &HashMap<usize, Rc<Value>>,
        step: &Step,
    ) -> Option<Rc<Value>> {
        match &step.kind {
            StepKind::Value(v) => Some(v.clone()),
            StepKind::Load { src } => {
                let v = self.eval_operand(current, regs, src);
                self.check_init(current, &v);
                Some(v)
            }
            StepKind::Unary { op, operand } => {
                let v = self.eval_operand(current, regs, operand);
                if !self.check_init(current, &v) {
                    return Some(v);
                }
                Some(self.fold_unary(*op, &v, step.result_type.clone()))
            }
            StepKind::Binary { op, lhs, rhs } => {
                let l = self.eval_operand(current, regs, lhs);
                let r = self.eval_operand(current, regs, rhs);
                let l_init = self.check_init(current, &l);
                let r_init = self.check_init(current, &r);
                if !l_init {
                    return Some(l);
                }
                if !r_init {
                    return Some(r);
                }
                Some(self.fold_binary(current, *op, &l, &r, step.result_type.clone()))
            }
            StepKind::Compare { op, lhs, rhs } => {
                let l = self.eval_operand(current, regs, lhs);
                let r = self.eval_operand(current, regs, rhs);
                Some(fold_compare(*op, &l, &r, step.result_type.clone()))
            }
            StepKind::Cast {
                operand,
                target_type,
            } => {
                let v = self.eval_operand(current, regs, operand);
                Some(fold_cast(&v, target_type.clone()))
            }
            StepKind::Return { .. } => None,
            _ => {
                self.internal(current, "unsupported step in a constant initializer");
                None
            }
        }
    }

    /// Reports `UninitializedValueUsed` if `value` was never assigned.
    /// Returns whether the value is safe to fold further: callers that hit
    /// `false` must propagate `value` unchanged rather than read its digit
    /// payload, since an uninitialized `Value` carries no real literal.
    fn check_init(&self, current: &SymbolRef, value: &Value) -> bool {
        if !value.init {
            self.sink.notify(
                DiagnosticId::UninitializedValueUsed,
                DiagnosticNode(current.name.clone()),
                "use of uninitialized value".into(),
            );
            false
        } else {
            true
        }
    }

    fn internal(&self, current: &SymbolRef, message: &str) {
        self.sink.notify(
            DiagnosticId::Internal,
            DiagnosticNode(current.name.clone()),
            message.into(),
        );
    }

    fn fold_unary(&self, op: UnaryOp, v: &Value, ty: TypeRef) -> Rc<Value> {
        match op {
            UnaryOp::Not => Value::bool_(ty, !v.get_bool()),
            UnaryOp::Neg => Value::digit(ty, -v.get_digit()),
            UnaryOp::Abs => Value::digit(ty, v.get_digit().abs()),
            // mpz_com: one's complement, i.e. -x - 1.
            UnaryOp::Flip => Value::digit(ty, -v.get_digit() - BigInt::from(1)),
        }
    }

    fn fold_binary(
        &self,
        current: &SymbolRef,
        op: BinaryOp,
        l: &Value,
        r: &Value,
        ty: TypeRef,
    ) -> Rc<Value> {
        match op {
            BinaryOp::And => Value::bool_(ty, l.get_bool() && r.get_bool()),
            BinaryOp::Or => Value::bool_(ty, l.get_bool() || r.get_bool()),
            _ => {
                let lhs = l.get_digit();
                let rhs = r.get_digit();
                let result = match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => {
                        if rhs.is_zero() {
                            self.sink.notify(
                                DiagnosticId::DivideByZero,
                                DiagnosticNode(current.name.clone()),
                                "division by zero".into(),
                            );
                            lhs
                        } else {
                            lhs / rhs
                        }
                    }
                    BinaryOp::Rem => {
                        if rhs.is_zero() {
                            self.sink.notify(
                                DiagnosticId::ModuloByZero,
                                DiagnosticNode(current.name.clone()),
                                "modulo by zero".into(),
                            );
                            lhs
                        } else {
                            lhs % rhs
                        }
                    }
                    BinaryOp::Shl => lhs << shift_amount(&rhs),
                    BinaryOp::Shr => lhs >> shift_amount(&rhs),
                    BinaryOp::Xor => lhs ^ rhs,
                    BinaryOp::BitAnd => lhs & rhs,
                    BinaryOp::BitOr => lhs | rhs,
                    BinaryOp::And | BinaryOp::Or => unreachable!(),
                };
                Value::digit(ty, result)
            }
        }
    }
}

fn shift_amount(n: &BigInt) -> u32 {
    n.to_u32().unwrap_or(0)
}

fn fold_compare(op: CompareOp, l: &Value, r: &Value, ty: TypeRef) -> Rc<Value> {
    let result = if let (Literal::Bool(a), Literal::Bool(b)) = (l.as_literal(), r.as_literal()) {
        compare(op, a, b)
    } else {
        compare(op, &l.get_digit(), &r.get_digit())
    };
    Value::bool_(ty, result)
}

fn compare<T: PartialOrd + PartialEq>(op: CompareOp, a: &T, b: &T) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Neq => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn fold_cast(v: &Value, target: TypeRef) -> Rc<Value> {
    let target_is_opaque = matches!(&*target.kind(), TypeKind::Opaque);
    if target_is_opaque {
        return match &v.kind {
            ValueKind::Literal(Literal::Digit(n)) => Value::opaque_literal(target, n.clone()),
            ValueKind::Literal(Literal::Opaque(n)) => Value::opaque_literal(target, n.clone()),
            ValueKind::Relative(r) => Rc::new(Value {
                ty: target,
                init: true,
                kind: ValueKind::Relative(r.clone()),
            }),
            _ => Value::opaque_literal(target, v.get_digit()),
        };
    }

    let target_is_pointer = matches!(&*target.kind(), TypeKind::Pointer { .. });
    if target_is_pointer {
        if let ValueKind::Relative(r) = &v.kind {
            return Rc::new(Value {
                ty: target,
                init: v.init,
                kind: ValueKind::Relative(r.clone()),
            });
        }
    }

    let target_is_digit = matches!(&*target.kind(), TypeKind::Digit { .. });
    if target_is_digit {
        return Value::digit(target, v.get_digit());
    }

    Rc::new(Value {
        ty: target,
        init: v.init,
        kind: v.kind.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;
    use crate::diagnostics::CollectingSink;
    use crate::symbol::{self, Linkage, SymbolKind, Storage, Visibility};
    use crate::types::{Quals, Sign, Width};

    fn int_ty() -> TypeRef {
        types::digit(Sign::Signed, Width::Int)
    }

    fn global_with_block(ty: TypeRef) -> (SymbolRef, crate::block::BlockRef) {
        let sym = symbol::new_symbol(
            SymbolKind::Global,
            "x",
            None,
            Linkage::Module,
            Visibility::Public,
            ty.clone(),
            Some(Storage {
                element_type: ty,
                count: 1,
                quals: Quals::default(),
            }),
        );
        let block = block::new_block("entry");
        sym.blocks.borrow_mut().push(block.clone());
        *sym.entry.borrow_mut() = Some(block.clone());
        (sym, block)
    }

    #[test]
    fn folds_constant_addition() {
        let ty = int_ty();
        let (sym, block) = global_with_block(ty.clone());
        let forty = block.push(Step::new(
            StepKind::Value(Value::digit(ty.clone(), BigInt::from(40))),
            ty.clone(),
        ));
        let two = block.push(Step::new(
            StepKind::Value(Value::digit(ty.clone(), BigInt::from(2))),
            ty.clone(),
        ));
        block.push(Step::new(
            StepKind::Binary {
                op: BinaryOp::Add,
                lhs: Operand::Reg {
                    block: block.clone(),
                    index: forty,
                },
                rhs: Operand::Reg {
                    block: block.clone(),
                    index: two,
                },
            },
            ty.clone(),
        ));
        block.push(Step::new(
            StepKind::Return {
                value: Operand::Reg {
                    block: block.clone(),
                    index: 2,
                },
            },
            ty,
        ));

        let sink = CollectingSink::new();
        let optimizer = Optimizer::new(&sink);
        let value = optimizer.eval_global(&sym);
        assert_eq!(value.get_digit(), BigInt::from(42));
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn division_by_zero_reports_diagnostic_and_keeps_lhs() {
        let ty = int_ty();
        let (sym, block) = global_with_block(ty.clone());
        let lhs = block.push(Step::new(
            StepKind::Value(Value::digit(ty.clone(), BigInt::from(10))),
            ty.clone(),
        ));
        let rhs = block.push(Step::new(
            StepKind::Value(Value::digit(ty.clone(), BigInt::from(0))),
            ty.clone(),
        ));
        block.push(Step::new(
            StepKind::Binary {
                op: BinaryOp::Div,
                lhs: Operand::Reg {
                    block: block.clone(),
                    index: lhs,
                },
                rhs: Operand::Reg {
                    block: block.clone(),
                    index: rhs,
                },
            },
            ty.clone(),
        ));
        block.push(Step::new(
            StepKind::Return {
                value: Operand::Reg {
                    block: block.clone(),
                    index: 2,
                },
            },
            ty,
        ));

        let sink = CollectingSink::new();
        let optimizer = Optimizer::new(&sink);
        let value = optimizer.eval_global(&sym);
        assert_eq!(value.get_digit(), BigInt::from(10));
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn self_referential_global_reports_cycle_instead_of_recursing() {
        let ty = int_ty();
        let (sym, block) = global_with_block(ty.clone());
        let load = block.push(Step::new(
            StepKind::Load {
                src: Operand::Global(sym.clone()),
            },
            ty.clone(),
        ));
        block.push(Step::new(
            StepKind::Return {
                value: Operand::Reg {
                    block: block.clone(),
                    index: load,
                },
            },
            ty,
        ));

        let sink = CollectingSink::new();
        let optimizer = Optimizer::new(&sink);
        optimizer.eval_global(&sym);
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn eval_global_is_idempotent() {
        let ty = int_ty();
        let (sym, block) = global_with_block(ty.clone());
        block.push(Step::new(
            StepKind::Return {
                value: Operand::Imm(Value::digit(ty.clone(), BigInt::from(7))),
            },
            ty,
        ));
        let sink = CollectingSink::new();
        let optimizer = Optimizer::new(&sink);
        let first = optimizer.eval_global(&sym);
        let second = optimizer.eval_global(&sym);
        assert_eq!(first.get_digit(), second.get_digit());
    }
}
