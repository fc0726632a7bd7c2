//! HIR → SSA program lowering.
//!
//! Grounded on `ssa.c`'s `ssa_compile` (sizing pass, forward-declaration
//! pass, definition passes, string interning, dependency edges) and
//! `compile_tree` (the expression-to-SSA postorder translation, §4.3a).

use std::collections::{HashMap, HashSet};

use num_bigint::BigInt;

use crate::builder::SsaBuilder;
use crate::diagnostics::{DiagnosticId, DiagnosticNode, DiagnosticSink};
use crate::hir::{
    HirExpr, HirFunction, HirGlobal, HirJump, HirLinkage, HirModule, HirProgram, HirQuals,
    HirStmt, HirStorage, HirVisibility,
};
use crate::module::{self, ModuleRef};
use crate::operand::{self, Operand};
use crate::program::Program;
use crate::step::{BinaryOp, CompareOp, StepKind, UnaryOp};
use crate::symbol::{self, Linkage, Local, Param, Storage, SymbolKind, SymbolRef, Visibility};
use crate::types::{self, Quals, Sign, TypeInterner, TypeRef, Width};
use crate::value::Value;

fn convert_linkage(linkage: HirLinkage) -> Linkage {
    match linkage {
        HirLinkage::Import => Linkage::Import,
        HirLinkage::Export => Linkage::Export,
        HirLinkage::Module => Linkage::Module,
        HirLinkage::EntryCli => Linkage::EntryCli,
        HirLinkage::EntryGui => Linkage::EntryGui,
    }
}

fn convert_visibility(visibility: HirVisibility) -> Visibility {
    match visibility {
        HirVisibility::Public => Visibility::Public,
        HirVisibility::Private => Visibility::Private,
    }
}

fn convert_quals(quals: HirQuals) -> Quals {
    Quals {
        is_const: quals.is_const,
        is_volatile: quals.is_volatile,
        is_atomic: quals.is_atomic,
    }
}

fn convert_storage(interner: &TypeInterner, storage: &HirStorage) -> Storage {
    Storage {
        element_type: interner.intern(&storage.element_ty),
        count: storage.count,
        quals: convert_quals(storage.quals),
    }
}

/// Per-function lowering context: the builder plus HIR-id → SSA-index maps
/// for locals and params (built fresh per function, cleared by going out of
/// scope rather than reused, per spec.md §9's "cleared between symbols").
struct FnCtx<'b> {
    builder: &'b SsaBuilder,
    module: ModuleRef,
    local_index: HashMap<u64, usize>,
    param_index: HashMap<u64, usize>,
}

pub struct Lowering<'a> {
    interner: TypeInterner,
    sink: &'a dyn DiagnosticSink,
    globals_by_id: HashMap<u64, SymbolRef>,
    functions_by_id: HashMap<u64, SymbolRef>,
    strings: HashMap<Vec<u8>, SymbolRef>,
    string_counter: u64,
    program: Program,
}

impl<'a> Lowering<'a> {
    pub fn lower(hir: &HirProgram, sink: &'a dyn DiagnosticSink) -> Program {
        let interner = TypeInterner::new();
        let (modules, globals_by_id, functions_by_id) = forward_declare(hir, &interner);

        let mut lowering = Lowering {
            interner,
            sink,
            globals_by_id,
            functions_by_id,
            strings: HashMap::new(),
            string_counter: 0,
            program: Program::new(modules.clone()),
        };

        for (hir_module, module) in hir.modules.iter().zip(modules.iter()) {
            lowering.define_globals(hir_module, module);
            lowering.define_functions(hir_module, module);
        }

        lowering.program
    }

    fn define_globals(&mut self, hir_module: &HirModule, module: &ModuleRef) {
        for hir_global in &hir_module.globals {
            let symbol = self.globals_by_id[&hir_global.id].clone();
            tracing::debug!(name = %symbol.name, "lowering global");
            let builder = SsaBuilder::begin_symbol(symbol.clone());
            let mut ctx = FnCtx {
                builder: &builder,
                module: module.clone(),
                local_index: HashMap::new(),
                param_index: HashMap::new(),
            };
            let result = match &hir_global.initial {
                Some(expr) => self.lower_expr(&mut ctx, &symbol, expr),
                None => {
                    let ty = symbol.ty.clone();
                    builder.add_step(StepKind::Value(Value::noinit(ty.clone())), ty)
                }
            };
            let ty = symbol.ty.clone();
            builder.add_step(StepKind::Return { value: result }, ty);
        }
    }

    fn define_functions(&mut self, hir_module: &HirModule, module: &ModuleRef) {
        for hir_function in &hir_module.functions {
            let symbol = self.functions_by_id[&hir_function.id].clone();
            if symbol.is_import() {
                debug_assert!(hir_function.body.is_none(), "import function has a body");
                continue;
            }
            tracing::debug!(name = %symbol.name, "lowering function");
            let builder = SsaBuilder::begin_symbol(symbol.clone());
            let local_index = hir_function
                .locals
                .iter()
                .enumerate()
                .map(|(i, l)| (l.id, i))
                .collect();
            let param_index = hir_function
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| (p.id, i))
                .collect();
            let mut ctx = FnCtx {
                builder: &builder,
                module: module.clone(),
                local_index,
                param_index,
            };
            if let Some(body) = &hir_function.body {
                self.lower_stmt(&mut ctx, &symbol, body);
            }
            if !builder.current().is_terminated() {
                builder.add_step(
                    StepKind::Return {
                        value: Operand::Empty,
                    },
                    types::empty(),
                );
            }
        }
    }

    fn add_dependency(&mut self, from: &SymbolRef, to: &SymbolRef) {
        self.program.add_dependency(from.clone(), to.clone());
    }

    fn parse_digit(&self, symbol: &SymbolRef, text: &str) -> BigInt {
        text.parse::<BigInt>().unwrap_or_else(|_| {
            self.sink.notify(
                DiagnosticId::InvalidIntegerLiteral,
                DiagnosticNode(symbol.name.clone()),
                format!("could not parse integer literal `{text}`"),
            );
            BigInt::from(0)
        })
    }

    fn intern_string(&mut self, ctx: &mut FnCtx, current: &SymbolRef, ty: TypeRef, bytes: &[u8]) -> Operand {
        if let Some(existing) = self.strings.get(bytes) {
            self.add_dependency(current, existing);
            return Operand::Global(existing.clone());
        }

        let char_ty = match &*ty.kind() {
            types::TypeKind::Pointer { target, .. } => target.clone(),
            _ => types::digit(Sign::Unsigned, Width::Char),
        };
        let name = format!("ANON{}_string", self.string_counter);
        self.string_counter += 1;

        let value = Value::string(ty.clone(), char_ty, bytes);
        let storage = Storage {
            element_type: ty.clone(),
            count: 1,
            quals: Quals {
                is_const: true,
                ..Quals::default()
            },
        };
        let sym = symbol::new_symbol(
            SymbolKind::Global,
            name,
            None,
            Linkage::Module,
            Visibility::Private,
            ty,
            Some(storage),
        );
        *sym.value.borrow_mut() = Some(value);
        ctx.module.globals.borrow_mut().push(sym.clone());
        self.strings.insert(bytes.to_vec(), sym.clone());
        self.add_dependency(current, &sym);
        Operand::Global(sym)
    }

    fn lower_expr(&mut self, ctx: &mut FnCtx, current: &SymbolRef, expr: &HirExpr) -> Operand {
        match expr {
            HirExpr::Empty => Operand::Empty,
            HirExpr::Digit { ty, value } => {
                let ty = self.interner.intern(ty);
                let n = self.parse_digit(current, value);
                Operand::Imm(Value::digit(ty, n))
            }
            HirExpr::Bool { ty, value } => {
                let ty = self.interner.intern(ty);
                Operand::Imm(Value::bool_(ty, *value))
            }
            HirExpr::Unit { ty } => {
                let ty = self.interner.intern(ty);
                Operand::Imm(Value::unit(ty))
            }
            HirExpr::StringLit { ty, text } => {
                let ty = self.interner.intern(ty);
                self.intern_string(ctx, current, ty, text.as_bytes())
            }
            HirExpr::Cast { ty, expr } => {
                let operand = self.lower_expr(ctx, current, expr);
                let target_type = self.interner.intern(ty);
                ctx.builder.add_step(
                    StepKind::Cast {
                        operand,
                        target_type: target_type.clone(),
                    },
                    target_type,
                )
            }
            HirExpr::Offset { expr, index } => {
                let array = self.lower_expr(ctx, current, expr);
                let index = self.lower_expr(ctx, current, index);
                let array_ty = operand::operand_type(current, &array);
                let result_type = pointee_of(&array_ty);
                ctx.builder
                    .add_step(StepKind::Offset { array, index }, result_type)
            }
            HirExpr::Field {
                object,
                field_index,
            } => {
                let object_operand = self.lower_expr(ctx, current, object);
                let object_ty = operand::operand_type(current, &object_operand);
                let record_ty = pointee_of(&object_ty);
                let field_ty = field_type(&record_ty, *field_index);
                let result_type = types::pointer(field_ty, types::POINTER_SINGLE, Quals::default());
                ctx.builder.add_step(
                    StepKind::Member {
                        object: object_operand,
                        field_index: *field_index,
                    },
                    result_type,
                )
            }
            HirExpr::Unary { op, operand } => {
                let inner = self.lower_expr(ctx, current, operand);
                let result_type = operand::operand_type(current, &inner);
                ctx.builder.add_step(
                    StepKind::Unary {
                        op: convert_unary(*op),
                        operand: inner,
                    },
                    result_type,
                )
            }
            HirExpr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(ctx, current, lhs);
                let rhs = self.lower_expr(ctx, current, rhs);
                let result_type = operand::operand_type(current, &lhs);
                ctx.builder.add_step(
                    StepKind::Binary {
                        op: convert_binary(*op),
                        lhs,
                        rhs,
                    },
                    result_type,
                )
            }
            HirExpr::Compare { op, lhs, rhs } => {
                let lhs = self.lower_expr(ctx, current, lhs);
                let rhs = self.lower_expr(ctx, current, rhs);
                ctx.builder.add_step(
                    StepKind::Compare {
                        op: convert_compare(*op),
                        lhs,
                        rhs,
                    },
                    types::bool_(),
                )
            }
            HirExpr::GlobalRef { id } => {
                let sym = self.globals_by_id[id].clone();
                self.add_dependency(current, &sym);
                Operand::Global(sym)
            }
            HirExpr::FunctionRef { id } => {
                let sym = self.functions_by_id[id].clone();
                self.add_dependency(current, &sym);
                Operand::Function(sym)
            }
            HirExpr::LocalRef { id } => Operand::Local(ctx.local_index[id]),
            HirExpr::ParamRef { id } => Operand::Param(ctx.param_index[id]),
            HirExpr::Load { expr } => {
                let src = self.lower_expr(ctx, current, expr);
                let src_ty = operand::operand_type(current, &src);
                let result_type = pointee_of(&src_ty);
                ctx.builder.add_step(StepKind::Load { src }, result_type)
            }
            HirExpr::Address { expr } => {
                let symbol = self.lower_expr(ctx, current, expr);
                let target_ty = operand::operand_type(current, &symbol);
                let result_type = types::pointer(target_ty, types::POINTER_SINGLE, Quals::default());
                ctx.builder
                    .add_step(StepKind::Address { symbol }, result_type)
            }
            HirExpr::Call { callee, args } => {
                let target = self.lower_expr(ctx, current, callee);
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(ctx, current, a))
                    .collect();
                let target_ty = operand::operand_type(current, &target);
                let result_type = match &*target_ty.kind() {
                    types::TypeKind::Closure { result, .. } => result.clone(),
                    _ => {
                        self.sink.notify(
                            DiagnosticId::Internal,
                            DiagnosticNode(current.name.clone()),
                            "call target is not a closure type".into(),
                        );
                        types::empty()
                    }
                };
                ctx.builder
                    .add_step(StepKind::Call { target, args }, result_type)
            }
        }
    }

    fn lower_stmt(&mut self, ctx: &mut FnCtx, current: &SymbolRef, stmt: &HirStmt) {
        match stmt {
            HirStmt::Block { stmts } => {
                for s in stmts {
                    if ctx.builder.current().is_terminated() {
                        break;
                    }
                    self.lower_stmt(ctx, current, s);
                }
            }
            HirStmt::Expr { expr } => {
                self.lower_expr(ctx, current, expr);
            }
            HirStmt::Assign { dst, src } => {
                let dst = self.lower_expr(ctx, current, dst);
                let src = self.lower_expr(ctx, current, src);
                ctx.builder
                    .add_step(StepKind::Store { dst, src }, types::unit());
            }
            HirStmt::Return { value } => {
                let operand = match value {
                    Some(expr) => self.lower_expr(ctx, current, expr),
                    None => Operand::Empty,
                };
                let ty = operand::operand_type(current, &operand);
                ctx.builder
                    .add_step(StepKind::Return { value: operand }, ty);
            }
            HirStmt::Branch {
                cond,
                then_branch,
                other,
            } => {
                let cond = self.lower_expr(ctx, current, cond);
                let then_block = ctx.builder.new_block(None);
                let explicit_else_block = other.as_ref().map(|_| ctx.builder.new_block(None));
                let tail_block = ctx.builder.new_block(None);
                // A missing `else` targets `tail_block` directly, never an
                // absent block: the branch step always has both arms.
                let else_block = explicit_else_block
                    .clone()
                    .unwrap_or_else(|| tail_block.clone());

                ctx.builder.add_step(
                    StepKind::Branch {
                        cond,
                        then_block: then_block.clone(),
                        else_block: Some(else_block.clone()),
                    },
                    types::unit(),
                );

                ctx.builder.set_current(then_block.clone());
                self.lower_stmt(ctx, current, then_branch);
                if !ctx.builder.current().is_terminated() {
                    ctx.builder.add_step(
                        StepKind::Jump {
                            target: tail_block.clone(),
                        },
                        types::unit(),
                    );
                }

                if let (Some(else_stmt), Some(explicit_else_block)) = (other, explicit_else_block) {
                    ctx.builder.set_current(explicit_else_block);
                    self.lower_stmt(ctx, current, else_stmt);
                    if !ctx.builder.current().is_terminated() {
                        ctx.builder.add_step(
                            StepKind::Jump {
                                target: tail_block.clone(),
                            },
                            types::unit(),
                        );
                    }
                }

                ctx.builder.set_current(tail_block);
            }
            HirStmt::Loop { cond, body } => {
                let loop_block = ctx.builder.new_block(Some("loop"));
                let body_block = ctx.builder.new_block(Some("body"));
                let tail_block = ctx.builder.new_block(Some("tail"));

                ctx.builder.add_step(
                    StepKind::Jump {
                        target: loop_block.clone(),
                    },
                    types::unit(),
                );

                ctx.builder.set_current(loop_block.clone());
                let cond_operand = self.lower_expr(ctx, current, cond);
                ctx.builder.add_step(
                    StepKind::Branch {
                        cond: cond_operand,
                        then_block: body_block.clone(),
                        else_block: Some(tail_block.clone()),
                    },
                    types::unit(),
                );

                ctx.builder.set_current(body_block);
                ctx.builder.enter_loop(loop_block.clone(), tail_block.clone());
                self.lower_stmt(ctx, current, body);
                ctx.builder.leave_loop();
                if !ctx.builder.current().is_terminated() {
                    ctx.builder
                        .add_step(StepKind::Jump { target: loop_block }, types::unit());
                }

                ctx.builder.set_current(tail_block);
            }
            HirStmt::Jump { jump } => {
                let target = ctx
                    .builder
                    .loop_target()
                    .expect("break/continue with no enclosing loop");
                let dest = match jump {
                    HirJump::Break => target.exit,
                    HirJump::Continue => target.enter,
                };
                ctx.builder
                    .add_step(StepKind::Jump { target: dest }, types::unit());
            }
        }
    }
}

fn convert_unary(op: crate::hir::HirUnaryOp) -> UnaryOp {
    use crate::hir::HirUnaryOp::*;
    match op {
        Neg => UnaryOp::Neg,
        Abs => UnaryOp::Abs,
        Flip => UnaryOp::Flip,
        Not => UnaryOp::Not,
    }
}

fn convert_binary(op: crate::hir::HirBinaryOp) -> BinaryOp {
    use crate::hir::HirBinaryOp::*;
    match op {
        Add => BinaryOp::Add,
        Sub => BinaryOp::Sub,
        Mul => BinaryOp::Mul,
        Div => BinaryOp::Div,
        Rem => BinaryOp::Rem,
        Shl => BinaryOp::Shl,
        Shr => BinaryOp::Shr,
        Xor => BinaryOp::Xor,
        BitAnd => BinaryOp::BitAnd,
        BitOr => BinaryOp::BitOr,
        And => BinaryOp::And,
        Or => BinaryOp::Or,
    }
}

fn convert_compare(op: crate::hir::HirCompareOp) -> CompareOp {
    use crate::hir::HirCompareOp::*;
    match op {
        Eq => CompareOp::Eq,
        Neq => CompareOp::Neq,
        Lt => CompareOp::Lt,
        Le => CompareOp::Le,
        Gt => CompareOp::Gt,
        Ge => CompareOp::Ge,
    }
}

fn pointee_of(ty: &TypeRef) -> TypeRef {
    match &*ty.kind() {
        types::TypeKind::Pointer { target, .. } => target.clone(),
        _ => ty.clone(),
    }
}

fn field_type(record_ty: &TypeRef, field_index: usize) -> TypeRef {
    match &*record_ty.kind() {
        types::TypeKind::Struct { fields } | types::TypeKind::Union { fields } => {
            fields[field_index].ty.clone()
        }
        _ => types::empty(),
    }
}

/// Walks a type and every type reachable from it (struct/union fields,
/// enum underlying types, pointer targets, closure params/results),
/// collecting each previously-unseen struct/union/enum into `out` so the
/// emitter can later prototype and define it. `seen` is shared across the
/// whole program so a type is registered to whichever module first
/// references it.
fn collect_types(ty: &TypeRef, seen: &mut HashSet<TypeRef>, out: &mut Vec<TypeRef>) {
    if seen.contains(ty) {
        return;
    }
    seen.insert(ty.clone());
    match &*ty.kind() {
        types::TypeKind::Struct { fields } | types::TypeKind::Union { fields } => {
            for field in fields {
                collect_types(&field.ty, seen, out);
            }
            out.push(ty.clone());
        }
        types::TypeKind::Enum { underlying, .. } => {
            collect_types(underlying, seen, out);
            out.push(ty.clone());
        }
        types::TypeKind::Pointer { target, .. } => collect_types(target, seen, out),
        types::TypeKind::Closure { params, result, .. } => {
            for param in params {
                collect_types(&param.ty, seen, out);
            }
            collect_types(result, seen, out);
        }
        types::TypeKind::Empty
        | types::TypeKind::Unit
        | types::TypeKind::Bool
        | types::TypeKind::Digit { .. }
        | types::TypeKind::Opaque => {}
    }
}

/// Sizing + forward-declaration pass (§4.3 steps 1–2): walks every module in
/// HIR order, creating SSA stubs for globals/functions/types and the
/// HIR-id → symbol lookup maps used by later passes.
fn forward_declare(
    hir: &HirProgram,
    interner: &TypeInterner,
) -> (Vec<ModuleRef>, HashMap<u64, SymbolRef>, HashMap<u64, SymbolRef>) {
    let mut modules = Vec::with_capacity(hir.modules.len());
    let mut globals_by_id = HashMap::new();
    let mut functions_by_id = HashMap::new();
    let mut seen_types: HashSet<TypeRef> = HashSet::new();

    for hir_module in &hir.modules {
        let path = if hir_module.path.is_empty() {
            vec![hir_module.name.clone()]
        } else {
            hir_module.path.clone()
        };
        let module = module::new_module(hir_module.name.clone(), path);

        for hir_global in &hir_module.globals {
            let ty = interner.intern(&hir_global.ty);
            let storage = convert_storage(interner, &hir_global.storage);
            let mut new_types = Vec::new();
            collect_types(&ty, &mut seen_types, &mut new_types);
            collect_types(&storage.element_type, &mut seen_types, &mut new_types);
            module.types.borrow_mut().extend(new_types);
            let symbol = symbol::new_symbol(
                SymbolKind::Global,
                hir_global.name.clone(),
                hir_global.attribs.link_name.clone(),
                convert_linkage(hir_global.attribs.linkage),
                convert_visibility(hir_global.attribs.visibility),
                ty,
                Some(storage),
            );
            module.globals.borrow_mut().push(symbol.clone());
            globals_by_id.insert(hir_global.id, symbol);
        }

        for hir_function in &hir_module.functions {
            let ty = interner.intern(&hir_function.ty);
            let mut new_types = Vec::new();
            collect_types(&ty, &mut seen_types, &mut new_types);
            let symbol = symbol::new_symbol(
                SymbolKind::Function,
                hir_function.name.clone(),
                hir_function.attribs.link_name.clone(),
                convert_linkage(hir_function.attribs.linkage),
                convert_visibility(hir_function.attribs.visibility),
                ty,
                None,
            );
            for param in &hir_function.params {
                let param_ty = interner.intern(&param.ty);
                collect_types(&param_ty, &mut seen_types, &mut new_types);
                symbol.params.borrow_mut().push(Param {
                    name: param.name.clone(),
                    ty: param_ty,
                });
            }
            for local in &hir_function.locals {
                let storage = convert_storage(interner, &local.storage);
                collect_types(&storage.element_type, &mut seen_types, &mut new_types);
                symbol.locals.borrow_mut().push(Local {
                    name: local.name.clone(),
                    storage,
                });
            }
            module.types.borrow_mut().extend(new_types);
            module.functions.borrow_mut().push(symbol.clone());
            functions_by_id.insert(hir_function.id, symbol);
        }

        modules.push(module);
    }

    (modules, globals_by_id, functions_by_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::hir::{
        HirAttribs, HirLinkage as HL, HirModule as Module, HirStorage as Storage2,
        HirType as Type, HirTypeKind as TK, HirVisibility as HV,
    };

    fn int_ty() -> Type {
        Type {
            id: 1,
            kind: TK::Digit {
                sign: Sign::Signed,
                width: Width::Int,
            },
        }
    }

    #[test]
    fn global_constant_folds_to_addition() {
        let hir = HirProgram {
            modules: vec![Module {
                name: "m".into(),
                path: vec![],
                globals: vec![HirGlobal {
                    id: 1,
                    name: "x".into(),
                    ty: int_ty(),
                    attribs: HirAttribs {
                        link_name: None,
                        linkage: HL::Module,
                        visibility: HV::Public,
                    },
                    storage: Storage2 {
                        element_ty: int_ty(),
                        count: 1,
                        quals: Default::default(),
                    },
                    initial: Some(HirExpr::Binary {
                        op: crate::hir::HirBinaryOp::Add,
                        lhs: Box::new(HirExpr::Digit {
                            ty: int_ty(),
                            value: "40".into(),
                        }),
                        rhs: Box::new(HirExpr::Digit {
                            ty: int_ty(),
                            value: "2".into(),
                        }),
                    }),
                }],
                functions: vec![],
            }],
        };
        let sink = CollectingSink::new();
        let program = Lowering::lower(&hir, &sink);
        assert_eq!(program.modules.len(), 1);
        let global = program.modules[0].globals.borrow()[0].clone();
        let entry = global.entry_block();
        let steps = entry.steps();
        assert_eq!(steps.len(), 2); // binary + return
        assert!(matches!(steps[0].kind, StepKind::Binary { .. }));
        assert!(matches!(steps[1].kind, StepKind::Return { .. }));
    }
}
