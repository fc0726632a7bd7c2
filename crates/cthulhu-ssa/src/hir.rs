//! Stand-in for the resolved semantic tree (HIR) produced by name resolution.
//!
//! This is an out-of-scope collaborator (spec.md §1): the scanner, parser,
//! and name resolver that would build this tree are not part of this crate.
//! What's here is exactly the query surface §6 requires — kind tag, name,
//! type, attribute bundle, storage descriptor, children — plus a
//! `serde::Deserialize` impl so the `ssac` CLI harness can load fixture
//! programs from JSON instead of requiring a real frontend.

use serde::Deserialize;

use crate::types::{Sign, Width};

#[derive(Debug, Clone, Deserialize)]
pub struct HirProgram {
    pub modules: Vec<HirModule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirModule {
    pub name: String,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub globals: Vec<HirGlobal>,
    #[serde(default)]
    pub functions: Vec<HirFunction>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HirLinkage {
    Import,
    Export,
    Module,
    EntryCli,
    EntryGui,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HirVisibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirAttribs {
    #[serde(default)]
    pub link_name: Option<String>,
    pub linkage: HirLinkage,
    pub visibility: HirVisibility,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HirQuals {
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_volatile: bool,
    #[serde(default)]
    pub is_atomic: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirStorage {
    pub element_ty: HirType,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub quals: HirQuals,
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirGlobal {
    pub id: u64,
    pub name: String,
    pub ty: HirType,
    pub attribs: HirAttribs,
    pub storage: HirStorage,
    #[serde(default)]
    pub initial: Option<HirExpr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirParam {
    pub id: u64,
    pub name: String,
    pub ty: HirType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirLocal {
    pub id: u64,
    pub name: String,
    pub storage: HirStorage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirFunction {
    pub id: u64,
    pub name: String,
    pub ty: HirType,
    pub attribs: HirAttribs,
    #[serde(default)]
    pub params: Vec<HirParam>,
    #[serde(default)]
    pub locals: Vec<HirLocal>,
    #[serde(default)]
    pub body: Option<HirStmt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirField {
    pub name: String,
    pub ty: HirType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HirCase {
    pub name: String,
    /// Decimal text, parsed to a bigint at lowering time (may fail with
    /// `InvalidIntegerLiteral`).
    pub value: String,
}

/// Every `HirType` node carries a stable `id`, the identity the type
/// interner keys on (standing in for the original's `tree_t *` pointer
/// identity — the same HIR type node reused twice must carry the same id).
#[derive(Debug, Clone, Deserialize)]
pub struct HirType {
    pub id: u64,
    pub kind: HirTypeKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HirTypeKind {
    Empty,
    Unit,
    Bool,
    Digit {
        sign: Sign,
        width: Width,
    },
    Opaque,
    Pointer {
        target: Box<HirType>,
        length: usize,
    },
    /// Single-object reference sugar; lowers to `pointer(target, 0)`.
    Reference {
        target: Box<HirType>,
    },
    Closure {
        params: Vec<HirParam>,
        result: Box<HirType>,
        variadic: bool,
    },
    Struct {
        name: String,
        fields: Vec<HirField>,
    },
    Union {
        name: String,
        fields: Vec<HirField>,
    },
    Enum {
        name: String,
        underlying: Box<HirType>,
        cases: Vec<HirCase>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HirUnaryOp {
    Neg,
    Abs,
    Flip,
    Not,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HirBinaryOp {
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

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HirCompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HirExpr {
    Empty,
    Digit {
        ty: HirType,
        /// Decimal text; parse failure is `InvalidIntegerLiteral`.
        value: String,
    },
    Bool {
        ty: HirType,
        value: bool,
    },
    Unit {
        ty: HirType,
    },
    StringLit {
        ty: HirType,
        text: String,
    },
    Cast {
        ty: HirType,
        expr: Box<HirExpr>,
    },
    Offset {
        expr: Box<HirExpr>,
        index: Box<HirExpr>,
    },
    Field {
        object: Box<HirExpr>,
        field_index: usize,
    },
    Unary {
        op: HirUnaryOp,
        operand: Box<HirExpr>,
    },
    Binary {
        op: HirBinaryOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },
    Compare {
        op: HirCompareOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },
    GlobalRef {
        id: u64,
    },
    FunctionRef {
        id: u64,
    },
    LocalRef {
        id: u64,
    },
    ParamRef {
        id: u64,
    },
    Load {
        expr: Box<HirExpr>,
    },
    Address {
        expr: Box<HirExpr>,
    },
    Call {
        callee: Box<HirExpr>,
        args: Vec<HirExpr>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HirJump {
    Break,
    Continue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HirStmt {
    Block {
        stmts: Vec<HirStmt>,
    },
    Expr {
        expr: HirExpr,
    },
    Assign {
        dst: HirExpr,
        src: HirExpr,
    },
    Return {
        value: Option<HirExpr>,
    },
    Branch {
        cond: HirExpr,
        then_branch: Box<HirStmt>,
        #[serde(default)]
        other: Option<Box<HirStmt>>,
    },
    Loop {
        cond: HirExpr,
        body: Box<HirStmt>,
    },
    Jump {
        jump: HirJump,
    },
}
