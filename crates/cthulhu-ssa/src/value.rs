//! SSA constant values.
//!
//! Grounded on `ssa/src/common/value.c`: a tagged literal payload plus a
//! `relative` variant for compile-time-known symbol addresses.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::symbol::SymbolRef;
use crate::types::{TypeKind, TypeRef};

/// A compile-time-known pointer expressed as "address of a named symbol".
#[derive(Debug, Clone)]
pub struct Relative {
    pub target: SymbolRef,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Bool(bool),
    Digit(BigInt),
    Char(u8),
    /// Aggregate or string initializer: an ordered list of element values.
    Data(Vec<Rc<Value>>),
    /// An integer value reinterpreted as a pointer (`opaque` type).
    Opaque(BigInt),
    Unit,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Literal(Literal),
    Relative(Relative),
}

#[derive(Debug, Clone)]
pub struct Value {
    pub ty: TypeRef,
    pub init: bool,
    pub kind: ValueKind,
}

impl Value {
    fn literal(ty: TypeRef, init: bool, literal: Literal) -> Rc<Self> {
        Rc::new(Value {
            ty,
            init,
            kind: ValueKind::Literal(literal),
        })
    }

    pub fn empty(ty: TypeRef) -> Rc<Self> {
        Self::literal(ty, true, Literal::Unit)
    }

    pub fn unit(ty: TypeRef) -> Rc<Self> {
        Self::literal(ty, true, Literal::Unit)
    }

    pub fn bool_(ty: TypeRef, value: bool) -> Rc<Self> {
        debug_assert!(matches!(&*ty.kind(), TypeKind::Bool));
        Self::literal(ty, true, Literal::Bool(value))
    }

    pub fn digit(ty: TypeRef, value: BigInt) -> Rc<Self> {
        debug_assert!(matches!(&*ty.kind(), TypeKind::Digit { .. }));
        Self::literal(ty, true, Literal::Digit(value))
    }

    pub fn char_(ty: TypeRef, value: u8) -> Rc<Self> {
        Self::literal(ty, true, Literal::Char(value))
    }

    /// A string literal: a vector of per-byte char values, including the
    /// trailing NUL, wrapped as an aggregate `Data` literal of pointer type.
    pub fn string(ty: TypeRef, char_ty: TypeRef, bytes: &[u8]) -> Rc<Self> {
        debug_assert!(matches!(&*ty.kind(), TypeKind::Pointer { .. }));
        let mut data: Vec<Rc<Value>> = bytes
            .iter()
            .map(|b| Value::char_(char_ty.clone(), *b))
            .collect();
        data.push(Value::char_(char_ty, 0));
        Self::literal(ty, true, Literal::Data(data))
    }

    pub fn noinit(ty: TypeRef) -> Rc<Self> {
        Rc::new(Value {
            ty,
            init: false,
            kind: ValueKind::Literal(Literal::Unit),
        })
    }

    pub fn literal_value(ty: TypeRef, literal: Literal) -> Rc<Self> {
        Self::literal(ty, true, literal)
    }

    pub fn opaque_literal(ty: TypeRef, value: BigInt) -> Rc<Self> {
        debug_assert!(matches!(&*ty.kind(), TypeKind::Opaque));
        Self::literal(ty, true, Literal::Opaque(value))
    }

    pub fn relative(ty: TypeRef, target: SymbolRef) -> Rc<Self> {
        debug_assert!(matches!(&*ty.kind(), TypeKind::Pointer { .. }));
        Rc::new(Value {
            ty,
            init: true,
            kind: ValueKind::Relative(Relative { target }),
        })
    }

    /// Panics (debug) if this value is a `relative` reference, not a literal.
    pub fn as_literal(&self) -> &Literal {
        match &self.kind {
            ValueKind::Literal(l) => l,
            ValueKind::Relative(_) => panic!("value is relative, not literal"),
        }
    }

    pub fn as_relative(&self) -> &Relative {
        match &self.kind {
            ValueKind::Relative(r) => r,
            ValueKind::Literal(_) => panic!("value is literal, not relative"),
        }
    }

    pub fn get_bool(&self) -> bool {
        match self.as_literal() {
            Literal::Bool(b) => *b,
            other => panic!("value is not a bool literal: {other:?}"),
        }
    }

    pub fn get_digit(&self) -> BigInt {
        match self.as_literal() {
            Literal::Digit(d) => d.clone(),
            Literal::Opaque(d) => d.clone(),
            Literal::Char(c) => BigInt::from(*c),
            other => panic!("value is not a digit-like literal: {other:?}"),
        }
    }
}
