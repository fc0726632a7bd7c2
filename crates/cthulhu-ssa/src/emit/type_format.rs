//! C declarator formatting.
//!
//! Grounded on `examples/original_source/src/target/cfamily/src/c89.h`'s
//! declarator builder and `emit.c`'s `c89_format_type`/`c89_format_storage`.
//! The only place C syntax quirks live, per spec.md §4.5.

use crate::diagnostics::{DiagnosticId, DiagnosticNode, DiagnosticSink};
use crate::symbol::Storage;
use crate::types::{self, Quals, Sign, TypeKind, TypeRef, Width};

/// C type name for a digit type, independent of qualifiers or declarator
/// position.
pub fn digit_name(sign: Sign, width: Width) -> &'static str {
    use Sign::*;
    use Width::*;
    match (sign, width) {
        (Signed, Char) => "signed char",
        (Unsigned, Char) => "unsigned char",
        (Signed, Short) => "short",
        (Unsigned, Short) => "unsigned short",
        (Signed, Int) => "int",
        (Unsigned, Int) => "unsigned int",
        (Signed, Long) => "long",
        (Unsigned, Long) => "unsigned long",
        (Signed, Size) => "ssize_t",
        (Unsigned, Size) => "size_t",
        (Signed, Ptr) => "intptr_t",
        (Unsigned, Ptr) => "uintptr_t",
        (Signed, Max) => "intmax_t",
        (Unsigned, Max) => "uintmax_t",
        (Signed, Fast8) => "int_fast8_t",
        (Unsigned, Fast8) => "uint_fast8_t",
        (Signed, Fast16) => "int_fast16_t",
        (Unsigned, Fast16) => "uint_fast16_t",
        (Signed, Fast32) => "int_fast32_t",
        (Unsigned, Fast32) => "uint_fast32_t",
        (Signed, Fast64) => "int_fast64_t",
        (Unsigned, Fast64) => "uint_fast64_t",
        (Signed, Least8) => "int_least8_t",
        (Unsigned, Least8) => "uint_least8_t",
        (Signed, Least16) => "int_least16_t",
        (Unsigned, Least16) => "uint_least16_t",
        (Signed, Least32) => "int_least32_t",
        (Unsigned, Least32) => "uint_least32_t",
        (Signed, Least64) => "int_least64_t",
        (Unsigned, Least64) => "uint_least64_t",
        (Signed, Bits8) => "int8_t",
        (Unsigned, Bits8) => "uint8_t",
        (Signed, Bits16) => "int16_t",
        (Unsigned, Bits16) => "uint16_t",
        (Signed, Bits32) => "int32_t",
        (Unsigned, Bits32) => "uint32_t",
        (Signed, Bits64) => "int64_t",
        (Unsigned, Bits64) => "uint64_t",
    }
}

/// Base type name (no pointer stars, no array brackets, no qualifiers):
/// what a declarator's innermost token is.
fn base_type_name(ty: &TypeRef) -> String {
    match &*ty.kind() {
        TypeKind::Empty | TypeKind::Unit => "void".into(),
        TypeKind::Bool => "bool".into(),
        TypeKind::Digit { sign, width } => digit_name(*sign, *width).into(),
        TypeKind::Opaque => "void".into(),
        TypeKind::Struct { .. } => format!("struct {}", ty.name()),
        TypeKind::Union { .. } => format!("union {}", ty.name()),
        TypeKind::Enum { .. } => format!("{}_underlying_t", ty.name()),
        // Reached only when a pointer/closure is the base of itself, i.e.
        // never: both variants are handled before recursing to base case.
        TypeKind::Pointer { .. } | TypeKind::Closure { .. } => unreachable!(
            "pointer/closure types are handled by format_declarator directly"
        ),
    }
}

fn is_compound_target(target: &TypeRef) -> bool {
    matches!(
        &*target.kind(),
        TypeKind::Closure { .. }
    ) || matches!(&*target.kind(), TypeKind::Pointer { length, .. }
        if *length != types::POINTER_SINGLE && *length != types::POINTER_UNBOUNDED)
}

fn format_params(params: &[crate::types::Param], variadic: bool) -> String {
    if params.is_empty() && !variadic {
        return "void".into();
    }
    let mut parts: Vec<String> = params
        .iter()
        .map(|p| format_declarator(p.ty.clone(), p.name.clone()))
        .collect();
    if variadic {
        parts.push("...".into());
    }
    parts.join(", ")
}

/// Builds the declarator string `<base> <name-with-pointer/array/function
/// syntax>`, handling pointer-of-array, array-of-pointer, and
/// function-pointer nesting.
fn format_declarator(ty: TypeRef, name: String) -> String {
    match &*ty.kind() {
        TypeKind::Pointer { target, length }
            if *length == types::POINTER_SINGLE || *length == types::POINTER_UNBOUNDED =>
        {
            let wrapped = if is_compound_target(target) {
                format!("(*{name})")
            } else {
                format!("*{name}")
            };
            let target = target.clone();
            format_declarator(target, wrapped)
        }
        TypeKind::Pointer { target, length } => {
            let target = target.clone();
            let length = *length;
            format_declarator(target, format!("{name}[{length}]"))
        }
        TypeKind::Closure {
            params,
            result,
            variadic,
        } => {
            let params_str = format_params(params, *variadic);
            let result = result.clone();
            format_declarator(result, format!("{name}({params_str})"))
        }
        _ => format!("{} {}", base_type_name(&ty), name),
    }
}

fn qualifier_prefix(sink: &dyn DiagnosticSink, node: &str, quals: Quals) -> String {
    let mut prefix = String::new();
    if quals.is_const {
        prefix.push_str("const ");
    }
    if quals.is_volatile {
        prefix.push_str("volatile ");
    }
    if quals.is_atomic {
        sink.notify(
            DiagnosticId::UnsupportedAtomic,
            DiagnosticNode(node.into()),
            "atomic qualifier is not representable in C89; dropped".into(),
        );
    }
    prefix
}

/// Full declarator for `ty name`, with qualifiers prefixed.
pub fn format_type(sink: &dyn DiagnosticSink, ty: &TypeRef, name: &str) -> String {
    let prefix = qualifier_prefix(sink, name, ty.quals());
    format!("{prefix}{}", format_declarator(ty.clone(), name.to_string()))
}

/// A symbol's storage declarator. Pointer-typed storage uses the type's own
/// array-ness (`length`), ignoring `storage.count`; non-pointer storage is
/// always declared as a `count`-element array, matching scenario 1's
/// `extern int x[1];` for a scalar global.
pub fn format_storage(sink: &dyn DiagnosticSink, storage: &Storage, name: &str) -> String {
    let prefix = qualifier_prefix(sink, name, storage.quals);
    if matches!(&*storage.element_type.kind(), TypeKind::Pointer { .. }) {
        let decl = format_declarator(storage.element_type.clone(), name.to_string());
        format!("{prefix}{decl}")
    } else {
        let decl = format_declarator(
            storage.element_type.clone(),
            format!("{name}[{}]", storage.count),
        );
        format!("{prefix}{decl}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::types::{self as t, Case};

    #[test]
    fn pointer_to_array_parenthesizes() {
        let sink = CollectingSink::new();
        let array = t::pointer(t::digit(Sign::Signed, Width::Int), 5, Quals::default());
        let ptr_to_array = t::pointer(array, types::POINTER_SINGLE, Quals::default());
        let decl = format_type(&sink, &ptr_to_array, "p");
        assert_eq!(decl, "int (*p)[5]");
    }

    #[test]
    fn array_of_pointer_has_no_parens() {
        let sink = CollectingSink::new();
        let ptr = t::pointer(t::digit(Sign::Signed, Width::Int), types::POINTER_SINGLE, Quals::default());
        let array_of_ptr = t::pointer(ptr, 5, Quals::default());
        let decl = format_type(&sink, &array_of_ptr, "p");
        assert_eq!(decl, "int *p[5]");
    }

    #[test]
    fn scalar_storage_is_declared_as_one_element_array() {
        let sink = CollectingSink::new();
        let storage = Storage {
            element_type: t::digit(Sign::Signed, Width::Int),
            count: 1,
            quals: Quals::default(),
        };
        assert_eq!(format_storage(&sink, &storage, "x"), "int x[1]");
    }

    #[test]
    fn enum_underlying_type_name() {
        let underlying = t::digit(Sign::Signed, Width::Int);
        let color = t::enum_("Color", underlying, vec![Case { name: "Red".into(), value: 0.into() }]);
        assert_eq!(base_type_name(&color), "Color_underlying_t");
    }

    #[test]
    fn atomic_qualifier_reports_warning_and_is_dropped() {
        let sink = CollectingSink::new();
        let mut quals = Quals::default();
        quals.is_atomic = true;
        let ty = t::digit(Sign::Unsigned, Width::Int);
        // can't set quals on an interned TypeRef directly; exercise the
        // qualifier path itself instead.
        let _ = ty;
        let decl = qualifier_prefix(&sink, "x", quals);
        assert_eq!(decl, "");
        assert_eq!(sink.error_count(), 0);
        assert_eq!(sink.diagnostics().len(), 1);
    }
}
