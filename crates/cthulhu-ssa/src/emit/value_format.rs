//! C literal formatting for `Value`s.
//!
//! Grounded on `emit.c`'s `c89_format_value`/`c89_write_init`.

use num_bigint::{BigInt, Sign as BigSign};

use crate::emit::mangle::Mangler;
use crate::types::{TypeKind, Width};
use crate::value::{Literal, Value, ValueKind};

fn magnitude_suffix(n: &BigInt) -> &'static str {
    if *n >= BigInt::from(i32::MIN) && *n <= BigInt::from(i32::MAX) {
        ""
    } else if *n >= BigInt::from(i64::MIN) && *n <= BigInt::from(i64::MAX) {
        "ll"
    } else if *n >= BigInt::from(0u8) && *n <= BigInt::from(u64::MAX) {
        "ull"
    } else {
        debug_assert!(false, "digit literal {n} exceeds unsigned long long range");
        "ull"
    }
}

/// Digit literal, base 10, with the suffix/wrapper rules from spec.md §4.5:
/// `max`/`ptr` widths always get an explicit wrapper (no `xxx_C` macro
/// exists for `intptr_t`, so that case uses a cast); every other width uses
/// the plain magnitude-based suffix.
fn format_digit(n: &BigInt, width: Width) -> String {
    match width {
        Width::Max => {
            if n.sign() == BigSign::Minus {
                format!("INTMAX_C({n})")
            } else {
                format!("UINTMAX_C({n})")
            }
        }
        Width::Ptr => {
            if n.sign() == BigSign::Minus {
                format!("(intptr_t)({n})")
            } else {
                format!("(uintptr_t)({n})")
            }
        }
        _ => format!("{n}{}", magnitude_suffix(n)),
    }
}

fn digit_width(ty: &crate::types::TypeRef) -> Width {
    match &*ty.kind() {
        TypeKind::Digit { width, .. } => *width,
        _ => Width::Int,
    }
}

fn format_char(byte: u8) -> String {
    match byte {
        0 => "'\\0'".into(),
        b'\n' => "'\\n'".into(),
        b'\t' => "'\\t'".into(),
        b'\r' => "'\\r'".into(),
        b'\'' => "'\\''".into(),
        b'\\' => "'\\\\'".into(),
        0x20..=0x7e => format!("'{}'", byte as char),
        other => format!("'\\x{other:02x}'"),
    }
}

/// Renders `value` as a C expression. `as_opaque_context` is true when the
/// surrounding type expects a `void*`-compatible expression (so a relative
/// reference must be cast), matching the "or as the bare mangled symbol
/// name when context is a non-opaque pointer" rule in spec.md §4.5.
pub fn format_value(mangler: &Mangler, value: &Value, as_opaque_context: bool) -> String {
    match &value.kind {
        ValueKind::Literal(Literal::Bool(b)) => if *b { "true".into() } else { "false".into() },
        ValueKind::Literal(Literal::Digit(n)) => format_digit(n, digit_width(&value.ty)),
        ValueKind::Literal(Literal::Char(c)) => format_char(*c),
        ValueKind::Literal(Literal::Opaque(n)) => format!("((void*){n}ull)"),
        ValueKind::Literal(Literal::Unit) => String::new(),
        ValueKind::Literal(Literal::Data(items)) => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| format_value(mangler, v, as_opaque_context))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        ValueKind::Relative(r) => {
            let name = mangler.mangle(&r.target);
            if as_opaque_context || matches!(&*value.ty.kind(), TypeKind::Opaque) {
                format!("((void*){name})")
            } else {
                name
            }
        }
    }
}

/// Whether `format_value`'s result is already brace-delimited (a pointer's
/// own literal form, or an aggregate/string) and should not be wrapped in a
/// further `{ ... }` layer by the storage initializer.
fn is_self_delimiting(value: &Value) -> bool {
    matches!(
        &value.kind,
        ValueKind::Literal(Literal::Data(_)) | ValueKind::Relative(_)
    ) || matches!(&*value.ty.kind(), TypeKind::Pointer { .. })
}

/// The full initializer text for a global's storage: non-pointer scalars
/// are wrapped in an extra brace layer because their storage is always
/// declared as a `count`-element array (scenario 1: `int x[1] = { 42 };`);
/// pointer-kind and already-aggregate values print their own delimiters.
pub fn format_init(mangler: &Mangler, value: &Value) -> String {
    let text = format_value(mangler, value, false);
    if is_self_delimiting(value) {
        text
    } else {
        format!("{{ {text} }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{self, Sign};

    #[test]
    fn small_digit_has_no_suffix() {
        let mangler = Mangler::new();
        let v = Value::digit(types::digit(Sign::Signed, Width::Int), BigInt::from(42));
        assert_eq!(format_value(&mangler, &v, false), "42");
    }

    #[test]
    fn scalar_initializer_gets_wrapped_in_braces() {
        let mangler = Mangler::new();
        let v = Value::digit(types::digit(Sign::Signed, Width::Int), BigInt::from(42));
        assert_eq!(format_init(&mangler, &v), "{ 42 }");
    }

    #[test]
    fn string_literal_prints_as_char_array() {
        let mangler = Mangler::new();
        let char_ty = types::digit(Sign::Unsigned, Width::Char);
        let ptr_ty = types::pointer(char_ty.clone(), types::POINTER_SINGLE, types::Quals::default());
        let v = Value::string(ptr_ty, char_ty, b"hi");
        assert_eq!(format_init(&mangler, &v), "{ 'h', 'i', '\\0' }");
    }

    #[test]
    fn opaque_literal_format() {
        let mangler = Mangler::new();
        let v = Value::opaque_literal(types::opaque(), BigInt::from(7));
        assert_eq!(format_value(&mangler, &v, false), "((void*)7ull)");
    }
}
