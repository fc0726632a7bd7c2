//! Translation-unit assembly: preludes, type ordering, per-module or
//! single-pair layout, and writing through the virtual filesystem.
//!
//! Grounded on `emit.c`'s `c89_emit_single`/`c89_emit_modules` and
//! `c89_proto_aggregate`/`define_enum`/`define_type_ordered`.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::{BackendConfig, Layout};
use crate::diagnostics::{DiagnosticId, DiagnosticNode, DiagnosticSink};
use crate::emit::blocks::BlockEmitter;
use crate::emit::mangle::Mangler;
use crate::emit::type_format::{self, digit_name};
use crate::emit::value_format;
use crate::module::ModuleRef;
use crate::program::Program;
use crate::symbol::{SymbolRef, Visibility};
use crate::types::{TypeKind, TypeRef};
use crate::vfs::VirtualFilesystem;

fn write_prelude(out: &mut String, is_header: bool) {
    if is_header {
        out.push_str("#pragma once\n");
    }
    out.push_str("#include <stdbool.h>\n#include <stdint.h>\n#include <stddef.h>\n");
    if is_header {
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n");
    }
}

fn write_postlude(out: &mut String, is_header: bool) {
    if is_header {
        out.push_str("#ifdef __cplusplus\n}\n#endif\n");
    }
}

fn namespace_mirror(module: &ModuleRef, alias: &str, underlying: &str) -> String {
    let ns = module.namespace();
    if ns.is_empty() {
        return String::new();
    }
    format!("#ifdef __cplusplus\nnamespace {ns} {{ using {alias} = ::{underlying}; }}\n#endif\n")
}

/// Depth-first order over aggregate fields used *by value*, so every
/// struct/union is defined after every struct/union it contains by value.
/// Pointer fields don't force an ordering edge: a forward declaration
/// suffices for them.
fn order_aggregates(types: &[TypeRef]) -> Vec<TypeRef> {
    let mut visited: HashSet<TypeRef> = HashSet::new();
    let mut ordered = Vec::new();

    fn visit(ty: &TypeRef, visited: &mut HashSet<TypeRef>, ordered: &mut Vec<TypeRef>) {
        if visited.contains(ty) {
            return;
        }
        visited.insert(ty.clone());
        if let TypeKind::Struct { fields } | TypeKind::Union { fields } = &*ty.kind() {
            for field in fields {
                if matches!(&*field.ty.kind(), TypeKind::Struct { .. } | TypeKind::Union { .. }) {
                    visit(&field.ty, visited, ordered);
                }
            }
        }
        if matches!(&*ty.kind(), TypeKind::Struct { .. } | TypeKind::Union { .. }) {
            ordered.push(ty.clone());
        }
    }

    for ty in types {
        visit(ty, &mut visited, &mut ordered);
    }
    ordered
}

fn proto_aggregate(ty: &TypeRef) -> Option<String> {
    match &*ty.kind() {
        TypeKind::Struct { .. } => Some(format!("struct {};\n", ty.name())),
        TypeKind::Union { .. } => Some(format!("union {};\n", ty.name())),
        _ => None,
    }
}

fn define_aggregate(sink: &dyn DiagnosticSink, ty: &TypeRef) -> String {
    let (keyword, fields) = match &*ty.kind() {
        TypeKind::Struct { fields } => ("struct", fields.clone()),
        TypeKind::Union { fields } => ("union", fields.clone()),
        _ => return String::new(),
    };
    let body = fields
        .iter()
        .map(|f| format!("{};", type_format::format_type(sink, &f.ty, &f.name)))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{keyword} {} {{ {body} }};\n", ty.name())
}

fn define_enum(module: &ModuleRef, ty: &TypeRef) -> String {
    let (underlying, cases) = match &*ty.kind() {
        TypeKind::Enum { underlying, cases } => (underlying.clone(), cases.clone()),
        _ => return String::new(),
    };
    let underlying_c = match &*underlying.kind() {
        TypeKind::Digit { sign, width } => digit_name(*sign, *width),
        _ => "int",
    };
    let name = ty.name();
    let mut out = format!("typedef {underlying_c} {name}_underlying_t;\n");
    let case_list = cases
        .iter()
        .map(|c| format!("e{name}{} = {}", c.name, c.value))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "enum {name}_cases_t {{ {case_list} }};");
    out.push_str(&namespace_mirror(module, &name, &format!("{name}_underlying_t")));
    out
}

fn global_decl(sink: &dyn DiagnosticSink, mangler: &Mangler, symbol: &SymbolRef) -> String {
    let storage = symbol
        .storage
        .as_ref()
        .expect("global symbol without storage");
    format!(
        "extern {};\n",
        type_format::format_storage(sink, storage, &mangler.mangle(symbol))
    )
}

fn global_def(sink: &dyn DiagnosticSink, mangler: &Mangler, symbol: &SymbolRef) -> String {
    let storage = symbol
        .storage
        .as_ref()
        .expect("global symbol without storage");
    let decl = type_format::format_storage(sink, storage, &mangler.mangle(symbol));
    let prefix = if symbol.visibility == Visibility::Private {
        "static "
    } else {
        ""
    };
    match &*symbol.value.borrow() {
        Some(v) => format!("{prefix}{decl} = {};\n", value_format::format_init(mangler, v)),
        None => format!("{prefix}{decl};\n"),
    }
}

fn function_proto(sink: &dyn DiagnosticSink, mangler: &Mangler, symbol: &SymbolRef) -> String {
    let sig = type_format::format_type(sink, &symbol.ty, &mangler.mangle(symbol));
    if symbol.is_import() {
        format!("extern {sig};\n")
    } else if symbol.visibility == Visibility::Private {
        format!("static {sig};\n")
    } else {
        format!("{sig};\n")
    }
}

fn function_def(sink: &dyn DiagnosticSink, mangler: &Mangler, symbol: &SymbolRef) -> String {
    if symbol.is_import() {
        return function_proto(sink, mangler, symbol);
    }
    let sig = type_format::format_type(sink, &symbol.ty, &mangler.mangle(symbol));
    let prefix = if symbol.visibility == Visibility::Private {
        "static "
    } else {
        ""
    };
    let emitter = BlockEmitter::new(sink, mangler, symbol);
    let mut body = String::new();
    for local in symbol.locals.borrow().iter() {
        let decl = type_format::format_storage(
            sink,
            &local.storage,
            &crate::emit::mangle::local_name(&local.name),
        );
        let _ = write!(body, " {decl};");
    }
    let entry = symbol.entry_block();
    let _ = write!(
        body,
        " goto {};",
        crate::emit::mangle::block_label(entry.name())
    );
    for block in symbol.blocks.borrow().iter() {
        let _ = write!(body, " {}", emitter.write_block(block));
    }
    format!("{prefix}{sig} {{{body} }}\n")
}

fn build_owner_map(program: &Program) -> HashMap<SymbolRef, ModuleRef> {
    let mut owners = HashMap::new();
    for module in &program.modules {
        for g in module.globals.borrow().iter() {
            owners.insert(g.clone(), module.clone());
        }
        for f in module.functions.borrow().iter() {
            owners.insert(f.clone(), module.clone());
        }
    }
    owners
}

fn write_file(fs: &dyn VirtualFilesystem, path: &std::path::Path, text: &str) {
    let mut handle = fs.open_for_write(path).expect("failed to open output file");
    handle
        .write_bytes(text.as_bytes())
        .expect("failed to write output file");
    handle.close().expect("failed to close output file");
}

pub fn run(
    program: &Program,
    config: &BackendConfig,
    sink: &dyn DiagnosticSink,
    fs: &dyn VirtualFilesystem,
) -> Vec<PathBuf> {
    if config.has_mismatched_output_paths() {
        sink.notify(
            DiagnosticId::SourceAndHeaderOutput,
            DiagnosticNode("config".into()),
            "exactly one of output_header/output_source was set".into(),
        );
        return Vec::new();
    }

    let mangler = Mangler::new();
    match config.layout() {
        Layout::Single => emit_single(program, config, sink, fs, &mangler),
        Layout::PerModule => emit_per_module(program, sink, fs, &mangler),
    }
}

fn emit_single(
    program: &Program,
    config: &BackendConfig,
    sink: &dyn DiagnosticSink,
    fs: &dyn VirtualFilesystem,
    mangler: &Mangler,
) -> Vec<PathBuf> {
    let header_path = config
        .output_header
        .clone()
        .unwrap_or_else(|| PathBuf::from("module.h"));
    let source_path = config
        .output_source
        .clone()
        .unwrap_or_else(|| PathBuf::from("module.c"));

    let all_types: Vec<TypeRef> = program
        .modules
        .iter()
        .flat_map(|m| m.types.borrow().clone())
        .collect();

    let mut header = String::new();
    write_prelude(&mut header, true);
    for ty in &all_types {
        if let Some(proto) = proto_aggregate(ty) {
            header.push_str(&proto);
        }
    }
    for module in &program.modules {
        for ty in module.types.borrow().iter() {
            if matches!(&*ty.kind(), TypeKind::Enum { .. }) {
                header.push_str(&define_enum(module, ty));
            }
        }
    }
    for module in &program.modules {
        for g in module.globals.borrow().iter() {
            if g.visibility == Visibility::Public {
                header.push_str(&global_decl(sink, mangler, g));
            }
        }
        for f in module.functions.borrow().iter() {
            if f.visibility == Visibility::Public {
                header.push_str(&function_proto(sink, mangler, f));
            }
        }
    }
    write_postlude(&mut header, true);

    let mut source = String::new();
    let _ = writeln!(source, "#include \"{}\"", header_path.display());
    let ordered_aggregates = order_aggregates(&all_types);
    for ty in &ordered_aggregates {
        source.push_str(&define_aggregate(sink, ty));
    }
    for module in &program.modules {
        for f in module.functions.borrow().iter() {
            if f.visibility == Visibility::Private {
                source.push_str(&function_proto(sink, mangler, f));
            }
        }
    }
    for module in &program.modules {
        for g in module.globals.borrow().iter() {
            source.push_str(&global_def(sink, mangler, g));
        }
    }
    for module in &program.modules {
        for f in module.functions.borrow().iter() {
            source.push_str(&function_def(sink, mangler, f));
        }
    }

    write_file(fs, &header_path, &header);
    write_file(fs, &source_path, &source);
    vec![header_path, source_path]
}

fn emit_per_module(
    program: &Program,
    sink: &dyn DiagnosticSink,
    fs: &dyn VirtualFilesystem,
    mangler: &Mangler,
) -> Vec<PathBuf> {
    let owners = build_owner_map(program);
    let mut outputs = Vec::new();

    for module in &program.modules {
        let types = module.types.borrow().clone();
        let ordered_aggregates = order_aggregates(&types);

        let mut needed: HashSet<String> = HashSet::new();
        let symbols = module
            .globals
            .borrow()
            .iter()
            .chain(module.functions.borrow().iter())
            .cloned()
            .collect::<Vec<_>>();
        for symbol in &symbols {
            if let Some(deps) = program.dependencies_of(symbol) {
                for dep in deps {
                    if let Some(owner) = owners.get(dep) {
                        if owner.as_ptr() != module.as_ptr() {
                            needed.insert(owner.file_path());
                        }
                    }
                }
            }
        }

        let header_path = PathBuf::from(format!("include/{}.h", module.file_path()));
        let source_path = PathBuf::from(format!("src/{}.c", module.file_path()));

        let mut header = String::new();
        write_prelude(&mut header, true);
        let mut sorted_includes: Vec<_> = needed.into_iter().collect();
        sorted_includes.sort();
        for path in &sorted_includes {
            let _ = writeln!(header, "#include \"include/{path}.h\"");
        }
        for ty in &types {
            if let Some(proto) = proto_aggregate(ty) {
                header.push_str(&proto);
            }
        }
        for ty in &types {
            if matches!(&*ty.kind(), TypeKind::Enum { .. }) {
                header.push_str(&define_enum(module, ty));
            }
        }
        for g in module.globals.borrow().iter() {
            if g.visibility == Visibility::Public {
                header.push_str(&global_decl(sink, mangler, g));
            }
        }
        for f in module.functions.borrow().iter() {
            if f.visibility == Visibility::Public {
                header.push_str(&function_proto(sink, mangler, f));
            }
        }
        write_postlude(&mut header, true);

        let mut source = String::new();
        let _ = writeln!(source, "#include \"include/{}.h\"", module.file_path());
        for ty in &ordered_aggregates {
            source.push_str(&define_aggregate(sink, ty));
        }
        for f in module.functions.borrow().iter() {
            if f.visibility == Visibility::Private {
                source.push_str(&function_proto(sink, mangler, f));
            }
        }
        for g in module.globals.borrow().iter() {
            source.push_str(&global_def(sink, mangler, g));
        }
        for f in module.functions.borrow().iter() {
            source.push_str(&function_def(sink, mangler, f));
        }

        write_file(fs, &header_path, &header);
        write_file(fs, &source_path, &source);
        outputs.push(header_path);
        outputs.push(source_path);
    }

    outputs
}
