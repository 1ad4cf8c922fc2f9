//! Rust backend
//!
//! Emits a types module (`Id<T>`, enums, one struct per table) and a
//! database module holding the `Db` container with typed lookups.

use crate::model::{CodegenModel, EnumModel, FieldKind, FindParam, RecordModel};
use crate::render::Renderer;
use crate::{Backend, CodegenError, GeneratedFile};
use csvdb_core::{Config, FieldType};
use serde::Serialize;
use std::collections::HashSet;

/// Type names the generated modules define or rely on from the prelude
const RESERVED_TYPES: [&str; 12] = [
    "Id", "Db", "DbTable", "UnknownName", "String", "Vec", "Option", "Some", "None", "Result",
    "Ok", "Err",
];

const KEYWORDS: [&str; 51] = [
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Rust spelling of a scalar type
pub fn rust_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "String",
        FieldType::Bool => "bool",
        FieldType::Int8 => "i8",
        FieldType::Int16 => "i16",
        FieldType::Int32 => "i32",
        FieldType::Int64 => "i64",
        FieldType::UInt8 => "u8",
        FieldType::UInt16 => "u16",
        FieldType::UInt32 => "u32",
        FieldType::UInt64 => "u64",
        FieldType::Float32 => "f32",
        FieldType::Float64 => "f64",
    }
}

/// `LeftWeapon` -> `left_weapon`, `MaxHP` -> `max_hp`
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_uppercase() {
            out.push(c);
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
            Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
            _ => false,
        };
        if boundary {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }

    out
}

/// Make a name usable as an identifier, escaping keywords
pub fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" => format!("{name}_"),
        _ if KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_string(),
    }
}

#[derive(Serialize)]
struct TypesView {
    enums: Vec<EnumView>,
    records: Vec<RecordView>,
}

#[derive(Serialize)]
struct EnumView {
    name: String,
    repr: &'static str,
    members: Vec<MemberView>,
    sorted: Vec<MemberView>,
    count: Option<usize>,
}

#[derive(Serialize)]
struct MemberView {
    name: String,
    ident: String,
    value: String,
    comment: Option<String>,
    is_default: bool,
}

#[derive(Serialize)]
struct RecordView {
    name: String,
    fields: Vec<FieldView>,
}

#[derive(Serialize)]
struct FieldView {
    name: String,
    ty: String,
    doc: Option<String>,
}

#[derive(Serialize)]
struct DbView {
    types_module: String,
    tables: Vec<TableView>,
    finds: Vec<FindView>,
}

#[derive(Serialize)]
struct TableView {
    ty: String,
    field: String,
    is_global: bool,
}

#[derive(Serialize)]
struct FindView {
    table: String,
    ty: String,
    field: String,
    method: String,
    params: String,
    less: String,
    matches: String,
}

/// Generates `db_types.rs` and `db.rs`
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn generate(
        &self,
        renderer: &Renderer,
        model: &CodegenModel,
        config: &Config,
    ) -> Result<Vec<GeneratedFile>, CodegenError> {
        check_names(model)?;

        let types = TypesView {
            enums: model.enums.iter().map(enum_view).collect(),
            records: model.records.iter().map(record_view).collect(),
        };

        let declarations = config.declarations_file();
        let db = DbView {
            types_module: declarations
                .strip_suffix(".rs")
                .unwrap_or(&declarations)
                .to_string(),
            tables: model
                .records
                .iter()
                .map(|r| TableView {
                    ty: rust_ident(&r.name),
                    field: rust_ident(&snake_case(&r.name)),
                    is_global: r.is_global,
                })
                .collect(),
            finds: model
                .records
                .iter()
                .filter_map(|r| r.find.as_deref().map(|params| find_view(r, params)))
                .collect(),
        };

        Ok(vec![
            GeneratedFile::new(declarations.clone(), renderer.render("db_types.rs", &types)?),
            GeneratedFile::new(config.definitions_file(), renderer.render("db.rs", &db)?),
        ])
    }
}

/// Reject names the generated modules cannot hold
fn check_names(model: &CodegenModel) -> Result<(), CodegenError> {
    let types = model
        .enums
        .iter()
        .map(|e| (e.table.as_str(), e.name.as_str()))
        .chain(model.records.iter().map(|r| (r.name.as_str(), r.name.as_str())));
    for (table, name) in types {
        if RESERVED_TYPES.contains(&name) {
            return Err(CodegenError::ReservedName {
                table: table.to_string(),
                name: name.to_string(),
            });
        }
    }

    let mut tables = HashSet::new();
    for record in &model.records {
        let field = snake_case(&record.name);
        if !tables.insert(field.clone()) {
            return Err(CodegenError::NameClash {
                table: record.name.clone(),
                name: field,
            });
        }

        let mut fields = HashSet::new();
        for f in &record.fields {
            let name = snake_case(&f.name);
            if !fields.insert(name.clone()) {
                return Err(CodegenError::NameClash {
                    table: record.name.clone(),
                    name,
                });
            }
        }
    }

    Ok(())
}

fn enum_view(e: &EnumModel) -> EnumView {
    let member = |name: &str, value: &str, comment: Option<&String>| MemberView {
        name: name.to_string(),
        ident: rust_ident(name),
        value: value.to_string(),
        comment: comment.cloned(),
        is_default: name == e.default_member,
    };

    EnumView {
        name: rust_ident(&e.name),
        repr: rust_type(e.repr),
        members: e
            .members
            .iter()
            .map(|m| member(&m.name, &m.value, m.comment.as_ref()))
            .collect(),
        sorted: e.sorted_names.iter().map(|n| member(n, "", None)).collect(),
        count: e.count,
    }
}

fn kind_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar { field_type } => rust_type(*field_type).to_string(),
        FieldKind::Enum { name, .. } => rust_ident(name),
        FieldKind::Id { table } => format!("Id<{}>", rust_ident(table)),
    }
}

fn record_view(record: &RecordModel) -> RecordView {
    RecordView {
        name: rust_ident(&record.name),
        fields: record
            .fields
            .iter()
            .map(|f| FieldView {
                name: rust_ident(&snake_case(&f.name)),
                ty: kind_type(&f.kind),
                doc: f.doc.clone(),
            })
            .collect(),
    }
}

/// Comparison of `{row}.{member}` against the parameter of the same name
fn compare(row: &str, param: &FindParam, op: &str) -> String {
    let name = rust_ident(&snake_case(&param.member));
    match &param.kind {
        FieldKind::Scalar { field_type: FieldType::String } if op == "<" => {
            format!("{row}.{name}.as_str() < {name}")
        }
        FieldKind::Scalar {
            field_type: FieldType::Float32 | FieldType::Float64,
        } => {
            let check = if op == "<" { "is_lt" } else { "is_eq" };
            format!("{row}.{name}.total_cmp(&{name}).{check}()")
        }
        _ => format!("{row}.{name} {op} {name}"),
    }
}

fn find_view(record: &RecordModel, params: &[FindParam]) -> FindView {
    let list = params
        .iter()
        .map(|p| {
            let ty = match &p.kind {
                FieldKind::Scalar { field_type: FieldType::String } => "&str".to_string(),
                kind => kind_type(kind),
            };
            format!("{}: {ty}", rust_ident(&snake_case(&p.member)))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let less = params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut terms: Vec<String> = params[..i].iter().map(|q| compare("_left", q, "==")).collect();
            terms.push(compare("_left", p, "<"));
            if i == 0 {
                terms.join(" && ")
            } else {
                format!("({})", terms.join(" && "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n                || ");

    let matches = params
        .iter()
        .map(|p| compare("_row", p, "=="))
        .collect::<Vec<_>>()
        .join(" && ");

    let snake = snake_case(&record.name);
    FindView {
        table: record.name.clone(),
        ty: rust_ident(&record.name),
        field: rust_ident(&snake),
        method: format!("find_{snake}"),
        params: list,
        less,
        matches,
    }
}
