//! C++ backend
//!
//! Emits a header with the enums, record classes and the `DB` container, and
//! a source file with enum name lookups and the `DB::Find` overloads.

use crate::model::{CodegenModel, EnumModel, FieldKind, FindParam, RecordModel};
use crate::render::Renderer;
use crate::{Backend, CodegenError, GeneratedFile};
use csvdb_core::{Config, FieldType};
use serde::Serialize;

/// Names the generated header declares itself
const RESERVED_TYPES: &[&str] = &["DB", "IDType", "IterType"];

/// Member aliases every record class declares
const RESERVED_MEMBERS: &[&str] = &["ID", "Iter"];

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

/// C++ spelling of a scalar type
pub fn cpp_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "std::string",
        FieldType::Bool => "bool",
        FieldType::Int8 => "int8_t",
        FieldType::Int16 => "int16_t",
        FieldType::Int32 => "int32_t",
        FieldType::Int64 => "int64_t",
        FieldType::UInt8 => "uint8_t",
        FieldType::UInt16 => "uint16_t",
        FieldType::UInt32 => "uint32_t",
        FieldType::UInt64 => "uint64_t",
        FieldType::Float32 => "float",
        FieldType::Float64 => "double",
    }
}

/// Template filter mapping a type keyword to its C++ spelling
pub(crate) fn cpp_type_filter(keyword: &str) -> Result<String, minijinja::Error> {
    FieldType::from_keyword(keyword)
        .map(|t| cpp_type(t).to_string())
        .ok_or_else(|| {
            minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                format!("unknown field type '{keyword}'"),
            )
        })
}

#[derive(Serialize)]
struct HeaderView<'a> {
    namespace: &'a str,
    header: String,
    enums: &'a [EnumModel],
    records: Vec<RecordView>,
}

#[derive(Serialize)]
struct RecordView {
    name: String,
    is_global: bool,
    fields: Vec<FieldView>,
    find: Option<FindView>,
}

#[derive(Serialize)]
struct FieldView {
    decl: String,
    doc: Option<String>,
}

#[derive(Serialize)]
struct FindView {
    /// Parameter list, each followed by `, `
    params: String,

    /// Body of the lower-bound comparator
    less: String,

    /// Extra `||` clauses rejecting a lower bound that does not match
    mismatch: String,
}

/// Generates `DB.h` and `DB.cpp`
#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

impl Backend for CppBackend {
    fn generate(
        &self,
        renderer: &Renderer,
        model: &CodegenModel,
        config: &Config,
    ) -> Result<Vec<GeneratedFile>, CodegenError> {
        check_names(model)?;

        let header = config.declarations_file();
        let view = HeaderView {
            namespace: &config.namespace,
            header: header.clone(),
            enums: &model.enums,
            records: model.records.iter().map(record_view).collect(),
        };

        Ok(vec![
            GeneratedFile::new(header, renderer.render("db.h", &view)?),
            GeneratedFile::new(config.definitions_file(), renderer.render("db.cpp", &view)?),
        ])
    }
}

/// Reject names that are C++ keywords or collide with the generated scaffolding
fn check_names(model: &CodegenModel) -> Result<(), CodegenError> {
    let reserved = |table: &str, name: &str| CodegenError::ReservedName {
        table: table.to_string(),
        name: name.to_string(),
    };

    for e in &model.enums {
        if KEYWORDS.contains(&e.name.as_str()) || RESERVED_TYPES.contains(&e.name.as_str()) {
            return Err(reserved(&e.table, &e.name));
        }
        if let Some(m) = e.members.iter().find(|m| KEYWORDS.contains(&m.name.as_str())) {
            return Err(reserved(&e.table, &m.name));
        }
    }

    for record in &model.records {
        let name = record.name.as_str();
        if KEYWORDS.contains(&name) || RESERVED_TYPES.contains(&name) {
            return Err(reserved(name, name));
        }

        let fields = record
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(record.find.iter().flatten().map(|p| p.name.as_str()));
        for field in fields {
            if KEYWORDS.contains(&field) || RESERVED_MEMBERS.contains(&field) {
                return Err(reserved(name, field));
            }
        }
    }

    Ok(())
}

fn record_view(record: &RecordModel) -> RecordView {
    let fields = record
        .fields
        .iter()
        .map(|f| FieldView {
            decl: field_decl(&f.name, &f.kind),
            doc: f.doc.as_ref().map(|d| d.trim().to_string()),
        })
        .collect();

    RecordView {
        name: record.name.clone(),
        is_global: record.is_global,
        fields,
        find: record.find.as_deref().map(find_view),
    }
}

fn field_decl(name: &str, kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar { field_type } => {
            let init = match field_type {
                FieldType::String => "",
                FieldType::Bool => " = false",
                _ => " = 0",
            };
            format!("{} {name}{init}", cpp_type(*field_type))
        }
        FieldKind::Enum { name: ty, default_member } => {
            format!("{ty} {name} = {ty}::{default_member}")
        }
        FieldKind::Id { table } => format!("{table}::ID {name}"),
    }
}

fn param_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar { field_type: FieldType::String } => "std::string_view".to_string(),
        FieldKind::Scalar { field_type } => cpp_type(*field_type).to_string(),
        FieldKind::Enum { name, .. } => name.clone(),
        FieldKind::Id { table } => format!("{table}::ID"),
    }
}

fn find_view(params: &[FindParam]) -> FindView {
    let list: String = params
        .iter()
        .map(|p| format!("{} {}, ", param_type(&p.kind), p.name))
        .collect();

    let less = params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let equal: String = params[..i]
                .iter()
                .map(|q| format!("left.{} == {} && ", q.member, q.name))
                .collect();
            format!("({equal}left.{} < {})", p.member, p.name)
        })
        .collect::<Vec<_>>()
        .join(" ||\n           ");

    let mismatch = params
        .iter()
        .map(|p| format!(" ||\n      _searchLowerBound->{} != {}", p.member, p.name))
        .collect();

    FindView {
        params: list,
        less,
        mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{model_of, weapons_model};
    use pretty_assertions::assert_eq;

    fn generate(model: &CodegenModel) -> (String, String) {
        let renderer = Renderer::new().unwrap();
        let files = CppBackend.generate(&renderer, model, &Config::default()).unwrap();
        assert_eq!(files[0].name, "DB.h");
        assert_eq!(files[1].name, "DB.cpp");
        (files[0].contents.clone(), files[1].contents.clone())
    }

    #[test]
    fn header_declares_enums() {
        let (header, _) = generate(&weapons_model());

        assert!(header.starts_with("// Generated Database file - do not edit manually\n#pragma once\n"));
        assert!(header.contains("namespace DB\n{\n"));
        assert!(header.contains(
            "enum class WeaponTypes : uint8_t\n{\n  None = 0, // A none type of weapon\n  Gun = 1, // A gun type of weapon\n};\n"
        ));
        assert!(header.contains("constexpr uint32_t WeaponTypes_MAX = 2; // For using the enum in lookup arrays\n"));
        assert!(header.contains("const char* to_string(WeaponTypes value);\n"));
        assert!(header.contains("bool find_enum(std::string_view name, WeaponTypes& out);\n"));
        assert!(header.ends_with("} // namespace DB\n"));
    }

    #[test]
    fn header_declares_records_and_container() {
        let (header, _) = generate(&weapons_model());

        assert!(header.contains(
            "\nclass Weapons\n{\npublic:\n  using ID = IDType<Weapons>;\n  using Iter = const IterType<Weapons>::Data;\n\n  std::string Name;\n  WeaponTypes Type = WeaponTypes::None;\n};\n"
        ));
        assert!(header.contains("  // display name\n  std::string Name;\n  Weapons::ID LeftWeapon;\n  Weapons::ID RightWeapon;\n};\n"));
        assert!(!header.contains("Notes"));

        assert!(header.contains("  bool Find(std::string_view name, Weapons::ID& _ret) const;\n"));
        assert!(!header.contains("GlobalNones::ID& _ret"));
        assert!(header.contains("  std::vector<Weapons> WeaponsValues;\n"));
        assert!(header.contains("  GlobalNones GlobalNonesValues;\n"));
        assert!(header.contains(
            "template<> inline const std::vector<Weapons>& DB::GetTable() const { return WeaponsValues; }\n"
        ));
        assert!(!header.contains("std::vector<GlobalNones>& DB::GetTable"));
    }

    #[test]
    fn records_come_in_dependency_order() {
        let (header, _) = generate(&weapons_model());
        let special = header.find("class SpecialWeapons").unwrap();
        let weapons = header.find("class Weapons").unwrap();
        let characters = header.find("class Characters").unwrap();
        assert!(special < weapons && weapons < characters);
    }

    #[test]
    fn source_defines_enum_lookups() {
        let (_, source) = generate(&weapons_model());

        assert!(source.contains("#include \"DB.h\"\n"));
        assert!(source.contains("  case(WeaponTypes::Gun): return \"Gun\";\n"));
        assert!(source.contains("    \"Gun\",\n    \"None\",\n"));
        assert!(source.contains("    out = WeaponTypes::None;\n    return false;\n"));
    }

    #[test]
    fn composite_find_compares_lexicographically() {
        let model = model_of(&[("Cells", "X key int8,Y key int8,Name\n1,2,a\n")]);
        let (header, source) = generate(&model);

        assert!(header.contains("  bool Find(int8_t x, int8_t y, Cells::ID& _ret) const;\n"));
        assert!(source.contains("bool DB::DB::Find(int8_t x, int8_t y, Cells::ID& _ret) const\n"));
        assert!(source.contains(
            "    return (left.X < x) ||\n           (left.X == x && left.Y < y);\n"
        ));
        assert!(source.contains(
            "  if (_searchLowerBound == CellsValues.end() ||\n      _searchLowerBound->X != x ||\n      _searchLowerBound->Y != y)\n"
        ));
        assert!(source.contains("  _ret = Cells::ID((uint32_t)std::distance(CellsValues.begin(), _searchLowerBound));\n"));
    }

    #[test]
    fn namespace_and_file_names_follow_config() {
        let config = Config::from_toml(
            "namespace = \"Game\"\n[output]\ndeclarations = \"GameDb.h\"\n",
        )
        .unwrap();
        let renderer = Renderer::new().unwrap();
        let files = CppBackend.generate(&renderer, &weapons_model(), &config).unwrap();

        assert_eq!(files[0].name, "GameDb.h");
        assert!(files[0].contents.contains("namespace Game\n{\n"));
        assert!(files[1].contents.contains("#include \"GameDb.h\"\n"));
        assert!(files[1].contents.contains("const char* Game::to_string(WeaponTypes value)\n"));
    }

    #[test]
    fn keyword_names_are_rejected() {
        let renderer = Renderer::new().unwrap();
        let reject = |files: &[(&str, &str)]| {
            let err = CppBackend
                .generate(&renderer, &model_of(files), &Config::default())
                .unwrap_err();
            match err {
                CodegenError::ReservedName { name, .. } => name,
                other => panic!("unexpected error: {other}"),
            }
        };

        assert_eq!(reject(&[("Spells", "Class key\nmage\n")]), "class");
        assert_eq!(reject(&[("Spells", "Name key,delete bool\nfire,0\n")]), "delete");
        assert_eq!(reject(&[("Spells", "Name key,ID int32\nfire,1\n")]), "ID");
        assert_eq!(reject(&[("DB", "Name key\nx\n")]), "DB");
        assert_eq!(
            reject(&[("EnumMode", "Name key,Value uint8,Comment\nauto,0,\n")]),
            "auto"
        );

        let fine = model_of(&[("Spells", "Name key,Classes int32\nfire,1\n")]);
        assert!(CppBackend.generate(&renderer, &fine, &Config::default()).is_ok());
    }

    #[test]
    fn scalar_declarations() {
        assert_eq!(
            field_decl("Hp", &FieldKind::Scalar { field_type: FieldType::Int32 }),
            "int32_t Hp = 0"
        );
        assert_eq!(
            field_decl("On", &FieldKind::Scalar { field_type: FieldType::Bool }),
            "bool On = false"
        );
        assert_eq!(
            field_decl("Name", &FieldKind::Scalar { field_type: FieldType::String }),
            "std::string Name"
        );
        assert!(cpp_type_filter("cobol").is_err());
    }
}
