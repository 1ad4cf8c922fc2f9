//! Backend-neutral description of the generated code
//!
//! Built once from a validated database and its emission order. Backends only
//! decide spelling: every naming and collapsing decision is made here.

use crate::CodegenError;
use csvdb_core::{Database, Error, FieldType, Resolution, Result, Table, TableKind};
use csvdb_engine::pair_columns;
use serde::Serialize;
use std::collections::HashMap;

/// Everything a backend needs to emit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenModel {
    /// Enum types, by table name
    pub enums: Vec<EnumModel>,

    /// Record types, in emission order
    pub records: Vec<RecordModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumModel {
    /// Source table, e.g. `EnumWeaponTypes`
    pub table: String,

    /// Type name, e.g. `WeaponTypes`
    pub name: String,

    /// Type of the `Value` column
    pub repr: FieldType,

    /// Members in ascending value order
    pub members: Vec<EnumMember>,

    /// First member in file order
    pub default_member: String,

    /// Member names in ascending byte order, for lookups by name
    pub sorted_names: Vec<String>,

    /// Member count when the values are exactly `0..count`
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,

    /// Literal value text
    pub value: String,

    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordModel {
    pub name: String,

    /// Stored as a single value rather than a collection
    pub is_global: bool,

    pub fields: Vec<FieldModel>,

    /// Lookup parameters in key order; absent for keyless and Global tables
    pub find: Option<Vec<FindParam>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldModel {
    pub name: String,
    pub kind: FieldKind,

    /// Header comment
    pub doc: Option<String>,
}

/// Type of a generated field or lookup parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    Scalar { field_type: FieldType },

    /// Member of a generated enum
    Enum { name: String, default_member: String },

    /// Row id of another table
    Id { table: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindParam {
    /// Parameter name
    pub name: String,

    /// Record field compared against the parameter
    pub member: String,

    pub kind: FieldKind,
}

impl CodegenModel {
    /// Build the model for a validated database
    pub fn build(db: &Database, order: &[String]) -> Result<Self, CodegenError> {
        let enums = db
            .tables()
            .filter(|t| t.is_enum())
            .map(|t| build_enum(db, t))
            .collect::<Result<Vec<_>>>()?;

        let records = order
            .iter()
            .filter_map(|name| db.get(name))
            .map(|t| build_record(db, t))
            .collect::<Result<Vec<_>, CodegenError>>()?;

        Ok(Self { enums, records })
    }

    /// Every enum and record must map to its own type name
    pub fn check_type_names(&self) -> Result<(), CodegenError> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let types = self
            .enums
            .iter()
            .map(|e| (e.name.as_str(), e.table.as_str()))
            .chain(self.records.iter().map(|r| (r.name.as_str(), r.name.as_str())));

        for (name, table) in types {
            if let Some(first) = seen.insert(name, table) {
                return Err(CodegenError::NameClash {
                    table: format!("{first}, {table}"),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Generated type name of an enum table
pub fn enum_type_name(table: &str) -> &str {
    table.strip_prefix("Enum").unwrap_or(table)
}

/// Collapse a comment onto one line; `None` when blank
fn one_line(text: &str) -> Option<String> {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!line.is_empty()).then_some(line)
}

/// Lowercase the first letter, for parameter names
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn build_enum(db: &Database, table: &Table) -> Result<EnumModel> {
    let index = db.enum_index(&table.name).ok_or_else(|| Error::EnumShape {
        table: table.name.clone(),
        reason: "enum table was not indexed".to_string(),
    })?;

    let members = index
        .by_value()
        .iter()
        .map(|(value, name)| {
            let comment = table
                .rows
                .iter()
                .find(|row| row.fields[0].as_str() == Some(name.as_str()))
                .and_then(|row| one_line(&row.fields[2].to_string()));

            EnumMember {
                name: name.clone(),
                value: value.to_string(),
                comment,
            }
        })
        .collect();

    Ok(EnumModel {
        table: table.name.clone(),
        name: enum_type_name(&table.name).to_string(),
        repr: index.value_type,
        members,
        default_member: index.default_member().to_string(),
        sorted_names: index.sorted_names().map(str::to_string).collect(),
        count: index.sequential_count(),
    })
}

/// Kind of a column as seen by generated code, and the name it goes by.
///
/// Links into regular tables become ids named by the `Base` part of a
/// `Base:RemoteKey` column, so all columns of one composite link share a
/// single field.
fn column_kind(db: &Database, table: &Table, index: usize) -> Result<(String, FieldKind)> {
    let column = &table.columns[index];

    let Some(link) = column.link.as_ref() else {
        return Ok((
            column.name.clone(),
            FieldKind::Scalar {
                field_type: column.field_type,
            },
        ));
    };

    if TableKind::from_name(&link.table) == TableKind::Enum {
        let Resolution::Enum { table: enum_table } = &column.resolution else {
            return Err(Error::UnknownEnumMember {
                table: table.name.clone(),
                column: column.name.clone(),
                enum_table: link.table.clone(),
                line: None,
                value: String::new(),
            });
        };
        let default_member = db
            .enum_index(enum_table)
            .map(|index| index.default_member().to_string())
            .unwrap_or_default();

        return Ok((
            column.name.clone(),
            FieldKind::Enum {
                name: enum_type_name(enum_table).to_string(),
                default_member,
            },
        ));
    }

    Ok((
        column.base_name().to_string(),
        FieldKind::Id {
            table: link.table.clone(),
        },
    ))
}

fn build_record(db: &Database, table: &Table) -> Result<RecordModel, CodegenError> {
    let mut fields: Vec<FieldModel> = Vec::with_capacity(table.columns.len());

    for (index, column) in table.columns.iter().enumerate() {
        if column.is_ignored {
            continue;
        }

        let (name, kind) = column_kind(db, table, index)?;
        if matches!(kind, FieldKind::Id { .. }) && fields.iter().any(|f| f.name == name && f.kind == kind) {
            continue;
        }

        fields.push(FieldModel {
            name,
            kind,
            doc: column.comment.as_deref().and_then(one_line),
        });
    }

    let find = if table.has_key() && !table.is_global() {
        Some(find_params(db, table)?)
    } else {
        None
    };

    Ok(RecordModel {
        name: table.name.clone(),
        is_global: table.is_global(),
        fields,
        find,
    })
}

/// Lookup parameters in key order.
///
/// A composite link is searched as one id, which orders rows by the linked
/// table's key. Its key columns must therefore sit next to each other in that
/// same order, or the lookup would disagree with the row order.
fn find_params(db: &Database, table: &Table) -> Result<Vec<FindParam>, CodegenError> {
    let keys = &table.key_columns;
    let mut params = Vec::with_capacity(keys.len());

    let mut pos = 0;
    while pos < keys.len() {
        let (member, kind) = column_kind(db, table, keys[pos])?;

        let width = match &kind {
            FieldKind::Id { table: linked } => {
                let foreign = db.get(linked).ok_or_else(|| Error::MissingForeignTable {
                    table: table.name.clone(),
                    column: table.columns[keys[pos]].name.clone(),
                    foreign: linked.clone(),
                })?;
                let pairing = pair_columns(table, keys[pos], foreign)?;
                if keys.get(pos..pos + pairing.len()) != Some(pairing.as_slice()) {
                    return Err(CodegenError::KeyLayout {
                        table: table.name.clone(),
                        link: member,
                        foreign: linked.clone(),
                    });
                }
                pairing.len()
            }
            _ => 1,
        };

        params.push(FindParam {
            name: lower_first(&member),
            member,
            kind,
        });
        pos += width;
    }

    Ok(params)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use csvdb_engine::{resolve, sort_tables, validate, DependencyGraph};
    use csvdb_parse::load_table;
    use pretty_assertions::assert_eq;

    /// Compile in-memory tables into a model
    pub(crate) fn model_of(files: &[(&str, &str)]) -> CodegenModel {
        let mut db = Database::new();
        for (name, text) in files {
            db.insert(load_table(name, text).unwrap()).unwrap();
        }
        resolve(&mut db).unwrap();
        sort_tables(&mut db).unwrap();
        validate(&db).unwrap();
        let order = DependencyGraph::from_database(&db).emission_order().unwrap();
        CodegenModel::build(&db, &order).unwrap()
    }

    pub(crate) fn weapons_model() -> CodegenModel {
        model_of(&[
            ("EnumWeaponTypes", "Name key,Value uint8,Comment\nNone,0,A none type of weapon\nGun,1,A gun type of weapon\n"),
            ("SpecialWeapons", "Name key,Type +EnumWeaponTypes,Default *SpecialWeapons\nLaser,Gun,Laser\n"),
            ("Weapons", "Name key,Type +EnumWeaponTypes\nPistol,Gun\n"),
            ("Characters", "Name key // display name,LeftWeapon +Weapons,RightWeapon +Weapons,Notes ignore\nAda,Pistol,Pistol,x\n"),
            ("GlobalNones", "Weapon +Weapons\nPistol\n"),
        ])
    }

    #[test]
    fn enum_model() {
        let model = weapons_model();
        assert_eq!(model.enums.len(), 1);

        let e = &model.enums[0];
        assert_eq!(e.name, "WeaponTypes");
        assert_eq!(e.repr, FieldType::UInt8);
        assert_eq!(e.default_member, "None");
        assert_eq!(e.sorted_names, vec!["Gun", "None"]);
        assert_eq!(e.count, Some(2));
        assert_eq!(
            e.members[1],
            EnumMember {
                name: "Gun".into(),
                value: "1".into(),
                comment: Some("A gun type of weapon".into()),
            }
        );
    }

    #[test]
    fn members_follow_value_order_and_default_follows_file_order() {
        let model = model_of(&[("EnumTier", "Name key,Value int16,Comment\nHigh,5,\nLow,-1,\n")]);
        let e = &model.enums[0];

        let names: Vec<&str> = e.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Low", "High"]);
        assert_eq!(e.default_member, "High");
        assert_eq!(e.count, None);
        assert_eq!(e.members[0].comment, None);
    }

    #[test]
    fn records_follow_emission_order() {
        let model = weapons_model();
        let names: Vec<&str> = model.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["SpecialWeapons", "Weapons", "Characters", "GlobalNones"]);
    }

    #[test]
    fn field_kinds() {
        let model = weapons_model();
        let special = &model.records[0];

        assert_eq!(
            special.fields[1].kind,
            FieldKind::Enum { name: "WeaponTypes".into(), default_member: "None".into() }
        );
        assert_eq!(special.fields[2].kind, FieldKind::Id { table: "SpecialWeapons".into() });

        let characters = &model.records[2];
        assert_eq!(characters.fields.len(), 3);
        assert_eq!(characters.fields[0].doc.as_deref(), Some("display name"));
    }

    #[test]
    fn composite_links_collapse_into_one_field() {
        let model = model_of(&[
            ("Cells", "X key int8,Y key int8\n1,2\n"),
            ("Units", "Name key,At:X key +Cells,At:Y key +Cells\nu,1,2\n"),
        ]);
        let units = model.records.iter().find(|r| r.name == "Units").unwrap();

        let names: Vec<&str> = units.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "At"]);

        let find = units.find.as_ref().unwrap();
        assert_eq!(find.len(), 2);
        assert_eq!(find[1].name, "at");
        assert_eq!(find[1].kind, FieldKind::Id { table: "Cells".into() });
    }

    fn build_err(files: &[(&str, &str)]) -> CodegenError {
        let mut db = Database::new();
        for (name, text) in files {
            db.insert(load_table(name, text).unwrap()).unwrap();
        }
        resolve(&mut db).unwrap();
        sort_tables(&mut db).unwrap();
        validate(&db).unwrap();
        let order = DependencyGraph::from_database(&db).emission_order().unwrap();
        CodegenModel::build(&db, &order).unwrap_err()
    }

    #[test]
    fn split_composite_key_cannot_be_searched() {
        let err = build_err(&[
            ("Cells", "X key int8,Y key int8\n1,2\n2,1\n"),
            ("Units", "At:X key +Cells,Name key,At:Y key +Cells\n1,u,2\n2,u,1\n"),
        ]);
        assert!(matches!(err, CodegenError::KeyLayout { ref link, .. } if link == "At"));
    }

    #[test]
    fn composite_key_in_reverse_order_cannot_be_searched() {
        let err = build_err(&[
            ("Cells", "X key int8,Y key int8\n1,2\n2,1\n"),
            ("Units", "Name key,At:Y key +Cells,At:X key +Cells\nu,2,1\n"),
        ]);
        assert!(matches!(err, CodegenError::KeyLayout { .. }));
    }

    #[test]
    fn composite_link_outside_the_key_is_fine() {
        let model = model_of(&[
            ("Cells", "X key int8,Y key int8\n1,2\n"),
            ("Units", "Name key,At:Y +Cells,At:X +Cells\nu,2,1\n"),
        ]);
        let units = model.records.iter().find(|r| r.name == "Units").unwrap();
        assert_eq!(units.find.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn find_is_skipped_for_global_and_keyless_tables() {
        let model = model_of(&[("Log", "Text\nx\n"), ("GlobalConfig", "Speed int32\n3\n")]);
        assert!(model.records.iter().all(|r| r.find.is_none()));
        assert!(model.records.iter().any(|r| r.is_global));
    }

    #[test]
    fn enum_and_record_type_names_must_differ() {
        let model = model_of(&[
            ("EnumTier", "Name key,Value uint8,Comment\nLow,0,\n"),
            ("Tier", "Name key\na\n"),
        ]);
        assert!(matches!(model.check_type_names(), Err(CodegenError::NameClash { .. })));
        assert!(weapons_model().check_type_names().is_ok());
    }

    #[test]
    fn comments_are_single_line() {
        assert_eq!(one_line("  two\nlines "), Some("two lines".to_string()));
        assert_eq!(one_line("   "), None);
    }

    #[test]
    fn parameter_names() {
        assert_eq!(lower_first("LeftWeapon"), "leftWeapon");
        assert_eq!(lower_first(""), "");
        assert_eq!(enum_type_name("EnumWeaponTypes"), "WeaponTypes");
    }
}
