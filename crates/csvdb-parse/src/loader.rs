//! Schema loader
//!
//! Turns the text of one CSV file into a [`Table`]: header cells become
//! column specs, rows are checked for shape, and cells of non-link columns
//! are parsed into their declared types. Link columns stay strings until the
//! type resolver has seen every table.

use crate::header::parse_header;
use crate::tokenizer::CsvReader;
use csvdb_core::naming::{is_column_name, is_table_name};
use csvdb_core::{Error, Field, FieldType, Result, Row, Table, TableKind, TextLayout};
use std::collections::HashSet;
use std::path::Path;

/// Load a table from CSV text
pub fn load_table(name: &str, text: &str) -> Result<Table> {
    if !is_table_name(name) {
        return Err(Error::InvalidName {
            table: name.to_string(),
            name: name.to_string(),
            what: "table",
        });
    }

    let mut reader = CsvReader::new(text);
    let header = reader.next().ok_or_else(|| Error::MalformedHeader {
        table: name.to_string(),
        header: String::new(),
        reason: "file has no header row".to_string(),
    })?;

    let mut columns = Vec::with_capacity(header.fields.len());
    let mut seen = HashSet::new();
    for cell in &header.fields {
        let column = parse_header(name, cell)?;

        if !is_column_name(&column.name) {
            return Err(Error::InvalidName {
                table: name.to_string(),
                name: column.name,
                what: "column",
            });
        }
        if !seen.insert(column.name.clone()) {
            return Err(Error::DuplicateColumn {
                table: name.to_string(),
                column: column.name,
            });
        }

        columns.push(column);
    }

    let mut table = Table::new(name, columns).with_layout(TextLayout::detect(text));

    for record in reader {
        if record.fields.len() != table.columns.len() {
            return Err(Error::RaggedRow {
                table: table.name.clone(),
                line: record.line,
                expected: table.columns.len(),
                found: record.fields.len(),
            });
        }

        let mut fields = Vec::with_capacity(record.fields.len());
        for (column, raw) in table.columns.iter().zip(record.fields) {
            if column.link.is_some() {
                fields.push(Field::String(raw));
                continue;
            }

            let value = column.field_type.parse(&raw).ok_or_else(|| Error::InvalidValue {
                table: table.name.clone(),
                column: column.name.clone(),
                line: Some(record.line),
                value: raw.clone(),
                expected: column.field_type,
            })?;
            fields.push(value);
        }

        table.rows.push(Row::new(record.line, fields));
    }

    check_shape(&table)?;

    tracing::debug!(
        table = %table.name,
        columns = table.columns.len(),
        rows = table.rows.len(),
        "loaded table"
    );

    Ok(table)
}

/// Read and load a table file; the table name is the file stem
pub fn load_file(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    Ok(load_table(name, &text)?.with_source(path))
}

/// Check the strict layouts of Enum and Global tables
pub fn check_shape(table: &Table) -> Result<()> {
    match table.kind {
        TableKind::Enum => check_enum_shape(table),
        TableKind::Global if table.rows.len() != 1 => Err(Error::GlobalShape {
            table: table.name.clone(),
            rows: table.rows.len(),
        }),
        TableKind::Global | TableKind::Regular => Ok(()),
    }
}

fn check_enum_shape(table: &Table) -> Result<()> {
    let shape = |reason: &str| Error::EnumShape {
        table: table.name.clone(),
        reason: reason.to_string(),
    };

    // the generated enum type drops the prefix
    let type_name = table.name.strip_prefix("Enum").unwrap_or_default();
    if !is_table_name(type_name) {
        return Err(shape("name after the 'Enum' prefix must be an identifier"));
    }

    let [name, value, comment] = table.columns.as_slice() else {
        return Err(shape("needs exactly three columns: Name, Value and a comment"));
    };

    if name.name != "Name" || !name.is_key || name.field_type != FieldType::String {
        return Err(shape("first column must be the string key 'Name'"));
    }
    if value.name != "Value" || value.is_key || !value.field_type.is_integer() {
        return Err(shape("second column must be an integer non-key 'Value'"));
    }
    if comment.is_key {
        return Err(shape("third column must not be a key"));
    }
    if table.columns.iter().any(|c| c.link.is_some()) {
        return Err(shape("foreign table links are not allowed"));
    }
    if table.rows.is_empty() {
        return Err(shape("needs at least one member"));
    }
    if let Some(row) = table.rows.iter().find(|r| !is_table_name(&r.fields[0].to_string())) {
        return Err(Error::InvalidName {
            table: table.name.clone(),
            name: row.fields[0].to_string(),
            what: "enum member",
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvdb_core::Newline;
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_typed_rows() {
        let table = load_table("Weapons", "Name key,Damage uint8,Type +EnumWeaponTypes\nGun,10,Gun\n").unwrap();

        assert_eq!(table.key_columns, vec![0]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[0].fields[1], Field::UInt8(10));
        // link columns stay raw until resolution
        assert_eq!(table.rows[0].fields[2], Field::String("Gun".into()));
    }

    #[test]
    fn keys_follow_column_order() {
        let table = load_table("Pairs", "B,A key,C key\n").unwrap();
        assert_eq!(table.key_columns, vec![1, 2]);
    }

    #[test]
    fn records_layout() {
        let table = load_table("T", "Name\r\nx").unwrap();
        assert_eq!(table.layout.newline, Newline::CrLf);
        assert!(!table.layout.trailing_newline);
    }

    #[test]
    fn ragged_row_is_an_error() {
        let err = load_table("T", "A,B\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, Error::RaggedRow { line: 3, expected: 2, found: 1, .. }));
    }

    #[test]
    fn duplicate_column_is_an_error() {
        let err = load_table("T", "A,B,A int32\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { .. }));
    }

    #[test]
    fn bad_value_reports_line_and_column() {
        let err = load_table("T", "Hp uint8\n300\n").unwrap_err();
        match err {
            Error::InvalidValue { column, line, value, expected, .. } => {
                assert_eq!(column, "Hp");
                assert_eq!(line, Some(2));
                assert_eq!(value, "300");
                assert_eq!(expected, FieldType::UInt8);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(matches!(
            load_table("My Table", "A\n").unwrap_err(),
            Error::InvalidName { what: "table", .. }
        ));
        assert!(matches!(
            load_table("T", "Max-Hp\n").unwrap_err(),
            Error::InvalidName { what: "column", .. }
        ));
    }

    #[test]
    fn empty_file_has_no_header() {
        assert!(matches!(load_table("T", "").unwrap_err(), Error::MalformedHeader { .. }));
    }

    #[test]
    fn global_table_with_two_rows_fails() {
        let err = load_table("GlobalNones", "Weapon +Weapons\nGun\nKnife\n").unwrap_err();
        assert!(matches!(err, Error::GlobalShape { rows: 2, .. }));
    }

    #[test]
    fn enum_shape_is_enforced() {
        let ok = "Name key,Value uint8,Comment\nNone,0,\nGun,1,a gun\n";
        assert!(load_table("EnumWeaponTypes", ok).is_ok());

        let four_columns = "Name key,Value uint8,Comment,Extra\nNone,0,,\n";
        assert!(matches!(
            load_table("EnumWeaponTypes", four_columns).unwrap_err(),
            Error::EnumShape { .. }
        ));

        let string_value = "Name key,Value,Comment\nNone,0,\n";
        assert!(load_table("EnumWeaponTypes", string_value).is_err());

        let linked = "Name key,Value uint8,Comment +Other\nNone,0,\n";
        assert!(load_table("EnumWeaponTypes", linked).is_err());

        let empty = "Name key,Value uint8,Comment\n";
        assert!(load_table("EnumWeaponTypes", empty).is_err());

        let float_value = "Name key,Value float32,Comment\nNone,0,\n";
        assert!(load_table("EnumWeaponTypes", float_value).is_err());

        assert!(load_table("Enum", ok).is_err());
        assert!(load_table("Enum2D", ok).is_err());
    }

    #[test]
    fn enum_members_must_be_identifiers() {
        let text = "Name key,Value uint8,Comment\nBig Gun,0,\n";
        assert!(matches!(
            load_table("EnumWeaponTypes", text).unwrap_err(),
            Error::InvalidName { what: "enum member", .. }
        ));
    }
}
