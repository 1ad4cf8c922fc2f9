//! Type resolution for link columns
//!
//! A link column has no useful type of its own: it takes the type of whatever
//! its link chain ends at. A chain ends either at an enum table, in which case
//! cells hold member values, or at a concrete key column of a regular table.
//!
//! Resolution runs in two phases. The plan is computed against the database
//! as loaded, then applied to the referencing tables.

use csvdb_core::{
    ColumnSpec, Database, Diagnostic, DiagnosticCode, EnumMatch, Error, Field, FieldType, Location,
    Resolution, Result, Severity, Table,
};
use std::collections::HashSet;

/// Where a link chain ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// An enum table
    Enum { table: String },

    /// A concrete column of a regular table
    Column {
        table: String,
        column: String,
        field_type: FieldType,
    },
}

impl Terminal {
    fn resolution(&self) -> Resolution {
        match self {
            Self::Enum { table } => Resolution::Enum {
                table: table.clone(),
            },
            Self::Column { table, column, .. } => Resolution::Table {
                table: table.clone(),
                column: column.clone(),
            },
        }
    }
}

/// Resolved values for one link column
#[derive(Debug)]
struct ColumnPlan {
    table: String,
    column: usize,
    field_type: FieldType,
    resolution: Resolution,
    values: Vec<Field>,
}

/// Resolve every link column of the database in place.
///
/// Returns warnings for enum members matched only case-insensitively.
pub fn resolve(db: &mut Database) -> Result<Vec<Diagnostic>> {
    let mut warnings = Vec::new();
    let mut plans = Vec::new();

    for table in db.tables() {
        for (index, column) in table.columns.iter().enumerate() {
            if column.link.is_none() {
                continue;
            }

            let terminal = follow_chain(db, table, index)?;
            plans.push(plan_column(db, table, index, terminal, &mut warnings)?);
        }
    }

    let resolved = plans.len();
    for plan in plans {
        let Some(table) = db.get_mut(&plan.table) else {
            continue;
        };

        let column = &mut table.columns[plan.column];
        column.field_type = plan.field_type;
        column.resolution = plan.resolution;

        for (row, value) in table.rows.iter_mut().zip(plan.values) {
            row.fields[plan.column] = value;
        }
    }

    tracing::debug!(columns = resolved, "resolved link columns");
    Ok(warnings)
}

/// Walk the link chain starting at column `index` of `table`
pub fn follow_chain(db: &Database, table: &Table, index: usize) -> Result<Terminal> {
    let origin = &table.columns[index];
    let mut visited: HashSet<(String, String)> = HashSet::new();
    let mut path: Vec<String> = Vec::new();

    let Some(mut link) = origin.link.as_ref() else {
        return Ok(Terminal::Column {
            table: table.name.clone(),
            column: origin.name.clone(),
            field_type: origin.field_type,
        });
    };
    let mut current_table = table;
    let mut current = origin;

    loop {
        let step = format!("{}.{}", current_table.name, current.name);
        if !visited.insert((current_table.name.clone(), current.name.clone())) {
            path.push(step);
            return Err(Error::LinkCycle {
                table: table.name.clone(),
                column: origin.name.clone(),
                path: path.join(" -> "),
            });
        }
        path.push(step);

        let foreign = db.get(&link.table).ok_or_else(|| Error::MissingForeignTable {
            table: current_table.name.clone(),
            column: current.name.clone(),
            foreign: link.table.clone(),
        })?;

        if foreign.is_enum() {
            return Ok(Terminal::Enum {
                table: foreign.name.clone(),
            });
        }

        let target = target_key(current_table, current, foreign)?;
        let target_column = &foreign.columns[target];

        if let Some(next) = target_column.link.as_ref() {
            current_table = foreign;
            current = target_column;
            link = next;
            continue;
        }

        return Ok(Terminal::Column {
            table: foreign.name.clone(),
            column: target_column.name.clone(),
            field_type: target_column.field_type,
        });
    }
}

/// Key column of `foreign` that `column` of `table` points at
pub fn target_key(table: &Table, column: &ColumnSpec, foreign: &Table) -> Result<usize> {
    if !foreign.has_key() {
        return Err(Error::ForeignTableWithoutKey {
            table: table.name.clone(),
            column: column.name.clone(),
            foreign: foreign.name.clone(),
        });
    }

    let mismatch = |reason: String| Error::CompositeKeyMismatch {
        table: table.name.clone(),
        column: column.name.clone(),
        foreign: foreign.name.clone(),
        reason,
    };

    match column.remote_key() {
        None if foreign.key_columns.len() == 1 => Ok(foreign.key_columns[0]),
        None => Err(mismatch(format!(
            "'{}' has {} key columns; name this column 'Base:KeyName'",
            foreign.name,
            foreign.key_columns.len()
        ))),
        Some(remote) => foreign
            .key_columns
            .iter()
            .copied()
            .find(|&k| foreign.columns[k].name == remote)
            .ok_or_else(|| mismatch(format!("'{}' is not a key column", remote))),
    }
}

fn plan_column(
    db: &Database,
    table: &Table,
    index: usize,
    terminal: Terminal,
    warnings: &mut Vec<Diagnostic>,
) -> Result<ColumnPlan> {
    let column = &table.columns[index];
    let mut values = Vec::with_capacity(table.rows.len());

    let field_type = match &terminal {
        Terminal::Enum { table: enum_table } => {
            let members = db.enum_index(enum_table).ok_or_else(|| Error::MissingForeignTable {
                table: table.name.clone(),
                column: column.name.clone(),
                foreign: enum_table.clone(),
            })?;

            for row in &table.rows {
                let raw = raw_cell(&row.fields[index]);
                match members.lookup(&raw) {
                    Some(EnumMatch::Exact(value)) => values.push(value.clone()),
                    Some(EnumMatch::Folded { value, name }) => {
                        warnings.push(folded_warning(table, &column.name, row.line, &raw, name));
                        values.push(value.clone());
                    }
                    None => {
                        return Err(Error::UnknownEnumMember {
                            table: table.name.clone(),
                            column: column.name.clone(),
                            enum_table: enum_table.clone(),
                            line: Some(row.line),
                            value: raw,
                        })
                    }
                }
            }

            members.value_type
        }
        Terminal::Column { field_type, .. } => {
            for row in &table.rows {
                let raw = raw_cell(&row.fields[index]);
                let value = field_type.parse(&raw).ok_or_else(|| Error::InvalidValue {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    line: Some(row.line),
                    value: raw.clone(),
                    expected: *field_type,
                })?;
                values.push(value);
            }

            *field_type
        }
    };

    tracing::debug!(
        table = %table.name,
        column = %column.name,
        resolved = %field_type,
        "resolved link column"
    );

    Ok(ColumnPlan {
        table: table.name.clone(),
        column: index,
        field_type,
        resolution: terminal.resolution(),
        values,
    })
}

fn raw_cell(field: &Field) -> String {
    match field.as_str() {
        Some(raw) => raw.to_string(),
        None => field.to_string(),
    }
}

fn folded_warning(table: &Table, column: &str, line: usize, raw: &str, declared: &str) -> Diagnostic {
    let message = format!(
        "table '{}' column '{}' line {}: '{}' matched enum member '{}' ignoring case",
        table.name, column, line, raw, declared
    );

    let mut diag = Diagnostic::new(DiagnosticCode::Warning, Severity::Warn, message)
        .with_comparison(declared, raw);
    if let Some(source) = &table.source {
        diag = diag.with_location(Location::with_line(source.display().to_string(), line));
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::database;
    use pretty_assertions::assert_eq;

    const ENUM: (&str, &str) = ("EnumWeaponTypes", "Name key,Value uint8,Comment\nNone,0,\nGun,1,\nKnife,2,\n");

    #[test]
    fn enum_link_substitutes_values() {
        let mut db = database(&[ENUM, ("Weapons", "Name key,Type +EnumWeaponTypes\nPistol,Gun\nStab,Knife\n")]);
        let warnings = resolve(&mut db).unwrap();
        assert!(warnings.is_empty());

        let weapons = db.get("Weapons").unwrap();
        assert_eq!(weapons.columns[1].field_type, FieldType::UInt8);
        assert_eq!(
            weapons.columns[1].resolution,
            Resolution::Enum { table: "EnumWeaponTypes".into() }
        );
        assert_eq!(weapons.rows[0].fields[1], Field::UInt8(1));
        assert_eq!(weapons.rows[1].fields[1], Field::UInt8(2));
    }

    #[test]
    fn unknown_enum_member_fails() {
        let mut db = database(&[ENUM, ("Weapons", "Name key,Type +EnumWeaponTypes\nBow,Arrow\n")]);
        let err = resolve(&mut db).unwrap_err();
        assert!(matches!(err, Error::UnknownEnumMember { line: Some(2), .. }));
    }

    #[test]
    fn case_folded_member_warns() {
        let mut db = database(&[ENUM, ("Weapons", "Name key,Type +EnumWeaponTypes\nPistol,gun\n")]);
        let warnings = resolve(&mut db).unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warn);
        assert_eq!(db.get("Weapons").unwrap().rows[0].fields[1], Field::UInt8(1));
    }

    #[test]
    fn table_link_adopts_key_type() {
        let mut db = database(&[
            ("Items", "Id key uint16,Name\n7,Apple\n"),
            ("Stock", "Item +Items,Count int32\n7,3\n"),
        ]);
        resolve(&mut db).unwrap();

        let stock = db.get("Stock").unwrap();
        assert_eq!(stock.columns[0].field_type, FieldType::UInt16);
        assert_eq!(stock.rows[0].fields[0], Field::UInt16(7));
    }

    #[test]
    fn chains_follow_through_link_keys() {
        let mut db = database(&[
            ENUM,
            ("Weapons", "Type key +EnumWeaponTypes,Damage uint8\nGun,3\n"),
            ("Loadouts", "Weapon +Weapons\nGun\n"),
        ]);
        resolve(&mut db).unwrap();

        let loadouts = db.get("Loadouts").unwrap();
        assert_eq!(
            loadouts.columns[0].resolution,
            Resolution::Enum { table: "EnumWeaponTypes".into() }
        );
        assert_eq!(loadouts.rows[0].fields[0], Field::UInt8(1));
    }

    #[test]
    fn composite_link_picks_named_key() {
        let mut db = database(&[
            ("Cells", "X key int8,Y key int16\n1,2\n"),
            ("Units", "At:X +Cells,At:Y +Cells\n1,2\n"),
        ]);
        resolve(&mut db).unwrap();

        let units = db.get("Units").unwrap();
        assert_eq!(units.columns[0].field_type, FieldType::Int8);
        assert_eq!(units.columns[1].field_type, FieldType::Int16);
    }

    #[test]
    fn composite_target_needs_suffix() {
        let mut db = database(&[
            ("Cells", "X key int8,Y key int16\n1,2\n"),
            ("Units", "At +Cells\n1\n"),
        ]);
        assert!(matches!(resolve(&mut db).unwrap_err(), Error::CompositeKeyMismatch { .. }));
    }

    #[test]
    fn link_cycle_is_detected() {
        let mut db = database(&[
            ("A", "Id key +B\nx\n"),
            ("B", "Id key *A\nx\n"),
        ]);
        let err = resolve(&mut db).unwrap_err();
        assert!(matches!(err, Error::LinkCycle { .. }));
        assert!(err.to_string().contains("->"));
    }

    #[test]
    fn missing_and_keyless_targets_fail() {
        let mut db = database(&[("Weapons", "Owner +Players\nx\n")]);
        assert!(matches!(resolve(&mut db).unwrap_err(), Error::MissingForeignTable { .. }));

        let mut db = database(&[("Players", "Name\nx\n"), ("Weapons", "Owner +Players\nx\n")]);
        assert!(matches!(resolve(&mut db).unwrap_err(), Error::ForeignTableWithoutKey { .. }));
    }

    #[test]
    fn unparsable_link_value_fails() {
        let mut db = database(&[
            ("Items", "Id key uint8\n1\n"),
            ("Stock", "Item +Items\n300\n"),
        ]);
        assert!(matches!(
            resolve(&mut db).unwrap_err(),
            Error::InvalidValue { expected: FieldType::UInt8, .. }
        ));
    }
}
