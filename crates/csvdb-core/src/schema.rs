//! Table model
//!
//! A [`Database`] is the set of tables loaded from one input directory. It is
//! built once, mutated in place by type resolution and sorting, and read-only
//! afterwards.

use crate::error::{Error, Result};
use crate::field::{Field, FieldType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Strength of a foreign-table link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrength {
    /// `+Table`: participates in dependency ordering and cycle detection
    Strong,

    /// `*Table`: ignored by the dependency graph, used to break cycles
    Weak,
}

/// Link from a column to the key of another table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignLink {
    pub table: String,
    pub strength: LinkStrength,
}

impl ForeignLink {
    pub fn strong(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            strength: LinkStrength::Strong,
        }
    }

    pub fn weak(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            strength: LinkStrength::Weak,
        }
    }

    pub fn is_strong(&self) -> bool {
        self.strength == LinkStrength::Strong
    }
}

/// Where a column's final type came from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resolution {
    /// The column's own declared type
    #[default]
    Declared,

    /// The link chain ends at an enum table; cells hold member values
    Enum { table: String },

    /// The link chain ends at a concrete key column of a regular table
    Table { table: String, column: String },
}

/// One column of a table, as described by its header cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within the table
    pub name: String,

    /// Declared type, replaced by the resolved type for link columns
    pub field_type: FieldType,

    /// Part of the table's key
    pub is_key: bool,

    /// Plain unvalidated string, left out of generated code
    pub is_ignored: bool,

    /// Lower bound, raw text until the final type is known
    pub min_value: Option<String>,

    /// Upper bound, raw text until the final type is known
    pub max_value: Option<String>,

    /// Text after `//` in the header cell
    pub comment: Option<String>,

    /// Foreign-table link, if any
    pub link: Option<ForeignLink>,

    /// Header cell exactly as read, written back unchanged
    pub raw_header: String,

    /// Set by type resolution
    pub resolution: Resolution,
}

impl ColumnSpec {
    /// A plain string column
    pub fn new(name: impl Into<String>, raw_header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
            is_key: false,
            is_ignored: false,
            min_value: None,
            max_value: None,
            comment: None,
            link: None,
            raw_header: raw_header.into(),
            resolution: Resolution::Declared,
        }
    }

    /// Name up to the `:` of a `Base:RemoteKey` composite column
    pub fn base_name(&self) -> &str {
        self.name.split_once(':').map_or(&self.name, |(base, _)| base)
    }

    /// Remote key name after the `:` of a `Base:RemoteKey` composite column
    pub fn remote_key(&self) -> Option<&str> {
        self.name.split_once(':').map(|(_, remote)| remote)
    }

    /// Name of the linked table, if any
    pub fn link_table(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.table.as_str())
    }
}

/// Table kind, derived from the table name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// `Enum*`: Name/Value/Comment rows that become a generated enum
    Enum,

    /// `Global*`: exactly one row, a singleton downstream
    Global,

    /// Everything else
    Regular,
}

impl TableKind {
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("Enum") {
            Self::Enum
        } else if name.starts_with("Global") {
            Self::Global
        } else {
            Self::Regular
        }
    }
}

/// Line terminator style of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Newline {
    #[default]
    Lf,
    CrLf,
}

impl Newline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Text layout details of the source file that canonical output reproduces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLayout {
    pub newline: Newline,
    pub trailing_newline: bool,
}

impl TextLayout {
    /// Detect the layout of existing file text.
    ///
    /// The newline style is taken from the first line break; text without
    /// any line break uses LF.
    pub fn detect(text: &str) -> Self {
        let newline = match text.find(|c: char| c == '\r' || c == '\n') {
            Some(pos) if text[pos..].starts_with("\r\n") => Newline::CrLf,
            _ => Newline::Lf,
        };

        Self {
            newline,
            trailing_newline: text.ends_with('\n') || text.ends_with('\r'),
        }
    }
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            newline: Newline::Lf,
            trailing_newline: true,
        }
    }
}

/// A data row with the source line it started on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// 1-indexed source line
    pub line: usize,

    /// One field per column
    pub fields: Vec<Field>,
}

impl Row {
    pub fn new(line: usize, fields: Vec<Field>) -> Self {
        Self { line, fields }
    }
}

/// A table loaded from one CSV file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name (file stem)
    pub name: String,

    pub kind: TableKind,

    pub columns: Vec<ColumnSpec>,

    /// Indices of key columns, in declared order
    pub key_columns: Vec<usize>,

    pub rows: Vec<Row>,

    pub layout: TextLayout,

    /// File the table was read from
    pub source: Option<PathBuf>,
}

impl Table {
    /// Create an empty table; key columns are taken from the column specs
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        let name = name.into();
        let key_columns = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_key)
            .map(|(i, _)| i)
            .collect();

        Self {
            kind: TableKind::from_name(&name),
            name,
            columns,
            key_columns,
            rows: Vec::new(),
            layout: TextLayout::default(),
            source: None,
        }
    }

    /// Set the source file
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the text layout
    pub fn with_layout(mut self, layout: TextLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TableKind::Enum
    }

    pub fn is_global(&self) -> bool {
        self.kind == TableKind::Global
    }

    pub fn has_key(&self) -> bool {
        !self.key_columns.is_empty()
    }

    /// Find a column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Compare two rows by the table's key columns, in key order
    pub fn compare_keys(&self, a: &Row, b: &Row) -> Ordering {
        for &k in &self.key_columns {
            match a.fields[k].cmp(&b.fields[k]) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    /// Render the key tuple of a row as `Col=value, ...`
    pub fn describe_key(&self, row: &Row) -> String {
        self.key_columns
            .iter()
            .map(|&k| format!("{}={}", self.columns[k].name, row.fields[k]))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Binary-search sorted rows for a key tuple given in key-column order
    pub fn find_by_key(&self, key: &[&Field]) -> Option<usize> {
        let result = self.rows.binary_search_by(|row| {
            for (&k, wanted) in self.key_columns.iter().zip(key) {
                match row.fields[k].cmp(wanted) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });
        result.ok()
    }
}

/// Outcome of looking up an enum member by name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumMatch<'a> {
    /// Exact spelling
    Exact(&'a Field),

    /// Unique case-insensitive match; carries the declared spelling
    Folded { value: &'a Field, name: &'a str },
}

impl<'a> EnumMatch<'a> {
    pub fn value(&self) -> &'a Field {
        match self {
            Self::Exact(value) | Self::Folded { value, .. } => value,
        }
    }
}

/// Lookup structures for one enum table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumIndex {
    /// Enum table name
    pub table: String,

    /// Type of the `Value` column
    pub value_type: FieldType,

    /// `(name, value)` sorted by name
    by_name: Vec<(String, Field)>,

    /// `(value, name)` sorted by value
    by_value: Vec<(Field, String)>,

    /// First member in file order
    default_member: String,
}

impl EnumIndex {
    /// Build the index for an enum table whose shape was already checked.
    ///
    /// Member names and values must both be unique.
    pub fn build(table: &Table) -> Result<Self> {
        let mut by_name = Vec::with_capacity(table.rows.len());
        let mut lines = BTreeMap::new();
        for row in &table.rows {
            let name = row.fields[0].to_string();
            lines.insert(name.clone(), row.line);
            by_name.push((name, row.fields[1].clone(), row.line));
        }

        by_name.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in by_name.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(Error::DuplicateKey {
                    table: table.name.clone(),
                    line: pair[1].2.max(pair[0].2),
                    key: format!("Name={}", pair[1].0),
                });
            }
        }

        let mut by_value: Vec<(Field, String)> = by_name
            .iter()
            .map(|(name, value, _)| (value.clone(), name.clone()))
            .collect();
        by_value.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in by_value.windows(2) {
            if pair[0].0 == pair[1].0 {
                let line = lines.get(&pair[1].1).copied().unwrap_or(1);
                return Err(Error::DuplicateKey {
                    table: table.name.clone(),
                    line,
                    key: format!("Value={}", pair[1].0),
                });
            }
        }

        let default_member = table
            .rows
            .first()
            .map(|row| row.fields[0].to_string())
            .ok_or_else(|| Error::EnumShape {
                table: table.name.clone(),
                reason: "needs at least one member".to_string(),
            })?;

        Ok(Self {
            table: table.name.clone(),
            value_type: table.columns[1].field_type,
            by_name: by_name.into_iter().map(|(n, v, _)| (n, v)).collect(),
            by_value,
            default_member,
        })
    }

    /// Look up a member by name: exact first, then a unique ASCII
    /// case-insensitive match.
    pub fn lookup(&self, name: &str) -> Option<EnumMatch<'_>> {
        if let Ok(pos) = self.by_name.binary_search_by(|(n, _)| n.as_str().cmp(name)) {
            return Some(EnumMatch::Exact(&self.by_name[pos].1));
        }

        let mut folded = self
            .by_name
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name));
        match (folded.next(), folded.next()) {
            (Some((n, value)), None) => Some(EnumMatch::Folded { value, name: n }),
            _ => None,
        }
    }

    /// Member name for a value
    pub fn name_of(&self, value: &Field) -> Option<&str> {
        self.by_value
            .binary_search_by(|(v, _)| v.cmp(value))
            .ok()
            .map(|pos| self.by_value[pos].1.as_str())
    }

    /// Member names in ascending order
    pub fn sorted_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.iter().map(|(n, _)| n.as_str())
    }

    /// `(value, name)` pairs in ascending value order
    pub fn by_value(&self) -> &[(Field, String)] {
        &self.by_value
    }

    /// First member in file order
    pub fn default_member(&self) -> &str {
        &self.default_member
    }

    /// `Some(n)` when the values are exactly `0..n`
    pub fn sequential_count(&self) -> Option<usize> {
        self.by_value
            .iter()
            .enumerate()
            .all(|(i, (value, _))| value.is_index(i as u64))
            .then_some(self.by_value.len())
    }
}

/// All tables of one schema directory
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
    enums: BTreeMap<String, EnumIndex>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Enum tables get their lookup index built here.
    pub fn insert(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::DuplicateTable { table: table.name });
        }

        if table.is_enum() {
            let index = EnumIndex::build(&table)?;
            self.enums.insert(table.name.clone(), index);
        }

        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.values_mut()
    }

    /// Table names in name order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Lookup index of an enum table
    pub fn enum_index(&self, name: &str) -> Option<&EnumIndex> {
        self.enums.get(name)
    }

    /// Enum indexes in table-name order
    pub fn enums(&self) -> impl Iterator<Item = &EnumIndex> {
        self.enums.values()
    }

    /// Source file of a table
    pub fn source_of(&self, name: &str) -> Option<&Path> {
        self.tables.get(name).and_then(|t| t.source.as_deref())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
