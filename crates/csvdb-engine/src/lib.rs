//! csvdb engine - cross-table compiler stages
//!
//! This crate implements everything that needs the whole schema at once:
//! - Type resolution of link columns
//! - Key ordering and duplicate detection
//! - Foreign-key and range validation
//! - Dependency ordering for code emission
//! - Canonical write-back of source files

pub mod dag;
pub mod pipeline;
pub mod resolver;
pub mod sorter;
pub mod validator;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use dag::DependencyGraph;
pub use pipeline::{canonicalize, compile, compile_dir, discover, load_database, source_of, table_name, Compilation, SourceMode};
pub use resolver::{follow_chain, resolve, Terminal};
pub use sorter::{sort_table, sort_tables};
pub use validator::{check_links, check_ranges, pair_columns, validate};
pub use writer::{to_csv_string, write_if_changed};
