//! CSV front end
//!
//! This crate handles:
//! - Tokenizing CSV text into rows of raw fields
//! - Parsing header cells into column specs
//! - Loading a file into a typed table with shape checks

pub mod header;
pub mod loader;
pub mod tokenizer;

pub use header::parse_header;
pub use loader::{check_shape, load_file, load_table};
pub use tokenizer::{read_rows, CsvReader, Record};
