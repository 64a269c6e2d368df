//! Input parsers.
//!
//! Reads the type table produced by the schema compiler into descriptors
//! ready for [`resolve`](crate::resolve::resolve).

mod table;

pub use table::{ParseError, parse_type_table, parse_type_table_str};
