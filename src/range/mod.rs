//! Range Index Module
//!
//! Lets a single ordered store answer bounded range queries per primary key.
//!
//! ## Key Layout
//! `escape(key text) + '_' + pad(range value)`. All entries of one key are contiguous
//! (prefix grouping) and, within a key, sorted by the range value (order preservation).
//!
//! ## Submodules
//! - **`padder`**: Order-preserving fixed-width encoding of signed int/long values.
//! - **`extractor`**: Reads the range field's type from a record schema and its value from a record.
//! - **`indexer`**: Write-side composite key construction and read-side scan boundaries.

pub mod extractor;
pub mod indexer;
pub mod padder;
