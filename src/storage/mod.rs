//! The columnar store: tables as ordered sequences of chunks (spec §3).
//!
//! On-disk persistence and block I/O are out of scope (spec §1); any
//! loader able to produce a `(schema, chunks)` pair can hand rows to a
//! [`Table`].

pub mod table;

pub use table::{RecordId, Table};
