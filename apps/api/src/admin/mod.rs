//! Admin dashboard: login gate, table view over all records, spreadsheet export.

pub mod export;
pub mod handlers;
pub mod table;
