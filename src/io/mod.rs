/// CSV and JSON export of steering results.
pub mod export;
