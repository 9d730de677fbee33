//! Table stores: local CSV files for uploads, Google Sheets for scheduled runs.

pub mod csv_file;
pub mod google;

pub use csv_file::{parse_csv, render_csv, CsvFileStore};
pub use google::{GoogleSheet, GoogleSheetsClient};
