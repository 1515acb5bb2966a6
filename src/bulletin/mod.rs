//! CPI bulletin handling.
//!
//! - spreadsheet decoding (`parser`)
//! - persisted cursor + filename arithmetic (`cursor`)
//! - HTTP download (`fetch`)
//! - fetch-validate-commit protocol (`update`)

pub mod cursor;
pub mod fetch;
pub mod parser;
pub mod update;

pub use cursor::{BulletinCursor, BulletinName};
pub use fetch::{BulletinSource, DEFAULT_BASE_URL, HttpBulletinSource, resolve_base_url};
pub use parser::{BulletinDecoder, SpreadsheetDecoder};
pub use update::{BulletinUpdate, UpdateOutcome, refresh_bulletin};
