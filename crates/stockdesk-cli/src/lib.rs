//! Command-line front end for `stockdesk-core`.
//!
//! The binary in `main.rs` only parses arguments, installs the log
//! subscriber and maps errors to exit codes; everything it runs lives here
//! so the workspace behavior tests can drive commands and the spreadsheet
//! export directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod export;
pub mod metadata;
pub mod output;
