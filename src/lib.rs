//! # DST Amendment Tool
//!
//! A small web tool for the daily staffing table (DST). The BCC uploads the
//! day's `.xlsx` file; the FL then edits a fixed set of columns and exports an
//! amended copy that is uploaded to Google Drive and offered for download.
//!
//! ## Layout
//!
//! - [`spreadsheet`]: `.xlsx` decoding into a [`table::Table`] and encoding back
//! - [`table`]: the column-oriented table model and cell values
//! - [`workflow`]: the intake and amendment stages operating on a per-user [`workflow::session::Session`]
//! - [`storage`]: the [`storage::FileStore`] trait and its Google Drive client
//! - [`server`]: the axum front end rendering both tabs
//! - [`config`]: settings read from the environment
pub mod config;
pub mod error;
pub mod server;
pub mod spreadsheet;
pub mod storage;
pub mod table;
pub mod workflow;

mod helpers;

pub use error::DstError;
