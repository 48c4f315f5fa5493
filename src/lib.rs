//! datafile-portal - stage, submit and track quarterly data files
//!
//! The library covers the file-submission and status-polling core:
//!
//! - [`staging`] holds at most one unsubmitted file per slot
//! - [`session`] is the explicit session handle shared by the other parts
//! - [`submit`] turns staged files into server records and starts polling
//! - [`poll`] is the bounded-retry poller and its record-level tracker
//! - [`guard`] protects staged work from session parameter changes
//! - [`history`] partitions and paginates submitted records
//! - [`transport`] is the server collaborator (HTTP implementation included)

pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod poll;
pub mod records;
pub mod session;
pub mod staging;
pub mod submit;
pub mod transport;
pub mod types;
