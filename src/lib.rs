//! Client-side watch-progress tracking for a video front end.
//!
//! [`engine`] holds the ledger, classifier, shelves and series navigation.
//! [`catalog`], [`db`] and [`config`] are the collaborators the CLI wires in.

pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod paths;
