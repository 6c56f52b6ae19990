//! REST API binding for the placement engine and booking ledger.

pub mod rest;
pub mod schemas;
pub mod server;
