//! Core library for the cmdb-sync command line application.
//!
//! The library exposes the pieces that power the CLI as well as the
//! integration tests. The modules are structured to keep responsibilities
//! narrow and composable: export ingestion lives under [`io`], data
//! representations inside [`model`], the type enumerations in [`catalog`],
//! the REST client and remote index under [`cmdb`], and the reconciliation
//! orchestration in [`sync`].

pub mod archive;
pub mod catalog;
pub mod cmdb;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod sync;

pub use error::{Result, SyncError};
