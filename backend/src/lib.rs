//! Songbook persistence library.
//!
//! `domain` holds the song entity, audit timestamping, and the query
//! façade; `outbound` holds the Diesel adapters, migrations, and the
//! explicit `Database` handle; `config` resolves connection settings.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
