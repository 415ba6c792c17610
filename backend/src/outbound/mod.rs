//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL-backed songs using Diesel, plus the
//!   embedded migrations and the explicit [`Database`](persistence::Database)
//!   handle.

pub mod persistence;
