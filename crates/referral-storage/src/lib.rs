//! Store backends for referral codes and users.
//!
//! [`InMemoryStore`] keeps everything in sharded concurrent maps and is meant
//! for tests and single-node development. [`PgStore`] persists to Postgres
//! through a connection pool; the schema lives in `ddl/postgres`.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use referral_core::{ReferralStore, StoreError, UserStore};

/// Schema for the Postgres backend, one file per table.
pub const POSTGRES_SCHEMA: [&str; 2] = [
    include_str!("../ddl/postgres/referrals.sql"),
    include_str!("../ddl/postgres/users.sql"),
];
