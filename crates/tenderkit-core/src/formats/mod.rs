//! # Formats Module
//!
//! Binary serialization for persisted snapshots. File and database I/O
//! live in [`storage`](crate::storage).

mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes,
};
