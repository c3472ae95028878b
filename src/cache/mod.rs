//! Cache module for persisting the exchange rate to disk
//!
//! This module provides a single-record store with a fixed freshness window. Expired
//! records stay readable through `get_ignoring_ttl`, which lets the rate service show
//! the last known rate when the network is unavailable.

mod manager;

pub use manager::{RateCache, StorageError};
