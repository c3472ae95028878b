//! DolarLempira library
//!
//! Exchange rate loading with cache-then-network fallback, USD/HNL conversion, the
//! terminal UI built on top of them, and the proxy endpoint the client reads from.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod format;
pub mod logging;
pub mod proxy;
pub mod rate;
pub mod refresh;
pub mod ui;

#[cfg(test)]
mod testutil;
