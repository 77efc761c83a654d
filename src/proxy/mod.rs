//! Proxy module for parsing, checking and pooling proxies
//!
//! This module provides functionality for:
//! - Parsing proxies from various formats (IP:PORT, IP:PORT:USER:PASS, etc.)
//! - Checking proxy reachability with bounded concurrency
//! - Rotating through a pool that retires failed proxies for the run

pub mod checker;
pub mod models;
pub mod parser;
pub mod pool;

pub use checker::{CheckerConfig, ProxyChecker};
pub use models::{
    Proxy, ProxyAuth, ProxyCheckResult, ProxyCheckStatus, ProxyEntry, ProxyStatus, ProxyType, Route,
};
pub use parser::ProxyParser;
pub use pool::ProxyPool;
