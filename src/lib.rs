//! Offline-capable smart-factory monitoring dashboard.
//!
//! - [`cache`]: the worker that sits between the page and the network
//! - [`data`]: CSV dataset loading with a synthetic fallback
//! - [`view`]: derived widgets and the UI reducer

pub mod cache;
pub mod data;
pub mod error;
pub mod logging;
pub mod schedule;
pub mod state;
pub mod storage;
pub mod view;
