//! Offline cache manager.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  WorkerEvent │────►│ CacheWorker  │────►│ CacheStorage │
//! │  (dispatch)  │     │  (handlers)  │     │ static/data  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Fetcher    │     │   Clients    │
//!                      │  (network)   │     │   (pages)    │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! Static assets are served cache-first, the data resource network-first.
//! Store names carry a version tag; activation deletes any store from an
//! older deployment.

pub mod clients;
pub mod http;
pub mod lifecycle;
pub mod message;
pub mod network;
pub mod notify;
pub mod policy;
pub mod store;
pub mod worker;

pub use http::{Request, Response};
pub use network::Fetcher;
pub use store::CacheStorage;
pub use worker::{CacheWorker, WorkerConfig, WorkerEvent, WorkerOutcome};
