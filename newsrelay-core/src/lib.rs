//! Core types and the poll/dispatch machinery for the newsrelay news notifier.

/// Parsing of user commands and rendering of their replies.
pub mod commands;
/// Readiness gate that holds back the first poll until the session is up.
pub mod lifecycle;
/// Domain models and identifiers shared by all adapters.
pub mod model;
/// Scheduled poll/dispatch loop.
pub mod poller;
/// Traits describing the source and notifier collaborators.
pub mod ports;
/// Tenant to destination mapping shared by the loop and the command surface.
pub mod registry;
/// Command-facing facade: registration and on-demand fetch.
pub mod service;
/// Durable storage for registered destinations.
pub mod store;
/// Bookkeeping of item identifiers that have already been announced.
pub mod tracker;

pub use commands::*;
pub use lifecycle::*;
pub use model::*;
pub use poller::*;
pub use ports::*;
pub use registry::*;
pub use service::*;
pub use store::*;
pub use tracker::*;
