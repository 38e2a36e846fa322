//! Core library for the `westat` weather display.
//!
//! This crate defines:
//! - Configuration handling
//! - Report fetching and the shared report model
//! - The history store and per-field deltas
//! - The display controller and the background workers feeding it
//!
//! It is used by `westat-cli`, which owns the terminal and the render loop.

pub mod config;
pub mod controller;
pub mod delta;
pub mod fetcher;
pub mod history;
pub mod model;
pub mod scheduler;
pub mod supervisor;

pub use config::Config;
pub use controller::{Controller, ControllerEvent, Update};
pub use delta::{Delta, DeltaCategory};
pub use fetcher::{FetchError, NoaaFetcher, ReportFetcher};
pub use history::{HistoryError, HistoryStore};
pub use model::{FieldId, FieldValue, Reading, Report, ReportSnapshot, UnitsTable};
pub use scheduler::RefreshScheduler;
pub use supervisor::{ClockTicker, Supervisor};
