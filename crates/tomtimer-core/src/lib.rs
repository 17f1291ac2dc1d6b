//! tomtimer-core - Core library for TomTimer
//!
//! This crate contains the task model, the local `SQLite` store, and the
//! engine that keeps tasks in two-way sync with an external checklist
//! service. Interfaces (currently the CLI) are thin layers over it.

pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Task, TaskId};
pub use services::TaskService;
