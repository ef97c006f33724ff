//! Observability subsystem for relstore
//!
//! - Structured logging (JSON lines)
//! - Typed engine events
//! - Monotonic counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use relstore::observability::{Event, Logger};
//!
//! Logger::info(Event::TableCreated.as_str(), &[("table", "users")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
