//! Reconciliation engine for the deadline calendar.
//!
//! This crate turns crawled assignments into calendar writes:
//! - [`SyncEngine`] resolves the target calendar and converges its events
//! - [`SyncContext`] owns the site session and calendar gateway of one run
//! - [`RunLock`] keeps two runs from writing to the same calendar at once
//!
//! # Example
//!
//! ```rust,no_run
//! use moodlesync_engine::{SyncSettings, run_sync};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SyncSettings::default().with_months(3);
//!     let report = run_sync(&settings).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod lock;
mod sync;

pub use config::{CALENDAR_DESCRIPTION, DEFAULT_CALENDAR_NAME, DEFAULT_MONTHS, SyncSettings};
pub use context::{SyncContext, check_session};
pub use error::{SyncError, SyncResult};
pub use lock::{RunLock, default_lock_dir, lock_path};
pub use sync::{SyncEngine, SyncReport, run_sync};
