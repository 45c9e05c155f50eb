//! Live query sync
//!
//! Keeps UI views up to date with backend collections. Each subscription
//! pairs a query spec with two callbacks and lives until it is stopped by
//! id, its handle is dropped, or the coordinator goes away.
//!
//! ## Lifecycle
//!
//! 1. `start_sync` registers a listener with the document store
//! 2. The store pushes the full result set whenever it changes
//! 3. `stop_sync` detaches the listener; no update follows its return
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = SyncCoordinator::new(store, &SyncSettings::default());
//! let id = coordinator.start_sync(
//!     QuerySpec::new("expenses").order_by("date", Direction::Desc).limit(5),
//!     |records| println!("{} expenses", records.len()),
//!     |error| eprintln!("{}", error.user_message()),
//! )?;
//! coordinator.stop_sync(&id);
//! ```

mod coordinator;
mod error;
mod subscription;

pub use coordinator::{SyncCoordinator, SyncSettings, SyncUpdate};
pub use error::SyncError;
pub use subscription::{Subscription, SubscriptionId};
