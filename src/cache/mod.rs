//! Status cache and side caches.
//!
//! This module keeps provider data between view switches so that the
//! expensive statuses queries run as rarely as possible:
//! - A per-provider statuses model with an update window and a refresh window
//! - Incremental updates merged repo by repo into the cached model
//! - Side caches for build statuses, notifications and label colors
//! - A shared [`CacheService`] handle with an async initialization barrier

mod clock;
mod error;
mod layer;
mod side;
mod status;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use layer::CacheService;
pub use side::{label_key, status_key, LabelMap, MENTION_REASONS};
pub use status::{epoch, EntryClocks, StatusCache, StoreOutcome};
pub use traits::{
  CacheIntervals, CacheResult, CacheSource, UpdateScope, UpdateTicket, MAX_INTERVAL_SECS,
};
