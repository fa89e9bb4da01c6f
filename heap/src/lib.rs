//! Kind-agnostic storage for the generational collector.
//!
//! Every object kind gets its own [`Space`]: a [`Pool`] of slots plus the
//! eden / from / to bookkeeping. The object graph itself (what references
//! what) is not known here; the `object` crate drives marking through
//! [`Space::try_mark`] and then asks each space to sweep.

mod handle;
mod pool;
mod settings;
mod space;

pub use handle::Handle;
pub use pool::{GcBits, Pool};
pub use settings::HeapSettings;
pub use space::{CycleKind, GcStats, Space, SweepCounts};
