//! # circstore
//!
//! A fixed-slot circular log store for raw block-erasable storage (NOR
//! flash and friends):
//! - Append-only records in fixed-size slots
//! - Oldest records evicted a whole erase region at a time once full
//! - O(log n) lookup by monotonically increasing logical index
//! - No metadata outside the slot headers; state is rebuilt by scanning
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CircStore                             │
//! │    append / read_latest / read_by_index / count / clear      │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!   ┌─────────────────┐ ┌───────────────┐ ┌────────────────┐
//!   │ BoundaryLocator │ │ IndexResolver │ │    Appender    │
//!   │ (oldest/newest) │ │ (binary srch) │ │ (erase + write)│
//!   └────────┬────────┘ └───────┬───────┘ └───────┬────────┘
//!            └──────────────────┼─────────────────┘
//!                               ▼
//!                 ┌──────────────────────────┐
//!                 │  Layout  +  Slot codec   │
//!                 └─────────────┬────────────┘
//!                               ▼
//!                 ┌──────────────────────────┐
//!                 │   Medium (read/write/    │
//!                 │          erase)          │
//!                 └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod medium;
pub mod slot;
pub mod layout;
pub mod locate;
pub mod resolve;
pub mod append;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CircError, Result};
pub use config::Config;
pub use medium::{Medium, MediumError};
pub use slot::Record;
pub use store::CircStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of circstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
