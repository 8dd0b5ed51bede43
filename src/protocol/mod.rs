//! Protocol Module
//!
//! Vocabulary shared between the client and the engine it drives.
//!
//! ## Drain sequence
//! ```text
//!   submit(keys) ──► DrainStep::Record ──► DrainStep::Record ──► DrainStep::End
//!                          │                                         │
//!                          └────────► DrainStep::Failed(code) ◄──────┘ (any step)
//! ```
//!
//! ### Status buckets
//! - Nominal: SUCCESS, STORED, DELETED, STAT
//! - Notice:  END, BUFFERED
//! - Failure: everything else

mod status;
mod outcome;
mod option;
mod record;

pub use status::ResultCode;
pub use outcome::{Outcome, ResultTracker};
pub use option::{Behavior, ClientOption, OptionValue};
pub use record::{DrainStep, FetchedItem, ResultRecord};
