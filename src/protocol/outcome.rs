//! Outcome mapping
//!
//! Sorts every engine status into one of three buckets and keeps the
//! sticky "last result code" up to date.
//!
//! | Bucket  | Codes                              | Sticky code | Caller sees |
//! |---------|------------------------------------|-------------|-------------|
//! | Nominal | SUCCESS, STORED, DELETED, STAT     | untouched   | success     |
//! | Notice  | END, BUFFERED                      | recorded    | success     |
//! | Failure | everything else                    | recorded    | error       |

use crate::error::{MemlinkError, Result};

use super::ResultCode;

/// Classification of an engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Normal completion
    Nominal,

    /// Part of normal operation, but worth remembering (e.g. end of a drain)
    Notice,

    /// The operation failed
    Failure,
}

impl Outcome {
    /// Classify a status
    pub fn of(code: ResultCode) -> Self {
        match code {
            ResultCode::Success | ResultCode::Stored | ResultCode::Deleted | ResultCode::Stat => {
                Outcome::Nominal
            }
            ResultCode::End | ResultCode::Buffered => Outcome::Notice,
            _ => Outcome::Failure,
        }
    }

    pub fn is_failure(self) -> bool {
        self == Outcome::Failure
    }
}

/// Holds the last non-nominal result code of a client
///
/// Never reset between unrelated operations except where a retrieval
/// explicitly asks for it with `reset()`.
#[derive(Debug, Clone, Default)]
pub struct ResultTracker {
    last: ResultCode,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sticky code
    pub fn last(&self) -> ResultCode {
        self.last
    }

    /// Back to SUCCESS
    pub fn reset(&mut self) {
        self.last = ResultCode::Success;
    }

    /// Overwrite the sticky code unconditionally
    pub fn record(&mut self, code: ResultCode) {
        self.last = code;
    }

    /// Apply the outcome mapping to one engine status
    ///
    /// Returns `Err(MemlinkError::Engine)` for hard failures.
    pub fn check(&mut self, code: ResultCode) -> Result<Outcome> {
        let outcome = Outcome::of(code);
        match outcome {
            Outcome::Nominal => {}
            Outcome::Notice => self.last = code,
            Outcome::Failure => {
                self.last = code;
                return Err(MemlinkError::Engine(code));
            }
        }
        Ok(outcome)
    }
}
