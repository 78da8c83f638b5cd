//! Process-unique item ids.
//!
//! One global counter hands out every uid. It is the only shared mutable
//! state in the crate, so it is atomic and safe to call from any thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Identity of one item instance. Assigned once, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u64);

/// The counter has no ids left to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("uid space exhausted")]
pub struct UidExhausted;

impl Uid {
    /// Never handed out by [`Uid::fresh`]; the counter stops below it.
    pub const MAX: Uid = Uid(u64::MAX);

    /// Draw a uid no earlier call has returned.
    ///
    /// Fails once the counter reaches [`Uid::MAX`] instead of wrapping.
    pub fn fresh() -> Result<Uid, UidExhausted> {
        NEXT_UID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .map(Uid)
            .map_err(|_| UidExhausted)
    }

    /// Make sure later `fresh` calls return ids above `uid`.
    ///
    /// Used when adopting items whose ids were assigned elsewhere, e.g. a
    /// cart snapshot. `Uid::MAX` cannot be reserved past.
    pub fn reserve_through(uid: Uid) -> Result<(), UidExhausted> {
        let floor = uid.0.checked_add(1).ok_or(UidExhausted)?;
        NEXT_UID.fetch_max(floor, Ordering::Relaxed);
        Ok(())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
