use crate::count::{IdentityMismatch, LikeCount, SubscriberCount, TrackedCount};

/// Keeps the best value seen so far for a single video or channel.
///
/// Samples that are equal to or lower than the watermark are dropped without
/// complaint, the Data API regularly serves stale or briefly lower numbers.
#[derive(Debug, Clone)]
pub struct CounterTracker<C: TrackedCount> {
    best_so_far: C,
}

pub type LikeCountTracker = CounterTracker<LikeCount>;
pub type SubscriberCountTracker = CounterTracker<SubscriberCount>;

impl<C: TrackedCount> CounterTracker<C> {
    /// Takes the identity and title from `seed`. Whether the numeric value is
    /// kept depends on the count type, see [`TrackedCount::seed`].
    pub fn new(seed: C) -> Self {
        Self {
            best_so_far: C::seed(seed),
        }
    }

    /// Replaces the watermark if `candidate` is strictly greater and returns
    /// whether it did.
    pub fn update(&mut self, candidate: C) -> Result<bool, IdentityMismatch> {
        if self.best_so_far.check(&candidate)? {
            self.best_so_far = candidate;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn current(&self) -> &C {
        &self.best_so_far
    }
}
