// File: src/core/threshold.rs
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const MAX_THRESHOLD: u32 = 100;

/// Live cutoff on the 0..=100 scale, owned by the presentation layer and
/// read fresh at every filtering step.
pub trait ThresholdProvider: Send + Sync {
    fn threshold(&self) -> u32;
}

impl<F> ThresholdProvider for F
where
    F: Fn() -> u32 + Send + Sync,
{
    fn threshold(&self) -> u32 {
        self()
    }
}

/// A shareable threshold a slider (or a test) can move at any time.
#[derive(Debug, Clone, Default)]
pub struct LiveThreshold {
    value: Arc<AtomicU32>,
}

impl LiveThreshold {
    pub fn new(value: u32) -> Self {
        Self {
            value: Arc::new(AtomicU32::new(value.min(MAX_THRESHOLD))),
        }
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: u32) {
        self.value.store(value.min(MAX_THRESHOLD), Ordering::Release);
    }

    /// Moves the threshold by `delta`, clamped to 0..=100. Returns the new value.
    pub fn nudge(&self, delta: i32) -> u32 {
        let mut current = self.get();
        loop {
            let next = (current as i64 + delta as i64).clamp(0, MAX_THRESHOLD as i64) as u32;
            match self
                .value
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

impl ThresholdProvider for LiveThreshold {
    fn threshold(&self) -> u32 {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_clamped() {
        let threshold = LiveThreshold::new(250);
        assert_eq!(threshold.get(), 100);
        threshold.set(40);
        assert_eq!(threshold.nudge(-50), 0);
        assert_eq!(threshold.nudge(7), 7);
    }

    #[test]
    fn clones_share_one_value() {
        let slider = LiveThreshold::new(66);
        let reader = slider.clone();
        slider.set(80);
        assert_eq!(reader.threshold(), 80);
    }
}
