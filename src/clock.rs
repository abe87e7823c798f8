//! Simulated time for the particle system.
//!
//! The clock only moves when the owner of the render loop feeds it frame
//! deltas, so a run driven with a fixed delta is fully repeatable. Particle
//! activation timestamps and ages are measured against it.
//!
//! # Example
//!
//! ```ignore
//! use plume::clock::SimClock;
//!
//! let mut clock = SimClock::new();
//!
//! // In your frame loop:
//! let (now, delta) = clock.advance(1.0 / 60.0);
//! ```

/// Simulated time tracker.
///
/// Tracks elapsed time, the last delta and the number of frames advanced.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    /// Total simulated seconds since start.
    elapsed: f64,
    /// Seconds added by the last advance.
    delta: f32,
    /// Frames advanced since start.
    frame_count: u64,
    /// Whether time is paused.
    paused: bool,
}

impl SimClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame. Call once per step.
    ///
    /// Negative and non-finite deltas are treated as zero. While paused the
    /// delta is zero and elapsed time doesn't move, but the frame still counts.
    ///
    /// Returns `(elapsed, delta)` for convenience.
    pub fn advance(&mut self, delta: f32) -> (f64, f32) {
        self.frame_count += 1;

        self.delta = if self.paused || !delta.is_finite() {
            0.0
        } else {
            delta.max(0.0)
        };
        self.elapsed += self.delta as f64;

        (self.elapsed, self.delta)
    }

    /// Total simulated seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Seconds added by the last advance.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Frames advanced since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Whether time is currently paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop time progression.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume time progression.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Reset to time zero, unpaused.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = SimClock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_clock_advance() {
        let mut clock = SimClock::new();
        let (elapsed, delta) = clock.advance(0.5);
        assert_eq!(elapsed, 0.5);
        assert_eq!(delta, 0.5);

        clock.advance(0.25);
        assert_eq!(clock.elapsed(), 0.75);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_clock_pause() {
        let mut clock = SimClock::new();
        clock.advance(1.0);

        clock.pause();
        let (elapsed, delta) = clock.advance(1.0);

        // Elapsed should not increase while paused
        assert_eq!(elapsed, 1.0);
        assert_eq!(delta, 0.0);

        clock.toggle_pause();
        clock.advance(1.0);
        assert_eq!(clock.elapsed(), 2.0);
    }

    #[test]
    fn test_bad_deltas_are_ignored() {
        let mut clock = SimClock::new();
        clock.advance(-1.0);
        clock.advance(f32::NAN);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_reset() {
        let mut clock = SimClock::new();
        clock.advance(3.0);
        clock.pause();
        clock.reset();
        assert_eq!(clock.elapsed(), 0.0);
        assert!(!clock.is_paused());
    }
}
