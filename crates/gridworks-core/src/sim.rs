//! Fixed-step simulation clock.
//!
//! Frames arrive with arbitrary elapsed time; the simulation only ever
//! advances in whole fixed steps. The clock accumulates elapsed time, reports
//! how many steps fit, and carries the remainder forward so throughput is
//! independent of frame rate.

use crate::fixed::{Fixed64, Ticks};

/// Accumulates frame time into fixed simulation steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    /// Current tick counter. Incremented by 1 for each simulation step.
    pub tick: Ticks,
    /// Unconsumed elapsed time, always below one step after `accumulate`.
    accumulator: Fixed64,
    /// Seconds per step.
    step: Fixed64,
    /// Cap on steps per frame; excess backlog is discarded.
    max_steps: u32,
}

impl SimClock {
    pub fn new(step: Fixed64, max_steps: u32) -> Self {
        Self {
            tick: 0,
            accumulator: Fixed64::ZERO,
            step,
            max_steps: max_steps.max(1),
        }
    }

    pub fn step_seconds(&self) -> Fixed64 {
        self.step
    }

    pub fn accumulator(&self) -> Fixed64 {
        self.accumulator
    }

    /// Add `elapsed` seconds and return how many fixed steps to run now.
    /// Negative elapsed time is ignored.
    pub fn accumulate(&mut self, elapsed: Fixed64) -> u32 {
        if elapsed > Fixed64::ZERO {
            self.accumulator = self.accumulator.saturating_add(elapsed);
        }
        if self.step <= Fixed64::ZERO {
            return 0;
        }

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if self.accumulator >= self.step {
            // Too far behind to catch up; keep only the sub-step remainder.
            self.accumulator %= self.step;
        }
        steps
    }

    /// Record that one step ran.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    #[test]
    fn carries_remainder_between_frames() {
        let mut clock = SimClock::new(fixed(0.25), 8);
        assert_eq!(clock.accumulate(fixed(0.375)), 1);
        assert_eq!(clock.accumulator(), fixed(0.125));
        assert_eq!(clock.accumulate(fixed(0.125)), 1);
        assert_eq!(clock.accumulator(), Fixed64::ZERO);
    }

    #[test]
    fn caps_steps_and_drops_backlog() {
        let mut clock = SimClock::new(fixed(0.25), 2);
        assert_eq!(clock.accumulate(fixed(10.1)), 2);
        assert!(clock.accumulator() < fixed(0.25));
    }

    #[test]
    fn negative_elapsed_is_ignored() {
        let mut clock = SimClock::new(fixed(0.5), 4);
        assert_eq!(clock.accumulate(fixed(-3.0)), 0);
        assert_eq!(clock.accumulator(), Fixed64::ZERO);
    }

    #[test]
    fn tick_counter_advances() {
        let mut clock = SimClock::new(fixed(1.0), 1);
        clock.advance_tick();
        clock.advance_tick();
        assert_eq!(clock.tick, 2);
    }
}
