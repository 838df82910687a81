//! The scheduler seam: `now`, `arm`, `cancel`, `is_active`.
//!
//! The motion core never sleeps and never spawns threads — every side
//! effect happens synchronously inside a host I/O pulse or a scheduler-driven
//! service call, and time only advances between calls. Any host may
//! implement [`Scheduler`] with its own event loop; [`SimScheduler`] is a
//! self-contained reference implementation good enough to run the crate's
//! own tests and small standalone tools against.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Index of one of the eight tape units, 0..=7.
pub type UnitId = u8;

/// The discrete-event scheduler contract the motion core depends on.
pub trait Scheduler {
    /// Current scheduler time. Monotonically non-decreasing.
    fn now(&self) -> u64;

    /// Arm a one-shot callback for `unit`, `delay` ticks from now. Replaces
    /// (implicitly cancels) any previously armed callback for that unit.
    fn arm(&mut self, unit: UnitId, delay: u64);

    /// Cancel any pending callback for `unit`. Idempotent.
    fn cancel(&mut self, unit: UnitId);

    /// Whether `unit` currently has a pending callback armed.
    fn is_active(&self, unit: UnitId) -> bool;
}

/// Reference [`Scheduler`]: a `(fire_tick, unit)` min-heap. `now()` only
/// moves forward when the caller explicitly
/// drives it with [`SimScheduler::advance_to`] or [`SimScheduler::pop_due`] —
/// there is no wall-clock dependency, matching the crate's non-goal of
/// real-time fidelity.
#[derive(Debug, Default)]
pub struct SimScheduler {
    now: u64,
    /// Generation counter per unit: incremented on every `arm`/`cancel` so a
    /// stale heap entry left behind by a superseded `arm` can be recognized
    /// and skipped rather than firing twice.
    generation: [u64; 8],
    heap: BinaryHeap<Reverse<(u64, u64, UnitId)>>,
}

impl SimScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `now` to `tick` without firing anything. Panics if `tick`
    /// would move time backward.
    pub fn advance_to(&mut self, tick: u64) {
        assert!(tick >= self.now, "scheduler time must not go backward");
        self.now = tick;
    }

    /// Pop the next due unit (if its `fire_tick` is <= `now` and it has not
    /// been superseded by a later `arm`/`cancel`), advancing `now` to its
    /// fire tick if that is later than the current time.
    pub fn pop_due(&mut self) -> Option<UnitId> {
        while let Some(Reverse((fire_tick, gen, unit))) = self.heap.peek().copied() {
            self.heap.pop();
            if self.generation[unit as usize] != gen {
                continue; // superseded by a later arm/cancel
            }
            if fire_tick > self.now {
                self.now = fire_tick;
            }
            return Some(unit);
        }
        None
    }

    /// Run `pop_due` to exhaustion, invoking `on_fire` for each unit whose
    /// timer elapses, until no more timers are pending at or before `until`.
    pub fn run_until<F: FnMut(&mut Self, UnitId)>(&mut self, until: u64, mut on_fire: F) {
        loop {
            let Some(Reverse((fire_tick, _, _))) = self.heap.peek().copied() else {
                break;
            };
            if fire_tick > until {
                break;
            }
            if let Some(unit) = self.pop_due() {
                on_fire(self, unit);
            }
        }
        if self.now < until {
            self.now = until;
        }
    }
}

impl Scheduler for SimScheduler {
    fn now(&self) -> u64 {
        self.now
    }

    fn arm(&mut self, unit: UnitId, delay: u64) {
        self.generation[unit as usize] += 1;
        let gen = self.generation[unit as usize];
        self.heap.push(Reverse((self.now + delay, gen, unit)));
    }

    fn cancel(&mut self, unit: UnitId) {
        self.generation[unit as usize] += 1;
    }

    fn is_active(&self, unit: UnitId) -> bool {
        self.heap
            .iter()
            .any(|Reverse((_, gen, u))| *u == unit && *gen == self.generation[unit as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_then_pop_due_fires_at_right_tick() {
        let mut sched = SimScheduler::new();
        sched.arm(3, 100);
        assert!(sched.is_active(3));
        let fired = sched.pop_due();
        assert_eq!(fired, Some(3));
        assert_eq!(sched.now(), 100);
        assert!(!sched.is_active(3));
    }

    #[test]
    fn cancel_suppresses_a_stale_fire() {
        let mut sched = SimScheduler::new();
        sched.arm(1, 10);
        sched.cancel(1);
        sched.arm(1, 20);
        // Only one live entry should ever fire for unit 1.
        let mut fires = 0;
        while sched.pop_due().is_some() {
            fires += 1;
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn rearming_replaces_the_previous_timer() {
        let mut sched = SimScheduler::new();
        sched.arm(2, 5);
        sched.arm(2, 50);
        let fired = sched.pop_due();
        assert_eq!(fired, Some(2));
        assert_eq!(sched.now(), 50);
    }

    #[test]
    fn run_until_invokes_callback_for_each_due_unit() {
        let mut sched = SimScheduler::new();
        sched.arm(0, 10);
        sched.arm(1, 20);
        let mut order = Vec::new();
        sched.run_until(100, |_s, unit| order.push(unit));
        assert_eq!(order, vec![0, 1]);
    }
}
