//! The Tape Unit and its two single-unit state machines: the Position
//! Model (continuous line position, updated lazily from elapsed scheduler
//! time) and the command-transition classifier that turns a newly loaded
//! command into a layered-state transition.

use crate::config::{Timings, UnitConfig};
use crate::geometry::{self, Format};
use crate::image::TapeImage;
use crate::kinematics::{self, Phase};
use crate::scheduler::{Scheduler, UnitId};
use crate::state::{FunctionCode, LayeredState, MotionCode, StatePair};

/// One of the eight tape transports.
///
/// Not itself `Serialize`/`Deserialize` — see [`crate::snapshot::UnitSnapshot`]
/// under the `save-state` feature.
#[derive(Debug, Clone)]
pub struct TapeUnit {
    id: UnitId,
    pub config: UnitConfig,
    attached: bool,
    /// Current line position. Always 0 when not attached.
    pub pos: u32,
    pub state: LayeredState,
    /// Scheduler timestamp `pos` was last advanced at.
    pub last_time: u64,
    image: Option<TapeImage>,
    /// Small scratch flag set by the Function Executor at the start of each
    /// function dispatch.
    pub substate: Substate,
}

/// Function-execution scratch state (§3: "substate").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub enum Substate {
    #[default]
    BlockStart,
    WordCountOverflow,
}

/// Outcome of a Position Model update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUpdate {
    /// No scheduler time elapsed; `pos` is unchanged.
    NoChange,
    /// `pos` advanced within bounds.
    Advanced,
    /// The tape walked off the reel: the unit has been zeroed and detached.
    OffReel,
}

impl TapeUnit {
    #[must_use]
    pub fn new(id: UnitId, config: UnitConfig) -> Self {
        Self {
            id,
            config,
            attached: false,
            pos: 0,
            state: LayeredState::stopped(),
            last_time: 0,
            image: None,
            substate: Substate::BlockStart,
        }
    }

    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    #[must_use]
    pub fn image(&self) -> Option<&TapeImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn image_mut(&mut self) -> Option<&mut TapeImage> {
        self.image.as_mut()
    }

    #[must_use]
    pub const fn format(&self) -> Format {
        self.config.format
    }

    #[must_use]
    pub const fn write_locked(&self) -> bool {
        self.config.write_locked
    }

    // -- Attach/Detach core-side orchestration (the collaborator supplies
    // already-decoded words; see crate::attach and crate::codec) --------

    /// Mount a decoded word buffer as this unit's tape image. Per the
    /// attach contract: position starts just past the reverse leader, and
    /// `last_time` is set to now so the first Position Model update sees
    /// zero elapsed time.
    pub fn attach(&mut self, format: Format, words: Vec<u32>, hwmark: u32, now: u64) {
        self.config.format = format;
        self.image = Some(TapeImage::from_words(words, hwmark));
        self.attached = true;
        self.pos = geometry::END_ZONE_LINES;
        self.last_time = now;
        self.state = LayeredState::stopped();
    }

    /// Core-side half of detach: cancel is the caller's job (it owns the
    /// scheduler); this clears the unit and hands back the image so a codec
    /// can write it out. Returns `None` if not attached.
    pub fn begin_detach(&mut self) -> Option<TapeImage> {
        self.attached = false;
        self.pos = 0;
        self.state = LayeredState::stopped();
        self.image.take()
    }

    // -- Position Model (§4.5) -------------------------------------------

    /// Advance `pos` by the elapsed time since `last_time`, per the current
    /// motion phase. If the tape would walk off the reel, detaches the unit
    /// and returns [`PositionUpdate::OffReel`] — the caller (the
    /// Controller) is responsible for raising SELECT-ERROR if this unit was
    /// selected.
    pub fn update_position(&mut self, now: u64, timings: Timings) -> PositionUpdate {
        let elapsed = now.saturating_sub(self.last_time);
        if elapsed == 0 {
            return PositionUpdate::NoChange;
        }
        self.last_time = now;

        let motion = self.state.current_motion();
        let phase = Phase::of(motion);
        let delta = kinematics::advance_lines(phase, elapsed, timings) as i64;
        let signed_delta = if motion.is_reverse() { -delta } else { delta };
        let new_pos = i64::from(self.pos) + signed_delta;

        let max_pos = i64::from(self.format().max_pos());
        if new_pos < 0 || new_pos > max_pos {
            self.begin_detach();
            return PositionUpdate::OffReel;
        }
        self.pos = new_pos as u32;
        PositionUpdate::Advanced
    }

    // -- Command transition classifier (§4.2) -----------------------------

    /// Classify and apply a newly loaded (moving?, direction, function)
    /// command against the unit's current layered state. Only called once
    /// the command has already passed validation (attached, not
    /// write-mark, etc.) at the controller level.
    ///
    /// Returns `Some(function)` only in case 7 ("at speed, same direction,
    /// new function") — the caller must invoke the Function Executor's
    /// at-speed dispatch directly with that function; every other case is
    /// fully handled here (timers armed via `sched`, layered state set).
    pub fn apply_command(
        &mut self,
        sched: &mut impl Scheduler,
        timings: Timings,
        new_moving: bool,
        new_dir_reverse: bool,
        new_fnc: FunctionCode,
    ) -> Option<FunctionCode> {
        let prev_motion = self.state.current_motion();
        let prev_moving = prev_motion.is_moving();
        let prev_dir_reverse = prev_motion.is_reverse();

        if !prev_moving && !new_moving {
            return None; // case 1: stop -> stop
        }

        if new_moving && !prev_moving {
            // case 2: stop -> moving
            self.update_position(sched.now(), timings);
            sched.cancel(self.id);
            sched.arm(self.id, u64::from(timings.accel_time));
            self.state
                .set_current(StatePair::new(MotionCode::accel(new_dir_reverse), FunctionCode::Move));
            self.state
                .set_next(StatePair::new(MotionCode::at_speed(new_dir_reverse), new_fnc));
            return None;
        }

        if prev_moving && !new_moving {
            // case 3: moving -> stop
            if !prev_motion.is_decel() {
                self.update_position(sched.now(), timings);
                sched.cancel(self.id);
                sched.arm(self.id, u64::from(timings.decel_time));
            }
            self.state
                .set_current(StatePair::new(MotionCode::decel(prev_dir_reverse), FunctionCode::Move));
            return None;
        }

        if prev_dir_reverse != new_dir_reverse {
            // case 4: direction change
            if !prev_motion.is_decel() {
                self.update_position(sched.now(), timings);
                sched.cancel(self.id);
                sched.arm(self.id, u64::from(timings.decel_time));
            }
            self.state
                .set_current(StatePair::new(MotionCode::decel(prev_dir_reverse), FunctionCode::Move));
            self.state
                .set_next(StatePair::new(MotionCode::accel(new_dir_reverse), FunctionCode::Move));
            self.state
                .set_next_next(StatePair::new(MotionCode::at_speed(new_dir_reverse), new_fnc));
            return None;
        }

        if !prev_motion.is_accel_or_faster() {
            // case 5: still effectively stopped/decel in same direction - shouldn't
            // reach here given the branches above, but mirrors the original's
            // "not accel or at speed" guard for robustness.
            self.update_position(sched.now(), timings);
            sched.cancel(self.id);
            sched.arm(self.id, u64::from(timings.accel_time));
            self.state
                .set_current(StatePair::new(MotionCode::accel(new_dir_reverse), FunctionCode::Move));
            self.state
                .set_next(StatePair::new(MotionCode::at_speed(new_dir_reverse), new_fnc));
            return None;
        }

        if !prev_motion.is_at_speed() {
            // case 6: accelerating, not yet at speed
            self.state
                .set_next(StatePair::new(MotionCode::at_speed(new_dir_reverse), new_fnc));
            return None;
        }

        // case 7: at speed, same direction, new function - defer to Function Executor.
        Some(new_fnc)
    }

    /// Deselect handling (§4.9): a unit that is losing selection while
    /// still moving is steered toward OFF-REEL so it eventually auto-detaches.
    pub fn deselect(&mut self) {
        let motion = self.state.current_motion();
        if motion.is_at_speed() {
            // Handled by the caller invoking Function Executor dispatch with
            // OFF-REEL; this function only sets up the accelerating case.
        } else if motion.is_accel_or_faster() {
            let reverse = motion.is_reverse();
            self.state
                .set_next(StatePair::new(MotionCode::at_speed(reverse), FunctionCode::OffReel));
        }
        // stopped or decelerating: nothing to do.
    }

    /// `true` if this unit is at speed (used by the caller to decide whether
    /// `deselect` needs an immediate Function Executor dispatch for OFF-REEL).
    #[must_use]
    pub fn is_at_speed(&self) -> bool {
        self.state.current_motion().is_at_speed()
    }
}

#[cfg(feature = "save-state")]
impl TapeUnit {
    /// Capture this unit's state, including a copy of its tape image.
    #[must_use]
    pub fn snapshot(&self) -> crate::snapshot::UnitSnapshot {
        crate::snapshot::UnitSnapshot {
            config: self.config,
            attached: self.attached,
            pos: self.pos,
            state: self.state,
            last_time: self.last_time,
            substate: self.substate,
            image_words: self.image.as_ref().map(|img| img.words().to_vec()),
            image_hwmark: self.image.as_ref().map(TapeImage::hwmark),
        }
    }

    /// Rebuild a unit from a previously captured snapshot.
    #[must_use]
    pub fn from_snapshot(id: UnitId, snapshot: crate::snapshot::UnitSnapshot) -> Self {
        let image = match (snapshot.image_words, snapshot.image_hwmark) {
            (Some(words), Some(hwmark)) => Some(TapeImage::from_words(words, hwmark)),
            _ => None,
        };
        Self {
            id,
            config: snapshot.config,
            attached: snapshot.attached,
            pos: snapshot.pos,
            state: snapshot.state,
            last_time: snapshot.last_time,
            image,
            substate: snapshot.substate,
        }
    }
}
