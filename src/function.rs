//! Function Executor: new-function dispatch when a unit reaches speed
//! (§4.3), the timer-expiry service routine (§4.4), end-zone scheduling
//! (§4.7), the error setter (§4.8), deselect (§4.9), and controller-wide
//! reset (§4.10).
//!
//! Scheduling here is sparse, not per-line: each dispatch computes the line
//! distance to the next event (end of block, next word, next search target,
//! off-reel) and arms exactly one timer for it, mirroring `dt_newfnc`'s
//! `sim_activate` calls in the original rather than ticking every line.

use crate::checksum;
use crate::config::{LogFlags, Timings};
use crate::geometry::{self, Format};
use crate::scheduler::Scheduler;
use crate::state::{FunctionCode, MotionCode, StatePair};
use crate::unit::{PositionUpdate, Substate, TapeUnit};

const MASK18: u32 = 0o777_777;

/// Flags the Function Executor raises on the host-visible status registers.
/// The Controller owns the actual register bits; this is the vocabulary it
/// is told to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostFlags {
    /// Data Transfer Flag: a word is ready (read) or was consumed (write).
    pub dtf: bool,
    /// Block End Flag: the unit just crossed a block boundary.
    pub bef: bool,
    /// Error Flag, paired with an [`ErrorCode`].
    pub erf: Option<ErrorCode>,
}

/// Error conditions the original exposed via DTB's error bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid unit, unattached, write-lock violation, WRITE-MARK request,
    /// or a state-machine invariant violation.
    SelectError,
    /// Motion drove (or would drive) into the wrong-direction end zone
    /// while executing a positional function.
    EndOfTape,
    /// The host failed to clear DTF before the next word became ready.
    TimingError,
}

/// Outcome of one function-execution event, handed back to the Controller
/// so it can update the data buffer / status-B / interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepResult {
    pub host: HostFlags,
    /// A data word produced by a READ/SEARCH step, for the Controller to
    /// latch into the data buffer.
    pub word_out: Option<u32>,
}

/// Dispatch a function that just became current because the unit reached
/// speed (state-queue case 7, or the transition out of ACCEL). `word_in`
/// supplies the word a WRITE step currently holds in the data buffer, if any
/// (unused on first dispatch; the host hasn't had a chance to stage one
/// yet except via the immediate DTF this call raises for WRITE).
pub fn dispatch_at_speed(
    unit: &mut TapeUnit,
    sched: &mut impl Scheduler,
    timings: Timings,
    log: LogFlags,
    function: FunctionCode,
    word_in: Option<u32>,
) -> StepResult {
    let prev_pos = unit.pos;
    let update = unit.update_position(sched.now(), timings);
    if update == PositionUpdate::OffReel {
        return handle_off_reel(function);
    }
    if unit.pos == prev_pos {
        bump_one_line(unit);
    }

    let format = unit.format();
    let reverse = unit.state.current_motion().is_reverse();
    let wrong_zone = if reverse {
        geometry::in_reverse_end_zone(unit.pos)
    } else {
        geometry::in_forward_end_zone(unit.pos, format)
    };
    if wrong_zone {
        let host = raise_error(unit, sched, timings, ErrorCode::EndOfTape);
        return StepResult { host, word_out: None };
    }

    unit.state.set_current(StatePair::new(unit.state.current_motion(), function));
    unit.substate = Substate::BlockStart;
    log_dispatch(unit, log, function);

    sched.cancel(unit.id());
    match function {
        FunctionCode::OffReel => {
            sched.arm(unit.id(), off_reel_delay(unit.pos, reverse, format, timings));
            StepResult::default()
        }
        FunctionCode::Move => {
            sched.arm(unit.id(), move_delay(unit.pos, reverse, format, timings));
            StepResult::default()
        }
        FunctionCode::Search => {
            sched.arm(unit.id(), search_delay(unit.pos, reverse, format, timings));
            StepResult::default()
        }
        FunctionCode::Read | FunctionCode::ReadAll => {
            sched.arm(unit.id(), word_delay(format, timings));
            StepResult::default()
        }
        FunctionCode::Write | FunctionCode::WriteAll => {
            sched.arm(unit.id(), word_delay(format, timings));
            let _ = word_in;
            StepResult {
                host: HostFlags { dtf: true, ..HostFlags::default() },
                word_out: None,
            }
        }
        FunctionCode::WriteMark => unreachable!("WRITE-MARK is rejected at LOAD COMMAND time"),
    }
}

fn bump_one_line(unit: &mut TapeUnit) {
    if unit.state.current_motion().is_reverse() {
        unit.pos = unit.pos.saturating_sub(1);
    } else {
        unit.pos = unit.pos.saturating_add(1);
    }
}

fn handle_off_reel(function: FunctionCode) -> StepResult {
    if matches!(function, FunctionCode::OffReel) {
        StepResult::default()
    } else {
        StepResult {
            host: HostFlags {
                dtf: true,
                erf: Some(ErrorCode::SelectError),
                ..HostFlags::default()
            },
            word_out: None,
        }
    }
}

/// How far past the physical reel edge OFF-REEL drives the unit, so the
/// Position Model's bounds check (strictly past `max_pos`) actually fires
/// rather than stalling exactly on the boundary.
const OFF_REEL_MARGIN: u32 = 1000;

fn off_reel_delay(pos: u32, reverse: bool, format: Format, timings: Timings) -> u64 {
    let distance = if reverse {
        pos.saturating_add(OFF_REEL_MARGIN)
    } else {
        format.max_pos().saturating_sub(pos).saturating_add(OFF_REEL_MARGIN)
    };
    u64::from(distance) * u64::from(timings.line_time)
}

/// Target position one word inside the opposite end zone for a MOVE headed
/// in the given direction: `END_ZONE_LINES - word_size` reverse,
/// `forward_end_zone + word_size` forward.
fn end_zone_target(reverse: bool, format: Format) -> i64 {
    if reverse {
        i64::from(geometry::END_ZONE_LINES) - i64::from(format.word_size())
    } else {
        i64::from(format.forward_end_zone()) + i64::from(format.word_size())
    }
}

fn move_delay(pos: u32, reverse: bool, format: Format, timings: Timings) -> u64 {
    let target = end_zone_target(reverse, format);
    let distance = (target - i64::from(pos)).unsigned_abs();
    distance * u64::from(timings.line_time)
}

fn search_delay(pos: u32, reverse: bool, format: Format, timings: Timings) -> u64 {
    let block = geometry::line_to_block(pos, format);
    let target_block = if reverse { block - 1 } else { block + 1 };
    let target_line = geometry::block_to_line(target_block, format) + i64::from(geometry::BLOCK_NUMBER_LINE);
    let distance = (target_line - i64::from(pos)).unsigned_abs();
    distance * u64::from(timings.line_time)
}

fn word_delay(format: Format, timings: Timings) -> u64 {
    u64::from(format.word_size()) * u64::from(timings.line_time)
}

fn log_dispatch(unit: &TapeUnit, log: LogFlags, function: FunctionCode) {
    let enabled = match function {
        FunctionCode::Move | FunctionCode::Search => log.move_search,
        FunctionCode::ReadAll | FunctionCode::WriteAll => log.read_all,
        FunctionCode::Read | FunctionCode::Write => log.read_write,
        FunctionCode::OffReel | FunctionCode::WriteMark => false,
    };
    if enabled {
        println!("dectape: unit {} starting {:?}", unit.id(), function);
    }
}

/// Service routine (§4.4): called when a unit's scheduled timer elapses.
/// `dtf_still_set` tells the executor whether the host has yet to clear DTF
/// from the previous event, since TIMING-ERROR hinges on that controller-
/// owned bit.
pub fn service_step(
    unit: &mut TapeUnit,
    sched: &mut impl Scheduler,
    timings: Timings,
    dtf_still_set: bool,
    word_in: Option<u32>,
) -> StepResult {
    let update = unit.update_position(sched.now(), timings);
    if update == PositionUpdate::OffReel {
        return handle_off_reel(unit.state.current.function);
    }

    let function = unit.state.current.function;
    let format = unit.format();
    if geometry::in_end_zone(unit.pos, format) {
        let host = raise_error(unit, sched, timings, ErrorCode::EndOfTape);
        return StepResult { host, word_out: None };
    }

    match function {
        FunctionCode::Move => StepResult::default(),
        FunctionCode::OffReel => StepResult::default(),
        FunctionCode::Search => search_step(unit, sched, timings, dtf_still_set, format),
        FunctionCode::Read | FunctionCode::ReadAll => read_step(unit, sched, timings, dtf_still_set, format, function),
        FunctionCode::Write | FunctionCode::WriteAll => {
            write_step(unit, sched, timings, dtf_still_set, format, function, word_in)
        }
        FunctionCode::WriteMark => {
            let host = raise_error(unit, sched, timings, ErrorCode::SelectError);
            StepResult { host, word_out: None }
        }
    }
}

fn search_step(unit: &mut TapeUnit, sched: &mut impl Scheduler, timings: Timings, dtf_still_set: bool, format: Format) -> StepResult {
    if dtf_still_set {
        let host = raise_error(unit, sched, timings, ErrorCode::TimingError);
        return StepResult { host, word_out: None };
    }
    sched.cancel(unit.id());
    sched.arm(unit.id(), u64::from(format.lines_per_block()) * u64::from(timings.line_time));
    let block = geometry::line_to_block(unit.pos, format).max(0) as u32;
    StepResult {
        host: HostFlags { dtf: true, ..HostFlags::default() },
        word_out: Some(block & MASK18),
    }
}

fn read_step(
    unit: &mut TapeUnit,
    sched: &mut impl Scheduler,
    timings: Timings,
    dtf_still_set: bool,
    format: Format,
    function: FunctionCode,
) -> StepResult {
    if dtf_still_set {
        let host = raise_error(unit, sched, timings, ErrorCode::TimingError);
        return StepResult { host, word_out: None };
    }
    let reverse = unit.state.current_motion().is_reverse();
    let (block, word_span) = block_and_word_span(unit.pos, format);
    sched.cancel(unit.id());
    sched.arm(unit.id(), word_delay(format, timings));

    let htwrd = i64::from(geometry::HEADER_TRAILER_LINES / 6);
    let result = if word_span >= htwrd && word_span < htwrd + i64::from(format.block_words()) {
        let word_idx = word_span - htwrd;
        let image = unit.image().expect("read requires an attached unit");
        let raw = image.read(format, block, word_idx);
        let word = if reverse { checksum::obverse_complement(raw) } else { raw };
        StepResult { host: HostFlags { dtf: true, ..HostFlags::default() }, word_out: Some(word) }
    } else if checksum::is_silent_edge_word(format, word_span as u32) {
        StepResult::default()
    } else {
        let read_all = matches!(function, FunctionCode::ReadAll);
        let is_checksum_slot = {
            let last = 2 * (geometry::HEADER_TRAILER_LINES / 6) + format.block_words() - 1;
            word_span as u32 == geometry::CHECKSUM_LINE / 6 || word_span as u32 == last - geometry::CHECKSUM_LINE / 6
        };
        if !read_all && !is_checksum_slot {
            StepResult::default()
        } else {
            let image = unit.image().expect("read requires an attached unit");
            let raw = checksum::header_word(image, format, block, word_span as u32);
            let word = if reverse { checksum::obverse_complement(raw) } else { raw };
            if word_span as u32 == checksum::end_checksum_word(format, reverse) {
                StepResult { host: HostFlags { bef: true, ..HostFlags::default() }, word_out: Some(word) }
            } else {
                StepResult { host: HostFlags { dtf: true, ..HostFlags::default() }, word_out: Some(word) }
            }
        }
    };
    result
}

fn write_step(
    unit: &mut TapeUnit,
    sched: &mut impl Scheduler,
    timings: Timings,
    dtf_still_set: bool,
    format: Format,
    function: FunctionCode,
    word_in: Option<u32>,
) -> StepResult {
    if dtf_still_set {
        let host = raise_error(unit, sched, timings, ErrorCode::TimingError);
        return StepResult { host, word_out: None };
    }
    let reverse = unit.state.current_motion().is_reverse();
    let (block, word_span) = block_and_word_span(unit.pos, format);
    sched.cancel(unit.id());
    sched.arm(unit.id(), word_delay(format, timings));

    let htwrd = i64::from(geometry::HEADER_TRAILER_LINES / 6);
    if word_span >= htwrd && word_span < htwrd + i64::from(format.block_words()) {
        let word_idx = word_span - htwrd;
        if let Some(value) = word_in {
            let stored = if reverse { checksum::obverse_complement(value) } else { value };
            let image = unit.image_mut().expect("write requires an attached unit");
            image.write(format, block, word_idx, stored);
        }
        let is_end_word = if reverse { word_idx == 0 } else { word_idx == i64::from(format.block_words()) - 1 };
        return if is_end_word {
            StepResult { host: HostFlags { bef: true, ..HostFlags::default() }, word_out: None }
        } else {
            StepResult { host: HostFlags { dtf: true, ..HostFlags::default() }, word_out: None }
        };
    }

    if checksum::is_silent_edge_word(format, word_span as u32) {
        return StepResult::default();
    }
    let write_all = matches!(function, FunctionCode::WriteAll);
    let forward_checksum_slot = word_span as u32 == checksum::end_checksum_word(format, false);
    if write_all || forward_checksum_slot {
        StepResult { host: HostFlags { dtf: true, ..HostFlags::default() }, word_out: None }
    } else {
        StepResult::default()
    }
}

fn block_and_word_span(pos: u32, format: Format) -> (i64, i64) {
    let coords = geometry::line_to_coords(pos, format);
    (coords.block, coords.offset_in_block / i64::from(format.word_size()))
}

/// Error setter (§4.8): raise `code`, decelerating the unit to a stop if it
/// was moving (accelerating or faster).
pub fn raise_error(unit: &mut TapeUnit, sched: &mut impl Scheduler, timings: Timings, code: ErrorCode) -> HostFlags {
    let motion = unit.state.current_motion();
    if motion.is_accel_or_faster() {
        unit.update_position(sched.now(), timings);
        sched.cancel(unit.id());
        sched.arm(unit.id(), u64::from(timings.decel_time));
        unit.state.set_current(StatePair::new(MotionCode::decel(motion.is_reverse()), FunctionCode::Move));
    } else {
        unit.state.set_current(StatePair::new(motion, FunctionCode::Move));
    }
    unit.state.clear_queue();
    HostFlags {
        dtf: true,
        erf: Some(code),
        ..HostFlags::default()
    }
}

/// Deselect (§4.9): if `unit` is at speed, immediately retarget it to
/// OFF-REEL (scheduling the off-reel timer); if merely accelerating, queue
/// OFF-REEL as the next state.
pub fn deselect(unit: &mut TapeUnit, sched: &mut impl Scheduler, timings: Timings, log: LogFlags) {
    if unit.is_at_speed() {
        dispatch_at_speed(unit, sched, timings, log, FunctionCode::OffReel, None);
    } else {
        unit.deselect();
    }
}

/// Controller-wide reset (§4.10, grounded in `dt_reset`): every unit that is
/// moving is steered toward a stop (decelerating in its current direction)
/// and its queue is cleared; a unit that is already stopped is left alone.
/// No error bits are raised and no unit is detached — this differs from
/// cold-start, which additionally detaches everything.
pub fn reset_unit(unit: &mut TapeUnit, sched: &mut impl Scheduler, timings: Timings) {
    let motion = unit.state.current_motion();
    unit.state.clear_queue();
    if !motion.is_moving() {
        return;
    }
    if !motion.is_decel() {
        sched.cancel(unit.id());
        sched.arm(unit.id(), u64::from(timings.decel_time));
        unit.state
            .set_current(StatePair::new(MotionCode::decel(motion.is_reverse()), FunctionCode::Move));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitConfig;
    use crate::scheduler::SimScheduler;

    fn attached_unit() -> TapeUnit {
        let mut u = TapeUnit::new(0, UnitConfig::default());
        u.attach(Format::Bit18, vec![0; Format::Bit18.capacity_words() as usize], 0, 0);
        u
    }

    #[test]
    fn dispatch_read_arms_one_word_delay() {
        let mut u = attached_unit();
        u.pos = geometry::block_to_line(0, Format::Bit18) as u32 + geometry::HEADER_TRAILER_LINES;
        u.state.set_current(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Move));
        let mut sched = SimScheduler::new();
        dispatch_at_speed(&mut u, &mut sched, Timings::DEFAULT, LogFlags::default(), FunctionCode::Read, None);
        assert!(sched.is_active(0));
    }

    #[test]
    fn read_step_surfaces_word_and_dtf() {
        let mut u = attached_unit();
        u.image_mut().unwrap().write(Format::Bit18, 0, 3, 0o42);
        u.pos = geometry::block_to_line(0, Format::Bit18) as u32
            + geometry::HEADER_TRAILER_LINES
            + 3 * Format::Bit18.word_size();
        u.state.set_current(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Read));
        let mut sched = SimScheduler::new();
        let result = service_step(&mut u, &mut sched, Timings::DEFAULT, false, None);
        assert_eq!(result.word_out, Some(0o42));
        assert!(result.host.dtf);
    }

    #[test]
    fn timing_error_when_dtf_still_set() {
        let mut u = attached_unit();
        u.pos = geometry::block_to_line(0, Format::Bit18) as u32 + geometry::HEADER_TRAILER_LINES;
        u.state.set_current(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Read));
        let mut sched = SimScheduler::new();
        let result = service_step(&mut u, &mut sched, Timings::DEFAULT, true, None);
        assert_eq!(result.host.erf, Some(ErrorCode::TimingError));
    }

    #[test]
    fn raise_error_decelerates_a_moving_unit() {
        let mut u = attached_unit();
        u.state.set_current(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Read));
        let mut sched = SimScheduler::new();
        let flags = raise_error(&mut u, &mut sched, Timings::DEFAULT, ErrorCode::EndOfTape);
        assert_eq!(flags.erf, Some(ErrorCode::EndOfTape));
        assert_eq!(u.state.current.motion, MotionCode::DecelFwd);
    }

    #[test]
    fn reset_decelerates_a_moving_unit_and_clears_queue() {
        let mut u = attached_unit();
        u.state.set_current(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Read));
        u.state.set_next(StatePair::new(MotionCode::AtSpeedFwd, FunctionCode::Read));
        let mut sched = SimScheduler::new();
        reset_unit(&mut u, &mut sched, Timings::DEFAULT);
        assert_eq!(u.state.current.motion, MotionCode::DecelFwd);
        assert!(u.state.next.is_none());
        assert!(sched.is_active(0));
    }

    #[test]
    fn reset_leaves_a_stopped_unit_alone() {
        let mut u = attached_unit();
        let mut sched = SimScheduler::new();
        reset_unit(&mut u, &mut sched, Timings::DEFAULT);
        assert_eq!(u.state.current.motion, MotionCode::Stop);
        assert!(!sched.is_active(0));
    }

    #[test]
    fn search_delay_targets_next_blocks_block_number_word() {
        let format = Format::Bit18;
        let pos = geometry::block_to_line(2, format) as u32 + geometry::HEADER_TRAILER_LINES;
        let delay = search_delay(pos, false, format, Timings::DEFAULT);
        let target = geometry::block_to_line(3, format) as u32 + geometry::BLOCK_NUMBER_LINE;
        assert_eq!(delay, u64::from(target.abs_diff(pos)) * u64::from(Timings::DEFAULT.line_time));
    }
}
