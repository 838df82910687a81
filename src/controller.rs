//! Controller Registers & Command Dispatch (§4.1): the selected-unit
//! register, the motion/function command register, the data buffer, status
//! flags, and the five I/O pulses (SELECT UNIT, LOAD COMMAND, READ DATA,
//! WRITE DATA, READ STATUS).

use crate::config::Config;
use crate::function::{self, ErrorCode, HostFlags};
use crate::geometry::Format;
use crate::scheduler::{Scheduler, UnitId};
use crate::state::{FunctionCode, MotionCode};
use crate::unit::TapeUnit;

const MASK18: u32 = 0o777_777;

/// Mask of the register bits LOAD COMMAND replaces (motion + function,
/// `DTA_RW` in the original: bits 0-2 function, bits 4-5 motion).
const RW_MASK: u32 = 0o77;

/// I/O pulse codes, 3..=7. Anything outside this range is a no-op (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    SelectUnit,
    LoadCommand,
    ReadData,
    WriteData,
    ReadStatus,
}

impl Pulse {
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            3 => Some(Self::SelectUnit),
            4 => Some(Self::LoadCommand),
            5 => Some(Self::ReadData),
            6 => Some(Self::WriteData),
            7 => Some(Self::ReadStatus),
            _ => None,
        }
    }
}

/// Status-B flag bits, mirroring `DTB_*` one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusB {
    pub dtf: bool,
    pub bef: bool,
    pub erf: bool,
    pub end_of_tape: bool,
    pub timing_error: bool,
    pub reverse: bool,
    pub go: bool,
    pub mark_track_error: bool,
    pub select_error: bool,
}

impl StatusB {
    fn clear_on_select_or_load(&mut self) {
        self.dtf = false;
        self.bef = false;
        self.erf = false;
        self.end_of_tape = false;
        self.timing_error = false;
        self.mark_track_error = false;
        self.select_error = false;
    }

    fn apply(&mut self, host: HostFlags) {
        if host.dtf {
            self.dtf = true;
        }
        if host.bef {
            self.bef = true;
        }
        if let Some(code) = host.erf {
            self.erf = true;
            match code {
                ErrorCode::SelectError => self.select_error = true,
                ErrorCode::EndOfTape => self.end_of_tape = true,
                ErrorCode::TimingError => self.timing_error = true,
            }
        }
    }

    #[must_use]
    pub const fn interrupt_pending(&self) -> bool {
        self.dtf || self.bef || self.erf
    }

    /// The device-specific IORS status-mask bit (§6): set when DTF or ERF.
    #[must_use]
    pub const fn iors_bit(&self) -> bool {
        self.dtf || self.erf
    }
}

/// Maps the Type 550's 4-bit select field (016) to a unit index or "invalid":
/// 0 and 9..15 are invalid; 1..7 map to themselves; 8 maps to unit 0.
#[must_use]
pub const fn map_select(raw: u8) -> Option<u8> {
    match raw {
        1..=7 => Some(raw),
        8 => Some(0),
        _ => None,
    }
}

#[must_use]
const fn function_from_bits(bits: u8) -> Option<FunctionCode> {
    match bits & 0o7 {
        0 => Some(FunctionCode::Move),
        1 => Some(FunctionCode::Search),
        2 => Some(FunctionCode::Read),
        3 => Some(FunctionCode::Write),
        5 => Some(FunctionCode::ReadAll),
        6 => Some(FunctionCode::WriteAll),
        7 => Some(FunctionCode::WriteMark),
        _ => None,
    }
}

/// The eight-unit DECtape controller core.
///
/// Not itself `Serialize`/`Deserialize` — see [`crate::snapshot`] for the
/// persisted-state surface under the `save-state` feature.
#[derive(Debug, Clone)]
pub struct Controller {
    units: [TapeUnit; 8],
    select_raw: u8,
    requested_moving: bool,
    requested_reverse: bool,
    requested_fnc_bits: u8,
    data_buffer: u32,
    status_b: StatusB,
    pub config: Config,
}

impl Controller {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let units = std::array::from_fn(|i| TapeUnit::new(i as UnitId, Default::default()));
        Self {
            units,
            select_raw: 0,
            requested_moving: false,
            requested_reverse: false,
            requested_fnc_bits: 0,
            data_buffer: 0,
            status_b: StatusB::default(),
            config,
        }
    }

    #[must_use]
    pub fn unit(&self, id: UnitId) -> &TapeUnit {
        &self.units[id as usize]
    }

    #[must_use]
    pub fn unit_mut(&mut self, id: UnitId) -> &mut TapeUnit {
        &mut self.units[id as usize]
    }

    #[must_use]
    pub fn selected(&self) -> Option<UnitId> {
        map_select(self.select_raw)
    }

    #[must_use]
    pub const fn status_b(&self) -> StatusB {
        self.status_b
    }

    #[must_use]
    pub const fn data_buffer(&self) -> u32 {
        self.data_buffer
    }

    /// Drive one host I/O pulse. Returns the (possibly modified) data value.
    pub fn pulse(&mut self, sched: &mut impl Scheduler, code: u8, data: u32) -> u32 {
        if self.config.device_disabled {
            return data;
        }
        let Some(pulse) = Pulse::from_code(code) else {
            return data; // unrecognised pulse: no-op (§7)
        };

        let out = match pulse {
            Pulse::SelectUnit => {
                self.select_unit(sched, data);
                data
            }
            Pulse::LoadCommand => {
                self.load_command(sched, data);
                data
            }
            Pulse::ReadData => {
                self.status_b.dtf = false;
                self.status_b.bef = false;
                (data & !MASK18) | self.data_buffer
            }
            Pulse::WriteData => {
                self.data_buffer = data & MASK18;
                self.status_b.dtf = false;
                self.status_b.bef = false;
                data
            }
            Pulse::ReadStatus => self.read_status(data),
        };

        out
    }

    fn select_unit(&mut self, sched: &mut impl Scheduler, data: u32) {
        let new_raw = ((data >> 12) & 0o17) as u8;
        if new_raw != self.select_raw {
            if let Some(old_id) = map_select(self.select_raw) {
                let timings = self.config.timings;
                let log = self.config.log;
                function::deselect(self.unit_mut(old_id), sched, timings, log);
            }
        }
        self.select_raw = new_raw;
        self.status_b.clear_on_select_or_load();
    }

    fn load_command(&mut self, sched: &mut impl Scheduler, data: u32) {
        let rw = (data as u8) & RW_MASK as u8;
        self.requested_fnc_bits = rw & 0o7;
        let mot_bits = (rw >> 4) & 0o3;
        self.requested_moving = mot_bits & 0o2 != 0; // DTA_STSTP set => go
        self.requested_reverse = mot_bits & 0o1 != 0; // DTA_FWDRV set => reverse

        self.status_b.clear_on_select_or_load();

        let selected = self.selected();
        let fnc = function_from_bits(self.requested_fnc_bits);

        let invalid = match (selected, fnc) {
            (None, _) => true,
            (_, None) => true,
            (Some(id), Some(f)) => {
                let unit = self.unit(id);
                !unit.is_attached()
                    || matches!(f, FunctionCode::WriteMark)
                    || (matches!(f, FunctionCode::Write | FunctionCode::WriteAll) && unit.write_locked())
            }
        };

        if invalid {
            let timings = self.config.timings;
            let host = match selected {
                Some(id) => function::raise_error(self.unit_mut(id), sched, timings, ErrorCode::SelectError),
                None => HostFlags {
                    erf: Some(ErrorCode::SelectError),
                    ..HostFlags::default()
                },
            };
            self.status_b.apply(host);
            return;
        }

        let id = selected.unwrap();
        let fnc = fnc.unwrap();
        let moving = self.requested_moving;
        let reverse = self.requested_reverse;
        let timings = self.config.timings;
        let log = self.config.log;
        let unit = self.unit_mut(id);
        if let Some(deferred) = unit.apply_command(sched, timings, moving, reverse, fnc) {
            let host = function::dispatch_at_speed(unit, sched, timings, log, deferred, None).host;
            self.status_b.apply(host);
        }
    }

    fn read_status(&mut self, data: u32) -> u32 {
        self.status_b.reverse = false;
        self.status_b.go = false;
        if let Some(id) = self.selected() {
            let unit = self.unit(id);
            let motion = unit.state.current_motion();
            if motion.is_reverse() {
                self.status_b.reverse = true;
            }
            if motion.is_accel_or_faster() || unit.state.has_queued_slot() {
                self.status_b.go = true;
            }
        }
        (data & !MASK18) | self.pack_status_b()
    }

    fn pack_status_b(&self) -> u32 {
        let b = self.status_b;
        (u32::from(b.dtf) << 17)
            | (u32::from(b.bef) << 16)
            | (u32::from(b.erf) << 15)
            | (u32::from(b.end_of_tape) << 14)
            | (u32::from(b.timing_error) << 13)
            | (u32::from(b.reverse) << 12)
            | (u32::from(b.go) << 11)
            | (u32::from(b.mark_track_error) << 10)
            | (u32::from(b.select_error) << 9)
    }

    /// Run the per-unit service routine for a timer that just fired,
    /// dispatching through the motion-phase cases of §4.4.
    pub fn service(&mut self, sched: &mut impl Scheduler, unit_id: UnitId, word_in: Option<u32>) {
        let timings = self.config.timings;
        let log = self.config.log;
        let motion = self.unit(unit_id).state.current_motion();

        let (host, word_out) = match motion {
            MotionCode::Stop => return,
            MotionCode::DecelFwd | MotionCode::DecelRev => {
                let unit = self.unit_mut(unit_id);
                unit.update_position(sched.now(), timings);
                unit.state.advance();
                let new_motion = unit.state.current_motion();
                if new_motion.is_moving() {
                    sched.cancel(unit_id);
                    sched.arm(unit_id, u64::from(timings.accel_time));
                }
                (HostFlags::default(), None)
            }
            MotionCode::AccelFwd | MotionCode::AccelRev => {
                let unit = self.unit_mut(unit_id);
                let next = unit.state.next.unwrap_or_else(|| {
                    crate::state::StatePair::new(unit.state.current_motion(), FunctionCode::Move)
                });
                // Settle the accel-phase distance while motion is still ACCEL,
                // before advance() flips current to ATSPEED - otherwise this
                // ramp's elapsed time would be costed at the (faster) at-speed
                // rate. dispatch_at_speed's own update_position then sees zero
                // elapsed and takes the guaranteed-progress one-line bump.
                unit.update_position(sched.now(), timings);
                unit.state.advance();
                let step = function::dispatch_at_speed(unit, sched, timings, log, next.function, word_in);
                (step.host, step.word_out)
            }
            MotionCode::AtSpeedFwd | MotionCode::AtSpeedRev => {
                let dtf_still_set = self.status_b.dtf;
                let unit = self.unit_mut(unit_id);
                let step = function::service_step(unit, sched, timings, dtf_still_set, word_in);
                (step.host, step.word_out)
            }
        };

        // The data buffer is a shared register the selected unit dominates
        // (§5); a background unit's SEARCH/READ word never overwrites it.
        if let Some(word) = word_out {
            if self.selected() == Some(unit_id) {
                self.data_buffer = word;
            }
        }
        self.status_b.apply(host);
    }

    /// Controller-wide reset (§4.10). Distinct from [`Controller::cold_start`].
    pub fn reset(&mut self, sched: &mut impl Scheduler) {
        let timings = self.config.timings;
        for unit in &mut self.units {
            function::reset_unit(unit, sched, timings);
        }
        self.select_raw = 0;
        self.requested_moving = false;
        self.requested_reverse = false;
        self.requested_fnc_bits = 0;
        self.data_buffer = 0;
        self.status_b = StatusB::default();
    }

    /// Cold-start (no prior run in progress): cancel every timer, zero every
    /// unit's layered state, and stamp `last_time = now()`. Unlike
    /// [`Controller::reset`], units are not eased into a decel — everything
    /// simply stops where it is.
    pub fn cold_start(&mut self, sched: &mut impl Scheduler) {
        let now = sched.now();
        for unit in &mut self.units {
            sched.cancel(unit.id());
            unit.state = crate::state::LayeredState::stopped();
            unit.last_time = now;
        }
        self.select_raw = 0;
        self.status_b = StatusB::default();
        self.data_buffer = 0;
    }

    /// Core-side attach orchestration: mount a decoded word buffer onto
    /// `unit_id`.
    pub fn attach_unit(&mut self, sched: &impl Scheduler, unit_id: UnitId, format: Format, words: Vec<u32>, hwmark: u32) {
        self.unit_mut(unit_id).attach(format, words, hwmark, sched.now());
    }

    /// Core-side detach orchestration (§6 Detach contract): cancels motion,
    /// raises SELECT-ERROR + DTF if the unit was selected and moving, then
    /// hands back the image for a codec to write out (the caller decides
    /// whether to skip write-out for a read-only mount).
    pub fn detach_unit(&mut self, sched: &mut impl Scheduler, unit_id: UnitId) -> Option<crate::image::TapeImage> {
        sched.cancel(unit_id);
        let was_moving = self.unit(unit_id).state.current_motion().is_moving();
        if self.selected() == Some(unit_id) && was_moving {
            let timings = self.config.timings;
            let host = function::raise_error(self.unit_mut(unit_id), sched, timings, ErrorCode::SelectError);
            self.status_b.apply(host);
            sched.cancel(unit_id);
        }
        self.unit_mut(unit_id).begin_detach()
    }
}

#[cfg(feature = "save-state")]
impl Controller {
    /// Capture a snapshot of the live controller, including every unit's
    /// tape image. Carries no scheduler state.
    #[must_use]
    pub fn snapshot(&self) -> crate::snapshot::ControllerSnapshot {
        crate::snapshot::ControllerSnapshot {
            units: self.units.iter().map(TapeUnit::snapshot).collect(),
            select_raw: self.select_raw,
            requested_moving: self.requested_moving,
            requested_reverse: self.requested_reverse,
            requested_fnc_bits: self.requested_fnc_bits,
            data_buffer: self.data_buffer,
            status_b: self.status_b,
            config: self.config,
        }
    }

    /// Rebuild a controller from a previously captured snapshot. The caller
    /// is responsible for re-arming a timer for any unit whose motion is
    /// still moving, against its own scheduler.
    #[must_use]
    pub fn from_snapshot(snapshot: crate::snapshot::ControllerSnapshot) -> Self {
        let mut units_iter = snapshot.units.into_iter();
        let units = std::array::from_fn(|i| {
            let u = units_iter
                .next()
                .expect("a ControllerSnapshot always carries exactly 8 units");
            TapeUnit::from_snapshot(i as UnitId, u)
        });
        Self {
            units,
            select_raw: snapshot.select_raw,
            requested_moving: snapshot.requested_moving,
            requested_reverse: snapshot.requested_reverse,
            requested_fnc_bits: snapshot.requested_fnc_bits,
            data_buffer: snapshot.data_buffer,
            status_b: snapshot.status_b,
            config: snapshot.config,
        }
    }
}
