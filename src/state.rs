//! Motion/function codes and the layered state queue.
//!
//! The original controller packs three 6-bit (motion, function) pairs into
//! one 18-bit word — current, next, and next-next. This implementation
//! keeps the same semantics but represents it as an explicit fixed-length
//! queue of up to three `(MotionCode, FunctionCode)` records instead of a
//! bit-packed integer.

/// 3-bit motion code. The low bit of the numeric encoding is the direction
/// flag (0 = forward, 1 = reverse) for every pair except `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionCode {
    Stop,
    DecelFwd,
    DecelRev,
    AccelFwd,
    AccelRev,
    AtSpeedFwd,
    AtSpeedRev,
}

impl MotionCode {
    /// Direction bit: `true` for reverse motion codes, `false` for forward
    /// or stopped.
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Self::DecelRev | Self::AccelRev | Self::AtSpeedRev)
    }

    #[must_use]
    pub const fn is_moving(self) -> bool {
        !matches!(self, Self::Stop)
    }

    #[must_use]
    pub const fn is_at_speed(self) -> bool {
        matches!(self, Self::AtSpeedFwd | Self::AtSpeedRev)
    }

    #[must_use]
    pub const fn is_decel(self) -> bool {
        matches!(self, Self::DecelFwd | Self::DecelRev)
    }

    /// At or past the acceleration phase (accelerating or at speed).
    #[must_use]
    pub const fn is_accel_or_faster(self) -> bool {
        matches!(
            self,
            Self::AccelFwd | Self::AccelRev | Self::AtSpeedFwd | Self::AtSpeedRev
        )
    }

    /// The decel code in this motion's current direction. Panics on `Stop`.
    #[must_use]
    pub const fn decel(reverse: bool) -> Self {
        if reverse {
            Self::DecelRev
        } else {
            Self::DecelFwd
        }
    }

    #[must_use]
    pub const fn accel(reverse: bool) -> Self {
        if reverse {
            Self::AccelRev
        } else {
            Self::AccelFwd
        }
    }

    #[must_use]
    pub const fn at_speed(reverse: bool) -> Self {
        if reverse {
            Self::AtSpeedRev
        } else {
            Self::AtSpeedFwd
        }
    }
}

/// 3-bit function code, as carried in a state-queue slot or as the request
/// from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionCode {
    Move,
    Search,
    Read,
    Write,
    ReadAll,
    WriteAll,
    /// Write-timing / mark-track. Always rejected at LOAD COMMAND time; never
    /// reaches the state queue.
    WriteMark,
    /// Internal pseudo-function driving a deselected, still-moving unit off
    /// the physical reel so it auto-detaches.
    OffReel,
}

/// A single (motion, function) pair held in a state-queue slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct StatePair {
    pub motion: MotionCode,
    pub function: FunctionCode,
}

impl StatePair {
    #[must_use]
    pub const fn new(motion: MotionCode, function: FunctionCode) -> Self {
        Self { motion, function }
    }

    #[must_use]
    pub const fn stopped() -> Self {
        Self::new(MotionCode::Stop, FunctionCode::Move)
    }
}

/// The layered (current, next, next-next) state queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct LayeredState {
    pub current: StatePair,
    pub next: Option<StatePair>,
    pub next_next: Option<StatePair>,
}

impl LayeredState {
    #[must_use]
    pub const fn stopped() -> Self {
        Self {
            current: StatePair::stopped(),
            next: None,
            next_next: None,
        }
    }

    #[must_use]
    pub const fn current_motion(&self) -> MotionCode {
        self.current.motion
    }

    /// Whether either queued slot is occupied — used by READ STATUS's GO bit.
    #[must_use]
    pub const fn has_queued_slot(&self) -> bool {
        self.next.is_some() || self.next_next.is_some()
    }

    /// Shift `next` into `current` and `next_next` into `next`, per the
    /// service routine's "advance state" step. The vacated `next_next` slot
    /// becomes empty.
    pub fn advance(&mut self) {
        self.current = self.next.unwrap_or_else(StatePair::stopped);
        self.next = self.next_next.take();
    }

    pub fn set_current(&mut self, pair: StatePair) {
        self.current = pair;
    }

    pub fn set_next(&mut self, pair: StatePair) {
        self.next = Some(pair);
    }

    pub fn set_next_next(&mut self, pair: StatePair) {
        self.next_next = Some(pair);
    }

    pub fn clear_queue(&mut self) {
        self.next = None;
        self.next_next = None;
    }
}

impl Default for LayeredState {
    fn default() -> Self {
        Self::stopped()
    }
}
