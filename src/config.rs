//! Configuration surface: per-unit mount options, global timing constants,
//! logging flags, and the device-disabled bit.
//!
//! Plain structs, no builder macro and no `serde` requirement on the base
//! type — matching `emu-spectrum::config::SpectrumConfig`'s style. Save/restore
//! of a running simulation is a separate concern (see [`crate::snapshot`]).

use std::fmt;

use crate::geometry::Format;

/// Scheduler-time constants governing tape motion. All three must be
/// strictly positive (the original's `REG_NZ` register guard).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct Timings {
    /// Ticks of scheduler time per line of motion at speed.
    pub line_time: u32,
    /// Ticks for a full acceleration phase.
    pub accel_time: u32,
    /// Ticks for a full deceleration phase.
    pub decel_time: u32,
}

impl Timings {
    /// The simulator's historical defaults: 12 ticks/line, 54000/72000 for
    /// accel/decel.
    pub const DEFAULT: Self = Self {
        line_time: 12,
        accel_time: 54_000,
        decel_time: 72_000,
    };

    /// Validate and construct a `Timings`. Fails if any field is zero.
    pub fn new(line_time: u32, accel_time: u32, decel_time: u32) -> Result<Self, ConfigError> {
        if line_time == 0 || accel_time == 0 || decel_time == 0 {
            return Err(ConfigError::NonPositive);
        }
        Ok(Self {
            line_time,
            accel_time,
            decel_time,
        })
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Error constructing a [`Timings`] or other validated configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A timing constant that must be positive was zero.
    NonPositive,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive => {
                write!(f, "line-time, accel-time, and decel-time must all be nonzero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Per-block-function logging flags, gating the `println!` trace lines the
/// Function Executor emits (there is no `log`/`tracing` dependency in this
/// crate, following the pack's convention of plain stdout tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct LogFlags {
    /// Log MOVE and SEARCH starts.
    pub move_search: bool,
    /// Log READ and WRITE starts.
    pub read_write: bool,
    /// Log READ-ALL / WRITE-ALL starts.
    pub read_all: bool,
    /// Only log a specific block number (used with `read_all` or on its own
    /// to trace a single block across any function).
    pub logged_block: Option<u32>,
}

/// Static mount configuration for one tape transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitConfig {
    pub write_locked: bool,
    pub format: Format,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            write_locked: false,
            format: Format::Bit18,
        }
    }
}

/// Full controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "save-state", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub timings: Timings,
    pub log: LogFlags,
    /// When set, every I/O pulse is a no-op.
    pub device_disabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timings: Timings::DEFAULT,
            log: LogFlags::default(),
            device_disabled: false,
        }
    }
}
