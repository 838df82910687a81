//! Motion Kinematics: elapsed time + motion phase -> advance in lines.
//!
//! DECtape motion is modeled as constant velocity with linear acceleration
//! and deceleration. Using `u` = elapsed lines (elapsed ticks / line-time)
//! and `d` = phase-time in lines (accel-time or decel-time / line-time):
//!
//! ```text
//! at speed:  delta = u
//! accel:     delta = u^2 / (2d)
//! decel:     delta = (2ud - u^2) / (2d)
//! ```
//!
//! All arithmetic is integer, matching the original's use of relative
//! (integer) time so that save/restore of start times stays exact.

use crate::config::Timings;
use crate::state::MotionCode;

/// Motion phase without a direction component — what the kinematics
/// equations actually branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stop,
    Accel,
    Decel,
    AtSpeed,
}

impl Phase {
    #[must_use]
    pub const fn of(motion: MotionCode) -> Self {
        match motion {
            MotionCode::Stop => Self::Stop,
            MotionCode::AccelFwd | MotionCode::AccelRev => Self::Accel,
            MotionCode::DecelFwd | MotionCode::DecelRev => Self::Decel,
            MotionCode::AtSpeedFwd | MotionCode::AtSpeedRev => Self::AtSpeed,
        }
    }
}

/// Advance in lines for `elapsed` ticks of motion in the given phase.
/// Always non-negative; the caller applies the direction sign.
#[must_use]
pub fn advance_lines(phase: Phase, elapsed: u64, timings: Timings) -> u64 {
    let line_time = u64::from(timings.line_time);
    match phase {
        Phase::Stop => 0,
        Phase::Decel => {
            let u = elapsed / line_time;
            let d = u64::from(timings.decel_time) / line_time;
            ((u * d * 2) - (u * u)) / (2 * d)
        }
        Phase::Accel => {
            let u = elapsed / line_time;
            let d = u64::from(timings.accel_time) / line_time;
            (u * u) / (2 * d)
        }
        Phase::AtSpeed => elapsed / line_time,
    }
}
