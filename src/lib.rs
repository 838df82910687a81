//! Type 550/555 DECtape controller: tape motion and command state engine.
//!
//! Standalone tape-transport core with no file or device dependencies,
//! following the project's chip-level library pattern (like `nec-upd765`
//! and `mos-via-6522`). A host wires this crate to its own I/O bus and its
//! own [`scheduler::Scheduler`] implementation; this crate owns none of
//! that plumbing.
//!
//! # Modules
//!
//! - [`geometry`] — tape line layout, block/word coordinates, formats.
//! - [`state`] — motion/function codes and the layered state queue.
//! - [`config`] — timing constants, per-unit mount config, logging flags.
//! - [`kinematics`] — integer accel/decel/at-speed line-advance formulas.
//! - [`image`] — the in-memory word buffer backing an attached unit.
//! - [`checksum`] — header/trailer synthesis and the obverse-complement transform.
//! - [`scheduler`] — the discrete-event seam and its reference implementation.
//! - [`unit`] — one tape transport: Position Model + command classifier.
//! - [`function`] — the Function Executor: dispatch, service routine, errors.
//! - [`attach`] — the Attach/Detach collaborator contract.
//! - [`codec`] — the in-memory byte/word transcoder implementing it.
//! - [`controller`] — registers, I/O pulses, and the eight-unit core.

pub mod attach;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod controller;
pub mod function;
pub mod geometry;
pub mod image;
pub mod kinematics;
pub mod scheduler;
pub mod state;
pub mod unit;

#[cfg(feature = "save-state")]
pub mod snapshot;

pub use attach::{AttachError, TapeCodec};
pub use codec::PlainCodec;
pub use config::{Config, ConfigError, LogFlags, Timings, UnitConfig};
pub use controller::{Controller, Pulse, StatusB};
pub use function::{ErrorCode, HostFlags, StepResult};
pub use geometry::Format;
pub use scheduler::{Scheduler, SimScheduler, UnitId};
pub use unit::TapeUnit;
