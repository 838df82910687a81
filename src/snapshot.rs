//! Save/restore snapshot types (§6 "Persisted state"), gated behind the
//! `save-state` feature. A snapshot captures everything needed to
//! reconstruct a stopped [`crate::Controller`] instant — it owns no
//! scheduler of its own; the host re-arms whatever timer a moving unit
//! needs after [`crate::Controller::from_snapshot`], since only the host
//! knows how its own event loop accounts for elapsed time across a save.

use serde::{Deserialize, Serialize};

use crate::config::{Config, UnitConfig};
use crate::controller::StatusB;
use crate::state::LayeredState;
use crate::unit::Substate;

/// Captured state of one tape transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub config: UnitConfig,
    pub attached: bool,
    pub pos: u32,
    pub state: LayeredState,
    pub last_time: u64,
    pub substate: Substate,
    /// `None` when not attached.
    pub image_words: Option<Vec<u32>>,
    pub image_hwmark: Option<u32>,
}

/// Captured state of the eight-unit controller core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub units: Vec<UnitSnapshot>,
    pub select_raw: u8,
    pub requested_moving: bool,
    pub requested_reverse: bool,
    pub requested_fnc_bits: u8,
    pub data_buffer: u32,
    pub status_b: StatusB,
    pub config: Config,
}
