//! Recoverable gesture faults.
//!
//! None of these abort anything beyond the gesture that raised them. The
//! engine reports them as [`crate::engine::Action::Warning`] and leaves its
//! state untouched.

use serde::{Deserialize, Serialize};

use crate::input::Tool;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum GestureError {
    /// A length-producing tool was used before the drawing was calibrated.
    #[error("set the drawing scale before using the {tool:?} tool")]
    ScaleNotCalibrated { tool: Tool },
    /// A roof-direction click landed outside the roof mask being oriented.
    #[error("click inside the roof mask to set its direction")]
    OutsideRoofMask,
    /// The roof-direction tool was used with no roof mask awaiting a direction.
    #[error("draw or select a roof mask before setting its direction")]
    NoPendingRoofMask,
    /// PV placement was attempted without a panel configuration.
    #[error("choose a PV panel before placing arrays")]
    NoPanelConfig,
}
