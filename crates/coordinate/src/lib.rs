//! Points of view over versioned entities
//!
//! - `StampCoordinate`: which statuses, time ceiling, path and modules count
//! - `StampCalculator`: resolves the latest visible version(s) of a chronology
//! - `LogicCoordinate`: the component bundle that parameterizes logic-graph lookup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calculator;
pub mod logic;
pub mod stamp_coordinate;

pub use calculator::{RelativePosition, StampCalculator};
pub use logic::{LogicCoordinate, PremiseType, LOGIC_COORDINATE_NAMESPACE};
pub use stamp_coordinate::{StampCoordinate, STAMP_COORDINATE_NAMESPACE};
