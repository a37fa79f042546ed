//! Frame assembly from archive results.
//!
//! - [`AnimationConfig`] - What to animate and how
//! - [`TimeWindow`] / [`ResultStepper`] - Time axis of a run
//! - [`PositionTable`] - Link and triad transforms
//! - [`DeformationTable`] - Per-vertex displacements of FE parts
//! - [`FringeTable`] - Color buffers of FE parts
//! - [`AnimationCreator`] - Batch, incremental and export drivers

mod config;
mod window;
mod stepper;
mod progress;
mod position;
mod deform;
pub mod fringe;
mod creator;

pub use config::{
    AnalysisSettings, AnimationConfig, AveragingItem, FringeConfig, LegendConfig, ResultClass, SKIP_BLADE_TAG,
};
pub use window::TimeWindow;
pub use stepper::ResultStepper;
pub use progress::{NullProgress, ProgressHost, ProgressTracker, DEFORMATION_WEIGHT, FRINGE_WEIGHT, POSITION_WEIGHT};
pub use position::PositionTable;
pub use deform::DeformationTable;
pub use fringe::{FringeSetup, FringeTable, FringeValues, LegendMapping, ValueRange};
pub use creator::{AnimationCreator, ExportReport, LoadReport, NO_COLORED_PARTS, OUT_OF_MEMORY};
