pub mod calculator;
pub mod types;

pub use calculator::WindowCalculator;
pub use types::{PredictionWindowResult, TimeframeKind, WindowStatus};
