pub mod labels;
pub mod metrics;
pub mod result;

pub use labels::{Label, LabelFormatError};
pub use metrics::{MetricValue, Metrics};
pub use result::SpeedTestResult;
