pub mod aggregate;
pub mod batch;
pub mod recorder;
pub mod report;

pub use aggregate::Statistic;
pub use batch::{BatchConfig, BatchReport, TestDir};
pub use recorder::{CoverageError, CoverageRecorder, CoverageSeries, RunSession, SamplingMode};
pub use report::ReportWriter;
