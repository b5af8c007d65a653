//! Benchmark module
//! Adaptive timing, variant registry and reporting

pub mod driver;
pub mod report;
pub mod timing;

pub use driver::{Driver, Registry, VariantFilter};
pub use report::{OrderingViolation, Report, VariantResult};
pub use timing::{run_adaptive, BenchResult};
