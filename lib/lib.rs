#[allow(unused)]
use {
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{jdebug, jerror, jinfo, jwarn},
};

pub mod attribution;
pub mod error;
pub mod kernelimage;
pub mod samplestream;

pub use attribution::AttributionTable;
pub use attribution::CodeRange;
pub use error::KpdumpError;
pub use kernelimage::KernelImage;
pub use kernelimage::LoadSegment;
pub use kernelimage::SymbolRecord;
pub use samplestream::SampleStream;
