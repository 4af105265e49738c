//! Per-scan worker loops and their shared cancellation primitive.

pub mod cancel;
pub mod processor;
pub mod transporter;

pub use cancel::CancellationToken;
pub use processor::{ExternalStatsTool, Processor, SiblingFlags, StatsTool};
pub use transporter::Transporter;
