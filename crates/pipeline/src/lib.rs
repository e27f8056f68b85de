pub mod driver;
pub mod email;
pub mod machine;
pub mod placeholder;
pub mod snapshot;
pub mod stages;
pub mod timing;

pub use driver::PipelineDriver;
pub use email::draft_email;
pub use machine::{LogEntry, LogKind, Phase, PipelineMachine, RunState, StageMessage, search_logs};
pub use placeholder::PlaceholderGenerator;
pub use snapshot::{PipelineSnapshot, RevealedExtraction, StageStatus, StageView, revealed_extractions};
pub use stages::{COMMUNICATION_STAGE, PipelineKind, StageDescriptor};
pub use timing::{DelayRange, PipelineTiming};
