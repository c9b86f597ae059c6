pub mod lifecycle;
pub mod step;

pub use lifecycle::{StepLifecycle, StepState};
pub use step::{RunStatus, Step, StepId, StepRecord, StepResult};
