//! Application DTOs - caller-facing views of workflow state

mod level_up;

pub use level_up::WorkflowHandle;
