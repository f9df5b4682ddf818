//! The inference job abstraction.

use crate::result::AiError;

/// A single inference unit.
///
/// Jobs receive their input snapshot from the caller; this crate stays
/// storage-agnostic and never touches the workbook from inside a job.
pub trait AiJob {
    type Input;
    type Output;

    /// The input snapshot the job will run inference on.
    fn input(&self) -> &Self::Input;

    /// Execute inference. Must not mutate stored state.
    fn run(&self) -> Result<Self::Output, AiError>;
}
