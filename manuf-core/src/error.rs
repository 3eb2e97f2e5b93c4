/// Error taxonomy of the batch pipeline.
///
/// `DataNotFound` is what the lookup collaborators fail with when an id is
/// unknown; inside the pipeline it is logged and the affected expansion
/// branch is treated as terminal instead of aborting the batch. Degraded
/// pricing is not an error at all: a missing market cache entry yields
/// zero-priced stats downstream.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Reference data not found: {0}")]
    DataNotFound(String),
    #[error("Batch computation failed")]
    BatchComputationFailure(#[source] anyhow::Error),
}
