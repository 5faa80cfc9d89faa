// Sync phases, run in order by the orchestrator:
// fan-out over the matrix, aggregate the artifacts, publish the result.

#[path = "01_matrix.rs"]
pub mod matrix;
#[path = "02_aggregate.rs"]
pub mod aggregate;
#[path = "03_publish.rs"]
pub mod publish;
