use crate::app::models::worker_error::WorkerError;

#[derive(Debug)]
pub enum GenerateWorkerError {
    NoPipelineSelected,
}

impl GenerateWorkerError {
    pub fn value(&self) -> WorkerError {
        match *self {
            Self::NoPipelineSelected => {
                WorkerError::Configuration("No pipeline selected.".to_string())
            }
        }
    }
}
