use std::time::Duration;
use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("{provider}: Status cache couldn't be initialized after {waited:?}")]
  InitTimeout { provider: String, waited: Duration },
  #[error("{0}: Status cache is not initialized")]
  NotInitialized(String),
  #[error(transparent)]
  Model(#[from] ModelError),
}
