use thiserror::Error;

/// Error depicting failures that take the whole monitor down
///
#[derive(Debug, Error)]
#[error("error while running price monitor: {0}")]
pub struct MonitorError(pub String);
