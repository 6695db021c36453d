use stream_core::element::StreamElement;
use thiserror::Error;

pub type SensorResult<T> = Result<T, SensorError>;

/// Lifecycle contract between the configuration loader and a processing
/// stage. Elements are pushed in; `shutdown` is terminal and must drain any
/// buffered state before returning.
pub trait VirtualSensor: Send + Sync {
    fn initialize(&self) -> SensorResult<()>;
    fn on_element(&self, element: StreamElement);
    fn shutdown(&self) -> SensorResult<()>;
    fn health(&self) -> SensorHealth;
}

/// Downstream consumer of produced elements. Implementations must not block;
/// emission order is preserved per call.
pub trait StreamSink: Send + Sync {
    fn publish(&self, element: StreamElement);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Starting,
    Ready,
    Degraded,
    Failed,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct SensorHealth {
    pub status: HealthStatus,
    pub detail: Option<String>,
}

impl SensorHealth {
    pub fn new(status: HealthStatus, detail: Option<String>) -> Self {
        Self { status, detail }
    }
}

impl Default for SensorHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Stopped,
            detail: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor already running")]
    AlreadyRunning,
    #[error("sensor is not running")]
    NotRunning,
    #[error("sensor configuration invalid: {0}")]
    Config(String),
    #[error("sensor encountered an error: {source}")]
    Failure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
