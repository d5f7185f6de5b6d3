// Domain layer - Pool telemetry models
pub mod alert;
pub mod device;
pub mod measurement;
pub mod pool_status;
pub mod session;
