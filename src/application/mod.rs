// Application layer - Use cases and ports
pub mod alert_dispatcher;
pub mod alert_service;
pub mod evaluator;
pub mod measurement_repository;
pub mod measurement_service;
pub mod measurement_source;
pub mod monitor;
pub mod normalizer;
pub mod pool_api;
pub mod session_client;
