// Infrastructure layer - External dependencies and adapters
pub mod cloud_client;
pub mod config;
pub mod email_sender;
pub mod influx_repository;
