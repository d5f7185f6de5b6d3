// Presentation layer - HTTP API
pub mod api_error;
pub mod app_state;
pub mod handlers;
