pub mod config;
pub mod error;
pub mod http;
pub mod mapper;
pub mod model;
pub mod queue;
pub mod relay;
