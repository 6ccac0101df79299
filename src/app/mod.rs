pub mod api;
pub mod app_token;
pub mod builder;
pub mod cli;
pub mod compiler;
pub mod detection;
pub mod logging;
