pub mod audit;
pub mod config;
pub mod feed;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod sentiment;
pub mod server;
