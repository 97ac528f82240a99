pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod scheduler;
pub mod server;
pub mod sink;
