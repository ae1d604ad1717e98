pub mod cli;
pub mod cluster;
pub mod config;
pub mod k8s;
pub mod status;
pub mod utils;
