pub mod activity;
pub mod aggregate;
pub mod cli;
pub mod collect;
pub mod config;
pub mod discover;
pub mod error;
pub mod model;
pub mod remote;
pub mod render;
