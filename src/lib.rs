pub mod booking;
pub mod command;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
