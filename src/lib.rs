pub mod api;
pub mod config;
pub mod counting;
pub mod db;
pub mod error;
pub mod messaging;
pub mod scheduler;
pub mod security;

pub use error::Error;
