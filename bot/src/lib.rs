#![allow(dead_code)]

pub mod config;
pub mod error;
pub mod imaging;
pub mod matcher;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{BotError, SourceError};
