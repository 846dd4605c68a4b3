pub mod error;
pub mod ident;
pub mod security;
pub mod identity;
pub mod visibility;
pub mod search;
pub mod storage;
pub mod schema;
pub mod docstore;
pub mod config;
pub mod services;
pub mod cli;

pub use error::{AppError, AppResult};
pub use services::Services;
