pub mod app;
pub mod catalog;
pub mod cli;
pub mod comments;
pub mod config;
pub mod events;
pub mod highlight;
pub mod notify;
pub mod page;
pub mod render;
pub mod router;
pub mod search;
pub mod share;
pub mod storage;
pub mod ui;

pub use catalog::{Catalog, Post};
pub use comments::{Comment, CommentStore};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
