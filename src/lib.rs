pub mod admin;
pub mod auth;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod model;
pub mod panel;
pub mod settings;
pub mod storage;
pub mod store;
pub mod sync;
