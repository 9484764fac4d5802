pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod session;
pub mod views;
