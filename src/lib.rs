pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod playback;
pub mod repository;
pub mod services;
