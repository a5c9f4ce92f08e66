pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
