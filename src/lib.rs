pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;
pub mod state;
