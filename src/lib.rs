//! Image upload backend: axum handlers over an SQLite metadata table and a
//! local upload directory.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes::routes;
pub use services::image_service::ImageService;
