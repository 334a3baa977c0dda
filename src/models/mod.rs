//! Core data models for the image backend.
//!
//! Records map to the `images` table via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod image;
