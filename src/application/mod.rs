//! Application services layer.

pub mod auth;
pub mod engagement;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
