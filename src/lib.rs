pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod state;
pub mod tasks;
pub mod users;
pub mod validation;
