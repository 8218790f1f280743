pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod redirect;
pub mod shopping;
pub mod shortlink;
pub mod storage;
