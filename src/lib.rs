pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod handlers;
pub mod middleware;
pub mod rbac;
pub mod routes;
pub mod server;
pub mod services;
