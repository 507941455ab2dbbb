//! Trackit library
//!
//! This library exposes the core functionality of Trackit for the server
//! binary and the integration tests.

pub mod app;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod routes;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;
