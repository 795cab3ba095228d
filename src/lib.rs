//! # Taller API Library
//!
//! Multi-tenant backend for motorcycle repair shops: customers, their
//! motorcycles, technicians, inventory, appointments, work orders and
//! sales, each owned by exactly one shop.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod password;
pub mod repositories;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod tenant;
pub mod validation;
pub use migration;
