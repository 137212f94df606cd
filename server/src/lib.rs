//! FlightSurety oracle server library
//!
//! Registers a pool of simulated oracles with the FlightSurety app contract
//! and answers its flight status requests.

pub mod app_state;
pub mod chain;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
