pub mod commands;
pub mod config;
pub mod constants;
pub mod cooldown;
pub mod error;
pub mod game;
pub mod health;
pub mod locations;
pub mod messages;
pub mod persistence;
pub mod service;
pub mod store;
pub mod telegram;
pub mod transport;
pub mod types;
