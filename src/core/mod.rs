//! Configuration and domain types shared by every stage

pub mod config;
pub mod models;
