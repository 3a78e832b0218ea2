//! Command handlers

pub mod config;
pub mod records;
pub mod repo;
pub mod upload;
