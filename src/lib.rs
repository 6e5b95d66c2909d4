// src/lib.rs

pub mod api;
pub mod bidding;
pub mod config;
pub mod error;
pub mod logging;
pub mod mock_cdb;
pub mod model;
