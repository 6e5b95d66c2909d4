pub mod ad_unit;
pub mod adapters;
pub mod cdb;
pub mod mapper;
pub mod native;
pub mod remote_config;
pub mod slot;
pub mod token;
