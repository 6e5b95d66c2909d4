pub mod cache;
pub mod cdb_client;
pub mod clock;
pub mod engine;
pub mod in_house;
pub mod listener;
pub mod sender;
pub mod token_cache;
