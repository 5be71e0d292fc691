pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod idena;
pub mod models;
pub mod providers;
pub mod routes;
pub mod storage;
