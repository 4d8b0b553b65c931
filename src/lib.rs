pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod load;
pub mod routes;
pub mod state;
pub mod trade;
