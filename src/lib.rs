// For integration tests only, reckoner does binary-only packaging
pub mod cli;
pub mod config;
pub mod control;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod observability;
pub mod params;
pub mod persistence;
pub mod protocol;
pub mod reputation;
pub mod server;
