pub mod app;
pub mod browser;
pub mod chromium;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod output;
pub mod query;
pub mod store;
pub mod worker;
