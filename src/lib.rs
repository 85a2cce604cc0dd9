pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod report;
