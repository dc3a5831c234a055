pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod routes;
pub mod submission;
pub mod urls;
