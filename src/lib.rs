pub mod api;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod model;
pub mod policy;
pub mod store;
pub mod time;
pub mod tracker;
