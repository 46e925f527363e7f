pub mod activity;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod data_types;
pub mod frontend;
pub mod inspector;
pub mod query;
pub mod repository;
pub mod utils;

extern crate lazy_static;

#[cfg(test)]
pub(crate) mod testutils;
