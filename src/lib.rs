pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod entity;
pub mod feed;
pub mod test;
pub mod web;
