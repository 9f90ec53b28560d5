pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod genre;
pub mod quiz;
pub mod recommend;
pub mod scoring;
pub mod session;
pub mod tmdb;
