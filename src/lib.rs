//! Postboard - A small social posting backend
//!
//! Users sign up or sign in (credentials or OAuth), publish text posts with
//! optional images, and edit their profile. All state lives in a relational
//! database behind [`db`]; [`api`] exposes it as JSON over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
