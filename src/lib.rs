pub mod ai;
pub mod aws_clients;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod editor;
pub mod errors;
pub mod feed;
pub mod gemini;
pub mod handlers;
pub mod models;
pub mod render;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod storage;
pub mod stores;
pub mod studio;

use std::sync::Arc;

use crate::studio::Studio;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub studio: Arc<Studio>,
}

impl AppState {
    pub fn new(studio: Arc<Studio>) -> Self {
        Self { studio }
    }
}
