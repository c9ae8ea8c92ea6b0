// src/fetch/mod.rs
pub mod client;
pub mod models;

pub use client::{Fetcher, HttpFetcher};
pub use models::{detail_url, RenderedPage, DEFAULT_BASE_URL};
