//! Client code for bibliocache.
//!
//! This crate provides the book catalog client used to populate the cache
//! when a search misses.

pub mod catalog;

pub use catalog::{Catalog, CatalogConfig, CatalogError, CatalogQuery, CatalogResponse, OpenLibraryClient};
