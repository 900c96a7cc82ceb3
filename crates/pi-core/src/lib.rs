//! Core building blocks shared by the podintel server, client and CLI:
//! configuration, the live/demo data switch, the search result cache and
//! the demo data generators.

pub mod config;
pub mod data_mode;
pub mod demo;
pub mod search_cache;
