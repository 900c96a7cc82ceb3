//! Client for the upstream podcast intelligence API.
//!
//! [`IntelligenceApi`] is the single seam between podintel and the upstream
//! service. [`HttpIntelligenceClient`] talks to the real thing; the
//! [`MockIntelligenceApi`] answers from scripted data.

pub mod client;
pub mod mock;

pub use client::{HttpIntelligenceClient, IntelligenceApi, UpstreamError};
pub use mock::{MockCall, MockIntelligenceApi};
