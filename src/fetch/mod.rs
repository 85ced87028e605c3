//! Fetch layer for reading entity state from the device.
//!
//! This module provides types and traits for:
//! - The state-fetch contract consumed by the monitor ([`StateFetcher`], [`Unavailable`])
//! - Building HTTP requests ([`HttpRequest`])
//! - Handling HTTP responses ([`HttpResponse`])
//! - Abstracting HTTP clients ([`HttpClient`])
//! - Production HTTP client implementation ([`ReqwestClient`])
//! - The device state endpoint fetcher ([`HttpStateFetcher`])

mod client;
mod device;
mod error;
mod fetcher;
mod http;


pub use client::ReqwestClient;
pub use device::{DEFAULT_STATE_PATH, HttpStateFetcher, ID_PLACEHOLDER};
pub use error::{HttpError, Unavailable};
pub use fetcher::StateFetcher;
pub use http::{HttpClient, HttpRequest, HttpResponse};
