//! Asynchronous API access layer for the Roomy backend.
//!
//! # Overview
//! A single request core normalizes transport and application failures into
//! one error type; typed verb wrappers and per-resource services sit on top;
//! two lifecycle hooks give any consumer a `{data, loading, error}` state
//! machine around those calls.
//!
//! # Design
//! - `TransportConfig` is resolved once from explicit inputs and shared.
//! - `ApiClient` splits each call into a pure `build_request`, one
//!   `Transport::execute`, and a pure `parse_response`, so the I/O boundary is
//!   explicit and the core is testable without a network.
//! - Only the request core classifies errors; services and hooks pass
//!   `ApiError` through unchanged.
//! - Hooks publish state over `tokio::sync::watch` and stop publishing once
//!   unmounted. There is no caching, deduplication, retry or timeout.

pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod services;
pub mod types;

pub use client::{parse_response, ApiClient, RequestDescriptor, RequestOptions};
pub use config::{EndpointTable, Environment, Platform, TransportConfig};
pub use error::{ApiError, ErrorCause, ErrorKind};
pub use hooks::{LifecycleState, Mutation, Phase, Query};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use services::{health_check, Resource, ResourceService, RoomService, UserService};
pub use types::{HealthStatus, NewRoom, NewUser, Room, User};
