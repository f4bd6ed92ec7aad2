//! Proxy-side policy client.
//!
//! # Basic operation
//!
//! A [`ClientContext`] is built once per proxy from a [`ClientConfig`] and the
//! identity of the local workload. It resolves the service each request
//! targets and hands out a shared [`ServiceContext`] for it.
//!
//! ```
//! use policy_client::{ClientConfig, ClientContext, LocalNode};
//!
//! let config = ClientConfig::from_yaml_str(
//!     r#"
//! default_destination_service: reviews.default
//! service_configs:
//!   reviews.default: {}
//! "#,
//! )
//! .unwrap();
//! let node = LocalNode {
//!     uid: "kubernetes://reviews-v1.default".to_string(),
//!     namespace: "default".to_string(),
//!     ip: String::new(),
//! };
//! let ctx = ClientContext::new(config, &node);
//!
//! assert_eq!(ctx.service_name(""), "reviews.default");
//! assert!(!ctx.is_outbound());
//! ```
//!
//! # Quota checks
//!
//! Each request gets a [`RequestContext`]. The [`QuotaController`] decides
//! whether the request needs a remote quota allocation and performs it
//! through a [`ServiceControlClient`]:
//!
//! ```
//! use policy_client::{
//!     ClientConfig, ClientContext, LocalNode, MethodInfo, QuotaController, RequestContext,
//! };
//! use policy_client::service_control::InMemoryServiceControlClient;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let client = Arc::new(InMemoryServiceControlClient::new());
//! let ctx = ClientContext::new(ClientConfig::default(), &LocalNode::default())
//!     .with_service_control(client.clone());
//!
//! let request = Arc::new(
//!     RequestContext::new(
//!         ctx.service_context(""),
//!         Arc::new(MethodInfo::new("reviews.Get", false)),
//!     )
//!     .with_api_key("key"),
//! );
//!
//! let status = QuotaController::new().check(&request).await;
//! assert!(status.is_ok());
//! assert_eq!(client.calls(), 1);
//! # });
//! ```
//!
//! Failed checks are classified with [`transport_result`], and the
//! [`NetworkFailPolicy`] of the service decides whether a request whose
//! check could not reach the policy service is let through.

#![deny(clippy::all, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

#[macro_use]
extern crate log;

pub mod attributes;
pub mod client_context;
pub mod config;
pub mod metrics;
pub mod quota;
pub mod quota_control;
pub mod request_context;
pub mod service_context;
pub mod service_control;
pub mod status;
pub mod status_util;

pub use crate::attributes::{source_namespace, AttributeBag, LocalAttributes, LocalNode, Value};
pub use crate::client_context::ClientContext;
pub use crate::config::{ClientConfig, ConfigError, NetworkFailPolicy, ServiceConfig};
pub use crate::quota::{QuotaRequestInfo, QuotaResponseInfo};
pub use crate::quota_control::QuotaController;
pub use crate::request_context::{MethodInfo, RequestContext};
pub use crate::service_context::ServiceContext;
pub use crate::service_control::ServiceControlClient;
pub use crate::status::{Code, ErrorCause, Status};
pub use crate::status_util::{transport_result, TransportResult};
