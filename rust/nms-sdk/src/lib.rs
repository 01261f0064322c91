//! # nms-sdk
//!
//! Subscriber query and cache layer for the network management console.
//!
//! The listing endpoint pages with opaque continuation tokens, so random
//! access is impossible. This crate keeps the tokens per table, caches the
//! visible page of subscribers next to their session state and usage metrics,
//! and folds writes back into the cache so views stay consistent until their
//! next refresh.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nms_sdk::prelude::*;
//!
//! let api = HttpSubscriberApi::new(HttpConfig::new("https://nms/magma/v1", "lte_net"))?;
//! let ctx = SubscriberContext::mount(Arc::new(api), SubscriberConfig::default()).await?;
//!
//! let table = ctx.table();
//! let first = table.query(SubscriberQuery::page(0, 100)).await?;
//! let one = table.query(SubscriberQuery::default().with_search("IMSI001011234560000")).await?;
//!
//! ctx.delete("IMSI001011234560000").await?;
//! let refreshed = table.query(SubscriberQuery::page(0, 100)).await?;
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod mutation;
pub mod prelude;
pub mod query;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod validation;

pub use api::SubscriberApi;
pub use config::{HttpConfig, SubscriberConfig};
pub use context::SubscriberContext;
pub use error::{ApiError, Result, RowError, SubscriberError};
pub use http::HttpSubscriberApi;
pub use ledger::PageTokenLedger;
pub use metrics::MetricsQuery;
pub use model::{
    GatewaySubscriberMap, LteSubscription, MetricSample, ServiceState, SessionState, Subscriber,
    SubscriberId, SubscriberMetrics, SubscriberPage, SubscriberPatch, SubscriberRow,
};
pub use mutation::SubscriberOp;
pub use query::{QueryResult, SubscriberQuery, SubscriberTable};
pub use store::{KeyedStore, StoreUpdate};
pub use stream::StoreStream;
pub use telemetry::{init as init_telemetry, TelemetryConfig};
pub use validation::SubscriberForm;
