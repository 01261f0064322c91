//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use nms_sdk::prelude::*;
//!
//! let ctx = SubscriberContext::new(api, SubscriberConfig::default());
//! let mut changes = ctx.records().watch();
//! while let Some(update) = changes.next().await {
//!     // re-render
//! }
//! ```

pub use crate::{
    ApiError, HttpConfig, HttpSubscriberApi, QueryResult, ServiceState, SessionState,
    StoreUpdate, Subscriber, SubscriberApi, SubscriberConfig, SubscriberContext, SubscriberError,
    SubscriberForm, SubscriberOp, SubscriberPatch, SubscriberQuery, SubscriberRow,
    SubscriberTable,
};

pub use futures_util::StreamExt;
pub use std::sync::Arc;
