//! Wire and display types for subscribers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type SubscriberId = String;

pub const DEFAULT_AUTH_ALGO: &str = "MILENAGE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Active,
    #[default]
    Inactive,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Active => write!(f, "ACTIVE"),
            ServiceState::Inactive => write!(f, "INACTIVE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteSubscription {
    #[serde(default = "default_auth_algo")]
    pub auth_algo: String,
    /// Base64 encoded.
    #[serde(default)]
    pub auth_key: String,
    /// Base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_opc: Option<String>,
    #[serde(default)]
    pub state: ServiceState,
    #[serde(default)]
    pub sub_profile: String,
}

fn default_auth_algo() -> String {
    DEFAULT_AUTH_ALGO.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub lte: LteSubscription,
    #[serde(default)]
    pub active_apns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_policies: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub static_ips: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_network_types: Vec<String>,
}

impl Subscriber {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.lte.state = state;
        self
    }

    /// Display name, falling back to the IMSI.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }

    /// Apply `patch` field by field. The id is never touched.
    pub fn merge(&mut self, patch: SubscriberPatch) {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(auth_key) = patch.auth_key {
            self.lte.auth_key = auth_key;
        }
        if let Some(auth_opc) = patch.auth_opc {
            self.lte.auth_opc = Some(auth_opc);
        }
        if let Some(state) = patch.state {
            self.lte.state = state;
        }
        if let Some(sub_profile) = patch.sub_profile {
            self.lte.sub_profile = sub_profile;
        }
        if let Some(apns) = patch.active_apns {
            self.active_apns = apns;
        }
        if let Some(policies) = patch.active_policies {
            self.active_policies = policies;
        }
        if let Some(static_ips) = patch.static_ips {
            self.static_ips = static_ips;
        }
        if let Some(types) = patch.forbidden_network_types {
            self.forbidden_network_types = types;
        }
    }
}

/// Partial edit of a [`Subscriber`]; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberPatch {
    pub name: Option<String>,
    pub auth_key: Option<String>,
    pub auth_opc: Option<String>,
    pub state: Option<ServiceState>,
    pub sub_profile: Option<String>,
    pub active_apns: Option<Vec<String>>,
    pub active_policies: Option<Vec<String>>,
    pub static_ips: Option<BTreeMap<String, String>>,
    pub forbidden_network_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    /// Gateway hardware ids, most recent first.
    #[serde(default)]
    pub location_history: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IcmpStatus {
    /// Epoch milliseconds.
    #[serde(default)]
    pub last_reported_time: i64,
    #[serde(default)]
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Monitoring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp: Option<IcmpStatus>,
}

/// Ephemeral per-subscriber state reported by gateways.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<Directory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<Monitoring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mme: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s1ap: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spgw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobility: Option<Value>,
}

impl SessionState {
    /// Most recent gateway the subscriber attached through.
    pub fn current_gateway(&self) -> Option<&str> {
        self.directory
            .as_ref()
            .and_then(|d| d.location_history.first())
            .map(String::as_str)
    }

    /// Last ICMP report, `None` when absent or zero.
    pub fn last_reported_time(&self) -> Option<i64> {
        self.monitoring
            .as_ref()
            .and_then(|m| m.icmp.as_ref())
            .map(|icmp| icmp.last_reported_time)
            .filter(|t| *t > 0)
    }

    /// Overlay the sections present in `newer`.
    pub fn merge(&mut self, newer: SessionState) {
        if newer.directory.is_some() {
            self.directory = newer.directory;
        }
        if newer.monitoring.is_some() {
            self.monitoring = newer.monitoring;
        }
        if newer.mme.is_some() {
            self.mme = newer.mme;
        }
        if newer.s1ap.is_some() {
            self.s1ap = newer.s1ap;
        }
        if newer.spgw.is_some() {
            self.spgw = newer.spgw;
        }
        if newer.mobility.is_some() {
            self.mobility = newer.mobility;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_avg: Option<String>,
}

/// One page of the token-cursor listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberPage {
    #[serde(default)]
    pub subscribers: BTreeMap<SubscriberId, Subscriber>,
    #[serde(default)]
    pub next_page_token: String,
    #[serde(default)]
    pub total_count: u64,
}

/// A per-key sample returned by a metrics query.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub key: SubscriberId,
    pub value: String,
}

/// Placeholder for an absent last-reported time.
pub const NO_REPORT: &str = "-";

/// Placeholder for absent metrics.
pub const NO_METRIC: &str = "0";

/// Render-ready projection of one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberRow {
    pub name: String,
    pub imsi: SubscriberId,
    pub service: String,
    pub current_usage: String,
    pub daily_avg: String,
    pub last_reported_time: String,
}

impl SubscriberRow {
    pub fn project(
        subscriber: &Subscriber,
        session: Option<&SessionState>,
        metrics: Option<&SubscriberMetrics>,
    ) -> Self {
        let current_usage = metrics
            .and_then(|m| m.current_usage.clone())
            .unwrap_or_else(|| NO_METRIC.to_string());
        let daily_avg = metrics
            .and_then(|m| m.daily_avg.clone())
            .unwrap_or_else(|| NO_METRIC.to_string());
        let last_reported_time = session
            .and_then(SessionState::last_reported_time)
            .and_then(format_report_time)
            .unwrap_or_else(|| NO_REPORT.to_string());

        Self {
            name: subscriber.display_name().to_string(),
            imsi: subscriber.id.clone(),
            service: subscriber.lte.state.to_string(),
            current_usage,
            daily_avg,
            last_reported_time,
        }
    }
}

fn format_report_time(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Gateway hardware id to the subscribers last seen through it.
pub type GatewaySubscriberMap = HashMap<String, Vec<SubscriberId>>;
