use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

pub const SOURCE_UID: &str = "source.uid";
pub const SOURCE_NAMESPACE: &str = "source.namespace";
pub const SOURCE_IP: &str = "source.ip";
pub const SOURCE_PRINCIPAL: &str = "source.principal";
pub const DESTINATION_UID: &str = "destination.uid";
pub const DESTINATION_NAMESPACE: &str = "destination.namespace";
pub const DESTINATION_IP: &str = "destination.ip";
pub const DESTINATION_SERVICE_HOST: &str = "destination.service.host";
pub const CONTEXT_REPORTER_KIND: &str = "context.reporter.kind";
pub const REQUEST_API_KEY: &str = "request.api_key";
pub const REQUEST_TIME: &str = "request.time";

const NAMESPACE_KEY: &str = "ns";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    StringValue(String),
    Int64Value(i64),
    DoubleValue(f64),
    BoolValue(bool),
    BytesValue(Vec<u8>),
    TimestampValue(SystemTime),
    DurationValue(Duration),
    StringMapValue(BTreeMap<String, String>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::StringValue(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::StringValue(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64Value(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::BoolValue(b)
    }
}

/// Contextual request or connection metadata sent to the policy service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeBag {
    attributes: BTreeMap<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(Value::StringValue(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name) {
            Some(Value::Int64Value(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Copies every attribute of `other` into this bag, overwriting on conflict.
    pub fn merge_from(&mut self, other: &AttributeBag) {
        for (name, value) in &other.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttributeBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = AttributeBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

/// Extracts the namespace from a principal such as
/// `cluster.local/ns/<namespace>/sa/<account>`.
///
/// The first token is the trust domain and is skipped, the rest are read as
/// key/value pairs. Returns the value following the first `ns` key, which is
/// empty when `ns` is the last token.
pub fn source_namespace(principal: &str) -> Option<&str> {
    let tokens: Vec<&str> = principal.split('/').skip(1).collect();
    tokens
        .chunks(2)
        .find(|pair| pair[0] == NAMESPACE_KEY)
        .map(|pair| pair.get(1).copied().unwrap_or(""))
}

/// Identity of the workload the proxy runs next to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalNode {
    pub uid: String,
    pub namespace: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalAttributes {
    pub inbound: AttributeBag,
    pub outbound: AttributeBag,
    pub forward: AttributeBag,
}

impl LocalAttributes {
    pub fn from_node(node: &LocalNode) -> Self {
        let mut local = Self::default();

        if !node.uid.is_empty() {
            local.inbound.insert(DESTINATION_UID, node.uid.as_str());
            local.outbound.insert(SOURCE_UID, node.uid.as_str());
            local.forward.insert(SOURCE_UID, node.uid.as_str());
        }
        if !node.namespace.is_empty() {
            local
                .inbound
                .insert(DESTINATION_NAMESPACE, node.namespace.as_str());
            local.outbound.insert(SOURCE_NAMESPACE, node.namespace.as_str());
        }
        if !node.ip.is_empty() {
            local.inbound.insert(DESTINATION_IP, node.ip.as_str());
            local.outbound.insert(SOURCE_IP, node.ip.as_str());
        }

        local
    }
}
