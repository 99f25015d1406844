//! # Service Definition
//!
//! The static, declarative description of every callable method: its ordered
//! parameter list and declared return type. Loaded once at construction and
//! immutable for the lifetime of the gateway.
//!
//! ```json
//! {
//!   "arithmetic": {
//!     "methods": {
//!       "add": {
//!         "params": {
//!           "first":  { "order": 1, "type": "number" },
//!           "second": { "order": 2, "type": "number" }
//!         },
//!         "returnInfo": { "type": "number" }
//!       }
//!     }
//!   }
//! }
//! ```

use crate::errors::DefinitionError;
use crate::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
}

impl ParamType {
    /// Whether a JSON value is an instance of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    /// 1-based position in the positional call.
    pub order: u32,
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default)]
    pub optional: bool,
    /// Used when the argument is absent from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared return type. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnInfo {
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One declared method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
    pub return_info: ReturnInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MethodSpec {
    /// Parameters sorted by their declared order.
    pub fn ordered_params(&self) -> Vec<(&str, &ParamSpec)> {
        let mut params: Vec<_> = self
            .params
            .iter()
            .map(|(name, spec)| (name.as_str(), spec))
            .collect();
        params.sort_by_key(|(_, spec)| spec.order);
        params
    }

    /// Project named arguments onto the positional call.
    ///
    /// Each slot takes the supplied argument, else the parameter's default,
    /// else `null`. Arguments with no matching parameter are dropped.
    pub fn project(&self, args: &Args) -> Vec<Value> {
        self.ordered_params()
            .into_iter()
            .map(|(name, spec)| {
                args.get(name)
                    .cloned()
                    .or_else(|| spec.default_value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

/// One declared service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `serviceName → ServiceInfo`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceDefinition(BTreeMap<String, ServiceInfo>);

impl ServiceDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Add or replace a service.
    pub fn insert(&mut self, name: impl Into<String>, info: ServiceInfo) {
        self.0.insert(name.into(), info);
    }

    pub fn service(&self, name: &str) -> Option<&ServiceInfo> {
        self.0.get(name)
    }

    pub fn method(&self, service: &str, method: &str) -> Option<&MethodSpec> {
        self.0.get(service)?.methods.get(method)
    }

    /// All `(service, method, spec)` triples in a stable order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &str, &MethodSpec)> {
        self.0.iter().flat_map(|(service, info)| {
            info.methods
                .iter()
                .map(move |(method, spec)| (service.as_str(), method.as_str(), spec))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check naming, parameter order and default-value invariants.
    ///
    /// Every method must also own its dispatch key: `a` + `b_c` and
    /// `a_b` + `c` both publish on `a_b_c` and are rejected.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut owners: HashMap<DispatchKey, String> = HashMap::new();
        for (service, info) in &self.0 {
            check_name("service", service)?;
            for (method, spec) in &info.methods {
                check_name("method", method)?;
                validate_method(service, method, spec)?;

                let key = DispatchKey::new(service, method);
                let owner = format!("{service}.{method}");
                if let Some(first) = owners.get(&key) {
                    return Err(DefinitionError::DuplicateDispatchKey {
                        key: key.to_string(),
                        first: first.clone(),
                        second: owner,
                    });
                }
                owners.insert(key, owner);
            }
        }
        Ok(())
    }
}

fn validate_method(service: &str, method: &str, spec: &MethodSpec) -> Result<(), DefinitionError> {
    let mut orders = BTreeSet::new();
    for (param, param_spec) in &spec.params {
        check_name("parameter", param)?;

        if !orders.insert(param_spec.order) {
            return Err(DefinitionError::DuplicateOrder {
                service: service.to_string(),
                method: method.to_string(),
                order: param_spec.order,
            });
        }

        if let Some(default) = &param_spec.default_value {
            if !param_spec.kind.matches(default) {
                return Err(DefinitionError::DefaultTypeMismatch {
                    service: service.to_string(),
                    method: method.to_string(),
                    param: param.clone(),
                    expected: param_spec.kind.to_string(),
                });
            }
        }
    }

    // BTreeSet iterates ascending, so 1..=n means every slot is filled.
    let contiguous = orders.iter().copied().eq(1..=orders.len() as u32);
    if !contiguous {
        return Err(DefinitionError::NonContiguousOrder {
            service: service.to_string(),
            method: method.to_string(),
            found: orders.into_iter().collect(),
        });
    }

    Ok(())
}

fn check_name(kind: &'static str, name: &str) -> Result<(), DefinitionError> {
    match name.chars().next() {
        Some(c) if c.is_ascii_lowercase() => Ok(()),
        _ => Err(DefinitionError::InvalidName {
            kind,
            name: name.to_string(),
        }),
    }
}

/// Routing string `serviceName + "_" + methodName`.
///
/// Used only to pick the bus topic, never for handler lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchKey(String);

impl DispatchKey {
    pub fn new(service: &str, method: &str) -> Self {
        Self(format!("{}_{}", service, method))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DispatchKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
