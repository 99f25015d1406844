//! Business handler registry.
//!
//! Handlers are registered by bare method name, so two services declaring the
//! same method share one handler and a later registration replaces an earlier
//! one. A handler registered for a specific `service:method` pair wins over
//! the bare entry for that service only.

use crate::domain::config::ConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A business handler: positional arguments in, JSON value out.
pub type MethodHandler = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Key under which a service-specific handler is stored.
pub fn qualified_key(service: &str, method: &str) -> String {
    format!("{service}:{method}")
}

/// Positional number argument, for handlers over numeric parameters.
pub fn number_arg(args: &[Value], index: usize) -> anyhow::Result<f64> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow::anyhow!("argument {} is not a number", index + 1))
}

/// Method name → handler.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, MethodHandler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a bare method name.
    ///
    /// Returns true if an earlier handler was replaced.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<bool, ConfigError>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(ConfigError::EmptyHandlerName);
        }
        Ok(self
            .handlers
            .insert(name.to_string(), Arc::new(handler))
            .is_some())
    }

    /// Register a handler for one service's method only.
    pub fn register_qualified<F>(
        &mut self,
        service: &str,
        method: &str,
        handler: F,
    ) -> Result<bool, ConfigError>
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if service.is_empty() || method.is_empty() {
            return Err(ConfigError::EmptyHandlerName);
        }
        Ok(self
            .handlers
            .insert(qualified_key(service, method), Arc::new(handler))
            .is_some())
    }

    /// Handler for `service`'s `method`: qualified entry first, then bare.
    pub fn resolve(&self, service: &str, method: &str) -> Option<MethodHandler> {
        self.handlers
            .get(&qualified_key(service, method))
            .or_else(|| self.handlers.get(method))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("MethodRegistry")
            .field("handlers", &names)
            .finish()
    }
}
