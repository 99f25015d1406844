//! Route table: one bus listener per declared method.
//!
//! Each listener turns a dispatch event into exactly one reply event on the
//! result topic, carrying the dispatch's correlation id.

use crate::domain::error::DispatchError;
use crate::domain::registry::{MethodHandler, MethodRegistry};
use serde_json::Value;
use shared_bus::{
    DispatchEvent, EventPublisher, GatewayEvent, InMemoryEventBus, ReplyEvent, Subscription,
};
use shared_types::{DefinitionError, DispatchKey, MethodSpec, ReplyEnvelope, ServiceDefinition};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// One routed method.
pub struct Route {
    pub key: DispatchKey,
    spec: MethodSpec,
    handler: Option<MethodHandler>,
}

impl Route {
    /// Whether a business handler was resolved at build time.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Run the handler for one dispatch and build its reply.
    ///
    /// Never panics: handler errors and panics both become a 500 reply, with
    /// the detail logged here and nowhere else.
    pub fn invoke(&self, event: &DispatchEvent) -> ReplyEnvelope {
        match self.call(event) {
            Ok(value) => ReplyEnvelope::success(self.spec.return_info.kind, value),
            Err(err @ DispatchError::HandlerMissing(_)) => {
                warn!(
                    correlation_id = %event.correlation_id,
                    error = %err,
                    "Declared method has no handler"
                );
                err.to_reply()
            }
            Err(err) => {
                error!(
                    correlation_id = %event.correlation_id,
                    error = %err,
                    "Handler failed"
                );
                err.to_reply()
            }
        }
    }

    fn call(&self, event: &DispatchEvent) -> Result<Value, DispatchError> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| DispatchError::HandlerMissing(self.key.clone()))?;

        let args = self.spec.project(&event.args);
        debug!(
            key = %self.key,
            correlation_id = %event.correlation_id,
            arity = args.len(),
            "Invoking handler"
        );

        let failure = |detail: String| DispatchError::HandlerFailure {
            key: self.key.clone(),
            detail,
        };
        match catch_unwind(AssertUnwindSafe(|| handler(args.as_slice()))) {
            Ok(result) => result.map_err(|e| failure(format!("{e:#}"))),
            Err(panic) => Err(failure(format!(
                "panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }
}

/// All routes of one gateway, plus the subscriptions that keep them live.
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    _subscriptions: Vec<Subscription>,
}

impl RouteTable {
    /// Validate the definition and subscribe one listener per method.
    ///
    /// Validation guarantees each dispatch key names exactly one method.
    /// Listeners hold the bus weakly; the table must be kept alive for as
    /// long as requests are served.
    pub fn build(
        definition: &ServiceDefinition,
        registry: &MethodRegistry,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<Self, DefinitionError> {
        definition.validate()?;

        let mut routes = Vec::new();
        let mut subscriptions = Vec::new();

        for (service, method, spec) in definition.methods() {
            let key = DispatchKey::new(service, method);
            let handler = registry.resolve(service, method);
            if handler.is_none() {
                warn!(
                    service = service,
                    method = method,
                    "Declared method has no handler; requests will get 501"
                );
            }

            let route = Arc::new(Route {
                key: key.clone(),
                spec: spec.clone(),
                handler,
            });

            let listener = Arc::clone(&route);
            let weak_bus = Arc::downgrade(bus);
            subscriptions.push(bus.subscribe(key.as_str(), move |event| {
                on_dispatch(&listener, &weak_bus, event);
            }));
            routes.push(route);
        }

        debug!(routes = routes.len(), "Route table built");
        Ok(Self {
            routes,
            _subscriptions: subscriptions,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch keys of declared methods without a handler.
    pub fn missing_handlers(&self) -> Vec<&DispatchKey> {
        self.routes
            .iter()
            .filter(|r| !r.has_handler())
            .map(|r| &r.key)
            .collect()
    }
}

fn on_dispatch(route: &Route, bus: &Weak<InMemoryEventBus>, event: &GatewayEvent) {
    let GatewayEvent::Dispatch(dispatch) = event else {
        return;
    };
    debug!(
        key = %route.key,
        correlation_id = %dispatch.correlation_id,
        "Dispatch received"
    );

    let reply = route.invoke(dispatch);
    let status = reply.status_code;

    let Some(bus) = bus.upgrade() else {
        warn!(correlation_id = %dispatch.correlation_id, "Bus gone, reply dropped");
        return;
    };
    bus.publish(GatewayEvent::Reply(ReplyEvent {
        correlation_id: dispatch.correlation_id,
        reply,
    }));

    debug!(
        key = %route.key,
        correlation_id = %dispatch.correlation_id,
        status = status,
        "Reply published"
    );
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
