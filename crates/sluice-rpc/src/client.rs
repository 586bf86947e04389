//! HTTP transport, method discovery and call dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use reqwest::Client;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::call::{CallOptions, PendingCall, RpcFailure};
use crate::config::RpcClientConfig;
use crate::envelope::{RpcRequest, RpcResponse};
use crate::error::{RpcError, RpcResult};
use crate::events::{ClientEvent, EVENT_CAPACITY};
use crate::registry::{MethodRegistry, split_method_name};

/// Method used to discover everything else.
pub const LIST_METHODS: &str = "system.listMethods";

/// JSON-RPC client bound to one endpoint. Cloning shares the connection,
/// registry and request counter.
#[derive(Debug, Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
    registry: RwLock<MethodRegistry>,
    events: broadcast::Sender<ClientEvent>,
}

impl RpcClient {
    /// Build a client without contacting the server. The registry starts
    /// empty until [`reload_methods`](Self::reload_methods) or
    /// [`set_methods`](Self::set_methods) fills it.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidConfig`] when the HTTP client cannot be built.
    pub fn new(config: RpcClientConfig) -> RpcResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|source| RpcError::InvalidConfig { source })?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                endpoint: config.endpoint,
                next_id: AtomicU64::new(0),
                registry: RwLock::new(MethodRegistry::default()),
                events,
            }),
        })
    }

    /// Build a client and discover the server's methods.
    ///
    /// # Errors
    ///
    /// Fails when the client cannot be built or discovery fails.
    pub async fn connect(config: RpcClientConfig) -> RpcResult<Self> {
        let client = Self::new(config)?;
        client.reload_methods().await?;
        Ok(client)
    }

    /// Endpoint every call is posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Re-run discovery and rebuild the registry from scratch.
    ///
    /// # Errors
    ///
    /// Fails when the call fails or its result is not a list of names. Both
    /// cases are broadcast as [`ClientEvent::Error`].
    pub async fn reload_methods(&self) -> RpcResult<Vec<String>> {
        let envelope = self
            .execute_raw(LIST_METHODS, Vec::new())
            .await
            .map_err(|failure| failure.error)?;
        let id = envelope.id.unwrap_or_default();
        let names: Vec<String> = match serde_json::from_value(envelope.result) {
            Ok(names) => names,
            Err(source) => {
                let failure = RpcFailure::new(
                    id,
                    RpcError::Decode {
                        method: LIST_METHODS.to_string(),
                        source,
                    },
                );
                warn!(id, message = failure.message(), "method list could not be read");
                self.broadcast(ClientEvent::Error(failure.envelope));
                return Err(failure.error);
            }
        };
        self.set_methods(&names);
        Ok(self.registry().names())
    }

    /// Replace the registry with `names`, dropping namespaces that are no
    /// longer advertised. Returns the removed namespaces and notifies
    /// subscribers with [`ClientEvent::Connected`].
    pub fn set_methods<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let next = MethodRegistry::from_names(names);
        let (removed, methods) = {
            let mut registry = self
                .inner
                .registry
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let removed = registry.replace(next);
            (removed, registry.names())
        };
        if !removed.is_empty() {
            debug!(namespaces = ?removed, "dropped stale namespaces");
        }
        debug!(count = methods.len(), "method registry rebuilt");
        self.broadcast(ClientEvent::Connected { methods });
        removed
    }

    /// Discovered namespaces in order.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.registry().namespaces().map(str::to_string).collect()
    }

    /// Every discovered fully qualified method name.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.registry().names()
    }

    /// Methods of `namespace`, if it exists.
    #[must_use]
    pub fn methods(&self, namespace: &str) -> Option<Vec<String>> {
        self.registry().methods(namespace)
    }

    /// Whether the fully qualified `name` was discovered.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.registry().contains(name)
    }

    /// Look up a discovered namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnknownNamespace`] when nothing was discovered under
    /// `namespace`.
    pub fn namespace(&self, namespace: &str) -> RpcResult<Namespace> {
        if !self.registry().has_namespace(namespace) {
            return Err(RpcError::UnknownNamespace {
                namespace: namespace.to_string(),
            });
        }
        Ok(Namespace {
            client: self.clone(),
            name: namespace.to_string(),
        })
    }

    /// Resolve a fully qualified `namespace.method` name.
    ///
    /// # Errors
    ///
    /// Fails with [`RpcError::UnknownNamespace`] or [`RpcError::UnknownMethod`].
    pub fn method(&self, name: &str) -> RpcResult<MethodHandle> {
        let (namespace, method) = split_method_name(name).ok_or_else(|| RpcError::UnknownMethod {
            method: name.to_string(),
        })?;
        self.namespace(namespace)?.method(method)
    }

    /// Start `namespace.method(params)` in the background and route the outcome
    /// to `options`.
    ///
    /// # Errors
    ///
    /// Fails when the method was not discovered; no request is sent then.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn call(
        &self,
        namespace: &str,
        method: &str,
        params: Vec<Value>,
        options: CallOptions,
    ) -> RpcResult<PendingCall> {
        Ok(self.namespace(namespace)?.method(method)?.call(params, options))
    }

    /// Call `method` (fully qualified, not checked against the registry) and
    /// return its result.
    ///
    /// # Errors
    ///
    /// Returns the classified failure after it has been broadcast.
    pub async fn execute(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        self.execute_raw(method, params)
            .await
            .map(|envelope| envelope.result)
            .map_err(|failure| failure.error)
    }

    /// Call `method` and return the whole envelope. Failures are broadcast as
    /// [`ClientEvent::Error`] before they are returned.
    ///
    /// # Errors
    ///
    /// Returns the failure envelope together with the classified error.
    pub async fn execute_raw(&self, method: &str, params: Vec<Value>) -> Result<RpcResponse, RpcFailure> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            method: method.to_string(),
            params,
            id,
        };
        debug!(method, id, "sending rpc request");

        let outcome = self.send(&request).await;
        match &outcome {
            Ok(_) => debug!(method, id, "rpc call succeeded"),
            Err(failure) => {
                warn!(
                    method,
                    id,
                    code = failure.code(),
                    message = failure.message(),
                    "rpc call failed"
                );
                self.broadcast(ClientEvent::Error(failure.envelope.clone()));
            }
        }
        outcome
    }

    /// Receiver for client-wide [`ClientEvent`]s emitted after subscribing.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    fn spawn_call(&self, method: String, params: Vec<Value>, options: CallOptions) -> PendingCall {
        let client = self.clone();
        let name = method.clone();
        let handle = tokio::spawn(async move {
            let outcome = client.execute_raw(&name, params).await;
            options.complete(outcome);
        });
        PendingCall::new(method, handle)
    }

    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, RpcFailure> {
        let transport = |message: String, source: Option<reqwest::Error>| {
            RpcFailure::new(
                request.id,
                RpcError::Transport {
                    method: request.method.clone(),
                    message,
                    source,
                },
            )
        };

        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| transport(format!("HTTP: {err}"), Some(err)))?;

        let status = response.status();
        if !status.is_success() {
            let message = format!(
                "HTTP: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            );
            return Err(transport(message.trim_end().to_string(), None));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| transport(format!("HTTP: {err}"), Some(err)))?;
        let envelope: RpcResponse = serde_json::from_slice(&body).map_err(|source| {
            RpcFailure::new(
                request.id,
                RpcError::Decode {
                    method: request.method.clone(),
                    source,
                },
            )
        })?;

        if envelope.error.is_some() {
            return Err(RpcFailure::from_envelope(&request.method, envelope));
        }
        Ok(envelope)
    }

    fn broadcast(&self, event: ClientEvent) {
        if self.inner.events.send(event).is_err() {
            tracing::trace!("no client event subscribers");
        }
    }

    fn registry(&self) -> RwLockReadGuard<'_, MethodRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A discovered namespace such as `core` or `web`.
#[derive(Debug, Clone)]
pub struct Namespace {
    client: RpcClient,
    name: String,
}

impl Namespace {
    /// Namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods exported by this namespace.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.client.methods(&self.name).unwrap_or_default()
    }

    /// Look up one of this namespace's methods.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnknownMethod`] for methods the server did not advertise.
    pub fn method(&self, method: &str) -> RpcResult<MethodHandle> {
        let name = format!("{}.{method}", self.name);
        if !self.client.has_method(&name) {
            return Err(RpcError::UnknownMethod { method: name });
        }
        Ok(MethodHandle {
            client: self.client.clone(),
            name,
        })
    }
}

/// Callable handle for one discovered method.
#[derive(Debug, Clone)]
pub struct MethodHandle {
    client: RpcClient,
    name: String,
}

impl MethodHandle {
    /// Fully qualified method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the call in the background and route the outcome to `options`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use = "dropping the handle does not cancel the call; keep it to wait or cancel"]
    pub fn call(&self, params: Vec<Value>, options: CallOptions) -> PendingCall {
        self.client.spawn_call(self.name.clone(), params, options)
    }

    /// Run the call and return its result.
    ///
    /// # Errors
    ///
    /// Returns the classified failure after it has been broadcast.
    pub async fn invoke(&self, params: Vec<Value>) -> RpcResult<Value> {
        self.client.execute(&self.name, params).await
    }
}
