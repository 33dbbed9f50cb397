//! The handler registry.
//!
//! [`RegistryBuilder`] collects descriptors during startup and rejects
//! inconsistent registrations. [`RegistryBuilder::build`] freezes the result
//! into a read-only [`Registry`] that is shared across request tasks.
//!
//! The registry is generic over the handler payload `H`, so it holds whatever
//! erased callable the executor registers next to each descriptor.

use crate::descriptor::{normalize_path, HandlerDescriptor};
use crate::error::{NegotiationError, RegistrationError};
use http::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A descriptor paired with its handler.
#[derive(Debug)]
pub struct Registered<H> {
    descriptor: Arc<HandlerDescriptor>,
    handler: H,
}

impl<H> Registered<H> {
    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<HandlerDescriptor> {
        &self.descriptor
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// All descriptors sharing one `(path, method)`.
///
/// After [`RegistryBuilder::build`], candidates are ordered for negotiation:
/// reverse-lexicographic by produces essence, with the default first.
#[derive(Debug)]
pub struct DescriptorGroup<H> {
    path: String,
    method: Method,
    pub(crate) candidates: Vec<Registered<H>>,
}

impl<H> DescriptorGroup<H> {
    fn new(path: String, method: Method) -> Self {
        Self {
            path,
            method,
            candidates: Vec::new(),
        }
    }

    /// Returns the path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the members in negotiation order.
    #[must_use]
    pub fn candidates(&self) -> &[Registered<H>] {
        &self.candidates
    }

    /// Returns the default member, if any.
    #[must_use]
    pub fn default_candidate(&self) -> Option<&Registered<H>> {
        self.candidates.iter().find(|c| c.descriptor.is_default())
    }

    /// Returns the group's shared auth requirement.
    #[must_use]
    pub fn auth_required(&self) -> bool {
        self.candidates
            .first()
            .map_or(true, |c| c.descriptor.auth_required())
    }

    /// `[{consumes, produces}]` for every member, in negotiation order.
    pub(crate) fn available(&self) -> Value {
        Value::Array(
            self.candidates
                .iter()
                .map(|c| {
                    json!({
                        "consumes": c.descriptor.consumes().essence(),
                        "produces": c.descriptor.produces().essence(),
                    })
                })
                .collect(),
        )
    }

    fn check(&self, descriptor: &HandlerDescriptor) -> Result<(), RegistrationError> {
        let duplicate = self.candidates.iter().any(|c| {
            c.descriptor.consumes() == descriptor.consumes()
                && c.descriptor.produces() == descriptor.produces()
        });
        if duplicate {
            return Err(RegistrationError::DuplicateHandler {
                method: self.method.clone(),
                path: self.path.clone(),
                consumes: descriptor.consumes().to_string(),
                produces: descriptor.produces().to_string(),
            });
        }
        if descriptor.is_default() && self.default_candidate().is_some() {
            return Err(RegistrationError::ConflictingDefault {
                method: self.method.clone(),
                path: self.path.clone(),
            });
        }
        if !self.candidates.is_empty() && self.auth_required() != descriptor.auth_required() {
            return Err(RegistrationError::ConflictingAuth {
                method: self.method.clone(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn order_candidates(&mut self) {
        self.candidates
            .sort_by(|a, b| b.descriptor.produces().cmp(a.descriptor.produces()));
        if let Some(pos) = self.candidates.iter().position(|c| c.descriptor.is_default()) {
            self.candidates[..=pos].rotate_right(1);
        }
    }
}

/// Collects registrations before the registry is frozen.
///
/// # Example
///
/// ```
/// use hermes_registry::{HandlerDescriptor, RegistrationError, RegistryBuilder};
/// use http::Method;
///
/// let mut builder = RegistryBuilder::new();
/// builder
///     .register(HandlerDescriptor::builder(Method::GET, "/orders").build()?, "list")
///     .unwrap();
///
/// let dup = builder.register(HandlerDescriptor::builder(Method::GET, "/orders/").build()?, "again");
/// assert!(matches!(dup, Err(RegistrationError::DuplicateHandler { .. })));
///
/// let registry = builder.build();
/// let selected = registry.dispatch("/orders", &Method::GET, None, None).unwrap();
/// assert_eq!(*selected.handler(), "list");
/// # Ok::<(), RegistrationError>(())
/// ```
#[derive(Debug)]
pub struct RegistryBuilder<H> {
    routes: HashMap<String, HashMap<Method, DescriptorGroup<H>>>,
}

impl<H> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<H> RegistryBuilder<H> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler.
    ///
    /// On error the builder is left unchanged.
    pub fn register(
        &mut self,
        descriptor: HandlerDescriptor,
        handler: H,
    ) -> Result<(), RegistrationError> {
        let existing = self
            .routes
            .get(descriptor.path())
            .and_then(|methods| methods.get(descriptor.method()));
        if let Some(group) = existing {
            group.check(&descriptor)?;
        }

        tracing::debug!(
            http.method = %descriptor.method(),
            http.route = %descriptor.path(),
            consumes = %descriptor.consumes(),
            produces = %descriptor.produces(),
            default = descriptor.is_default(),
            "Registered handler"
        );

        let group = self
            .routes
            .entry(descriptor.path().to_string())
            .or_default()
            .entry(descriptor.method().clone())
            .or_insert_with(|| {
                DescriptorGroup::new(descriptor.path().to_string(), descriptor.method().clone())
            });
        group.candidates.push(Registered {
            descriptor: Arc::new(descriptor),
            handler,
        });
        Ok(())
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
            .values()
            .flat_map(HashMap::values)
            .map(|g| g.candidates.len())
            .sum()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Orders every group for negotiation and freezes the index.
    #[must_use]
    pub fn build(mut self) -> Registry<H> {
        for group in self.routes.values_mut().flat_map(HashMap::values_mut) {
            group.order_candidates();
        }
        let registry = Registry {
            routes: self.routes,
        };
        tracing::info!(
            routes = registry.routes.len(),
            handlers = registry.len(),
            "Handler registry built"
        );
        registry
    }
}

/// Read-only index from `(path, method)` to [`DescriptorGroup`].
#[derive(Debug)]
pub struct Registry<H> {
    routes: HashMap<String, HashMap<Method, DescriptorGroup<H>>>,
}

impl<H> Registry<H> {
    /// Returns the group for `(path, method)`.
    #[must_use]
    pub fn group(&self, path: &str, method: &Method) -> Option<&DescriptorGroup<H>> {
        self.routes
            .get(&normalize_path(path))
            .and_then(|methods| methods.get(method))
    }

    /// Iterates over every group.
    pub fn groups(&self) -> impl Iterator<Item = &DescriptorGroup<H>> {
        self.routes.values().flat_map(HashMap::values)
    }

    /// Returns the sorted methods registered for `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Option<Vec<String>> {
        self.routes.get(&normalize_path(path)).map(|methods| {
            let mut allowed: Vec<String> = methods.keys().map(|m| m.as_str().to_string()).collect();
            allowed.sort();
            allowed
        })
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups().map(|g| g.candidates.len()).sum()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selects the handler for a request.
    ///
    /// Unknown paths fail with `RouteNotFound`, known paths with an
    /// unregistered method with `MethodNotAllowed`. Within the group,
    /// selection follows [`DescriptorGroup::negotiate`].
    pub fn dispatch(
        &self,
        path: &str,
        method: &Method,
        accept: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<&Registered<H>, NegotiationError> {
        let path = normalize_path(path);
        let methods = self
            .routes
            .get(&path)
            .ok_or_else(|| NegotiationError::RouteNotFound { path: path.clone() })?;
        let group = methods.get(method).ok_or_else(|| {
            let mut allowed: Vec<String> = methods.keys().map(|m| m.as_str().to_string()).collect();
            allowed.sort();
            NegotiationError::MethodNotAllowed {
                method: method.clone(),
                allowed,
            }
        })?;
        group.negotiate(accept, content_type)
    }
}
