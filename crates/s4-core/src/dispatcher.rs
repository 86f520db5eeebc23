//! The dispatcher: registries, cache and handlers behind one API.
//!
//! `Dispatcher<V>` is what a host object system embeds. `V` is whatever the
//! host passes as call arguments and gets back as results; the dispatcher
//! never inspects it. Every value's class travels separately as a
//! [`ClassName`].
//!
//! Locking: the hierarchy and the method store each sit behind a
//! `parking_lot::RwLock`, always acquired in that order. Resolution keeps
//! both read guards while it fills the cache and registration holds its
//! write guard while it invalidates, so a stale outcome never reaches the
//! cache. The winning handler is cloned out under the same guards that
//! produced (or validated) the resolution. Handlers run with no lock held
//! and may dispatch recursively.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::cache::{CacheStats, DispatchCache};
use crate::class::{ClassId, ClassName, GenericId, MethodId};
use crate::config::DispatchConfig;
use crate::error::{AmbiguousDispatch, DispatchError};
use crate::hierarchy::{ClassDef, ClassHierarchy, ClassNode, Registered};
use crate::resolve::{self, Resolution};
use crate::table::{MethodSignature, MethodTable};

/// A method body.
///
/// Receives the call context (for `call_next`) and the call arguments.
pub type Handler<V> = Arc<dyn Fn(&CallContext<'_, V>, &[V]) -> Result<V, DispatchError> + Send + Sync>;

/// What a running handler knows about its own invocation.
pub struct CallContext<'a, V> {
    dispatcher: &'a Dispatcher<V>,
    resolution: &'a Resolution,
    classes: &'a [ClassName],
}

impl<'a, V> CallContext<'a, V> {
    pub fn generic(&self) -> &str {
        &self.resolution.generic
    }

    /// The id of the executing method.
    pub fn method(&self) -> MethodId {
        self.resolution.method
    }

    /// The executing method's declared classes.
    pub fn signature(&self) -> &[ClassName] {
        &self.resolution.signature
    }

    /// The concrete classes the call was dispatched on.
    pub fn classes(&self) -> &[ClassName] {
        self.classes
    }

    /// Invoke the next less specific method with `args`.
    pub fn call_next(&self, args: &[V]) -> Result<V, DispatchError> {
        self.dispatcher.call_next(self.method(), self.classes, args)
    }

    /// Build a handler failure attributed to this generic.
    pub fn fail(&self, message: impl Into<String>) -> DispatchError {
        DispatchError::Handler {
            generic: self.generic().to_string(),
            message: message.into(),
        }
    }
}

struct MethodStore<V> {
    table: MethodTable,
    handlers: FxHashMap<MethodId, Handler<V>>,
}

/// Class registry, method table, dispatch cache and handlers.
pub struct Dispatcher<V> {
    config: DispatchConfig,
    classes: RwLock<ClassHierarchy>,
    methods: RwLock<MethodStore<V>>,
    cache: DispatchCache,
    warnings: Mutex<Vec<AmbiguousDispatch>>,
}

impl<V> std::fmt::Debug for Dispatcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<V> Default for Dispatcher<V> {
    fn default() -> Self {
        Self::with_config(DispatchConfig::default())
    }
}

impl<V> Dispatcher<V> {
    /// An empty dispatcher with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Dispatcher {
            config,
            classes: RwLock::new(ClassHierarchy::new()),
            methods: RwLock::new(MethodStore {
                table: MethodTable::new(),
                handlers: FxHashMap::default(),
            }),
            cache: DispatchCache::new(),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    // ── Classes ────────────────────────────────────────────────────────

    /// Define (or redefine) an unsealed class.
    pub fn define_class<I, S>(&self, name: impl Into<ClassName>, parents: I) -> Result<ClassId, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassName>,
    {
        self.define_class_with(ClassDef::new(name, parents))
            .map(|registered| registered.id)
    }

    /// Define a class from a full definition, returning what it replaced.
    pub fn define_class_with(&self, def: ClassDef) -> Result<Registered, DispatchError> {
        let mut classes = self.classes.write();
        let registered = classes.register(def)?;
        self.cache.clear();
        Ok(registered)
    }

    /// Define a class union that every member extends.
    pub fn define_union<I, S>(&self, name: impl Into<ClassName>, members: I) -> Result<ClassId, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassName>,
    {
        let mut classes = self.classes.write();
        let registered = classes.register_union(name, members)?;
        self.cache.clear();
        Ok(registered.id)
    }

    pub fn class(&self, name: &str) -> Option<ClassNode> {
        self.classes.read().get(name).cloned()
    }

    pub fn distance(&self, from: &str, to: &str) -> Option<u32> {
        self.classes.read().distance(from, to)
    }

    pub fn is_ancestor(&self, from: &str, to: &str) -> bool {
        self.classes.read().is_ancestor(from, to)
    }

    /// Every ancestor of `class` with its distance, nearest first.
    pub fn ancestors(&self, class: &str) -> Vec<(ClassName, u32)> {
        self.classes.read().ancestors(class)
    }

    // ── Generics and methods ───────────────────────────────────────────

    pub fn define_generic<I, S>(&self, name: &str, params: I) -> Result<GenericId, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = self.methods.write();
        let id = store.table.register_generic(name, params)?;
        self.cache.invalidate_generic(name);
        Ok(id)
    }

    /// Register `handler` for `generic` on `classes`, replacing any method
    /// already registered for that exact tuple.
    pub fn define_method<F>(&self, generic: &str, classes: Vec<ClassName>, handler: F) -> Result<MethodId, DispatchError>
    where
        F: Fn(&CallContext<'_, V>, &[V]) -> Result<V, DispatchError> + Send + Sync + 'static,
    {
        let mut store = self.methods.write();
        let added = store.table.register_method(generic, classes)?;
        if let Some(replaced) = &added.replaced {
            store.handlers.remove(&replaced.id);
        }
        store.handlers.insert(added.id, Arc::new(handler));
        self.cache.invalidate_generic(generic);
        Ok(added.id)
    }

    /// Remove the method registered for exactly `classes`. Returns whether
    /// one existed.
    pub fn remove_method(&self, generic: &str, classes: &[ClassName]) -> Result<bool, DispatchError> {
        let mut store = self.methods.write();
        let removed = store.table.remove_method(generic, classes)?;
        if let Some(old) = &removed {
            store.handlers.remove(&old.id);
            self.cache.invalidate_generic(generic);
        }
        Ok(removed.is_some())
    }

    /// Whether a method is registered for exactly `classes`.
    pub fn exists_method(&self, generic: &str, classes: &[ClassName]) -> Result<bool, DispatchError> {
        self.methods.read().table.exists_method(generic, classes)
    }

    /// Whether any method, inherited or not, applies to `classes`.
    pub fn has_method(&self, generic: &str, classes: &[ClassName]) -> Result<bool, DispatchError> {
        let hierarchy = self.classes.read();
        let store = self.methods.read();
        let gf = store.table.generic(generic)?;
        match resolve::resolve(&hierarchy, gf, classes) {
            Ok(_) => Ok(true),
            Err(DispatchError::NoApplicableMethod { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// The generic's signatures sorted by canonical rendering.
    pub fn show_methods(&self, generic: &str) -> Result<Vec<MethodSignature>, DispatchError> {
        self.methods.read().table.show_methods(generic)
    }

    /// Parameter names of a generic.
    pub fn generic_params(&self, generic: &str) -> Result<Vec<String>, DispatchError> {
        Ok(self.methods.read().table.generic(generic)?.params.clone())
    }

    pub fn generic_names(&self) -> Vec<String> {
        self.methods
            .read()
            .table
            .generic_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // ── Dispatch ───────────────────────────────────────────────────────

    /// Resolve without invoking, consulting and filling the cache.
    pub fn select_method(&self, generic: &str, classes: &[ClassName]) -> Result<Resolution, DispatchError> {
        self.select_handler(generic, classes)
            .map(|(resolution, _)| resolution)
    }

    /// Resolve the best method for `classes` and run it on `args`.
    ///
    /// The handler's result, success or error, is returned unchanged.
    pub fn dispatch(&self, generic: &str, classes: &[ClassName], args: &[V]) -> Result<V, DispatchError> {
        self.dispatch_resolved(generic, classes, args)
            .map(|(_, value)| value)
    }

    /// Like [`dispatch`](Self::dispatch), also returning the resolution the
    /// handler ran under.
    pub fn dispatch_resolved(
        &self,
        generic: &str,
        classes: &[ClassName],
        args: &[V],
    ) -> Result<(Resolution, V), DispatchError> {
        let (resolution, handler) = self.select_handler(generic, classes)?;
        let value = self.invoke(&resolution, handler, classes, args)?;
        Ok((resolution, value))
    }

    /// Run the method that would have been chosen had `current` not existed.
    pub fn call_next(&self, current: MethodId, classes: &[ClassName], args: &[V]) -> Result<V, DispatchError> {
        let (resolution, handler) = {
            let hierarchy = self.classes.read();
            let store = self.methods.read();
            let signature = store
                .table
                .method(current)
                .ok_or(DispatchError::UnknownMethod { method: current })?;
            let gf = store.table.generic(&signature.generic)?;
            let resolution = resolve::resolve_next(&hierarchy, gf, classes, current)?;
            let handler = handler_for(&store, &resolution)?;
            (resolution, handler)
        };
        if let Some(warning) = &resolution.ambiguity {
            self.report(warning);
        }
        self.invoke(&resolution, handler, classes, args)
    }

    /// Drain the ambiguity warnings recorded so far.
    ///
    /// A warning is recorded when an ambiguous outcome is computed, not on
    /// every cache hit that returns it.
    pub fn take_warnings(&self) -> Vec<AmbiguousDispatch> {
        std::mem::take(&mut *self.warnings.lock())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve and fetch the winning handler under one set of read guards,
    /// so a concurrent replacement or removal cannot strand the id.
    fn select_handler(&self, generic: &str, classes: &[ClassName]) -> Result<(Resolution, Handler<V>), DispatchError> {
        if self.config.cache {
            let store = self.methods.read();
            if let Some(hit) = self.cache.get(generic, classes) {
                if let Some(handler) = store.handlers.get(&hit.method) {
                    tracing::debug!(generic, method = hit.method.0, "dispatch cache hit");
                    return Ok((hit, Arc::clone(handler)));
                }
                tracing::debug!(generic, method = hit.method.0, "stale dispatch cache entry");
            }
        }

        let hierarchy = self.classes.read();
        let store = self.methods.read();
        let gf = store.table.generic(generic)?;
        tracing::debug!(generic, candidates = gf.signatures().len(), "dispatch cache miss");
        let resolution = resolve::resolve(&hierarchy, gf, classes)?;
        let handler = handler_for(&store, &resolution)?;
        if let Some(warning) = &resolution.ambiguity {
            self.report(warning);
        }
        if self.config.cache {
            self.cache.insert(classes.to_vec(), resolution.clone());
        }
        Ok((resolution, handler))
    }

    fn invoke(
        &self,
        resolution: &Resolution,
        handler: Handler<V>,
        classes: &[ClassName],
        args: &[V],
    ) -> Result<V, DispatchError> {
        let ctx = CallContext {
            dispatcher: self,
            resolution,
            classes,
        };
        handler(&ctx, args)
    }

    fn report(&self, warning: &AmbiguousDispatch) {
        if !self.config.warn_ambiguous {
            return;
        }
        tracing::warn!(generic = %warning.generic, "{}", warning);
        self.warnings.lock().push(warning.clone());
    }
}

fn handler_for<V>(store: &MethodStore<V>, resolution: &Resolution) -> Result<Handler<V>, DispatchError> {
    store
        .handlers
        .get(&resolution.method)
        .cloned()
        .ok_or(DispatchError::UnknownMethod {
            method: resolution.method,
        })
}
