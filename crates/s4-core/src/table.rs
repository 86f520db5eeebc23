//! Generic functions and their method signatures.
//!
//! A generic owns its signatures exclusively. Registering a method whose
//! class tuple matches an existing signature replaces it, the same way a
//! later `setMethod` overrides an earlier one. Handlers are not stored here;
//! the table only knows which tuples exist and which id each one carries.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::class::{render_signature, ClassName, GenericId, MethodId};
use crate::error::DispatchError;

/// A registered method: one class per dispatch parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub id: MethodId,
    /// The generic this method belongs to.
    pub generic: String,
    pub classes: Vec<ClassName>,
}

impl MethodSignature {
    /// Canonical rendering of the class tuple (`A1#A2`).
    pub fn render(&self) -> String {
        render_signature(&self.classes)
    }
}

/// A generic function.
#[derive(Clone, Debug)]
pub struct GenericFunction {
    pub id: GenericId,
    pub name: String,
    /// Dispatch parameter names, in call order.
    pub params: Vec<String>,
    methods: Vec<MethodSignature>,
}

impl GenericFunction {
    /// Number of dispatched arguments.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Registered signatures in registration order.
    pub fn signatures(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// The signature registered for exactly this class tuple.
    pub fn find(&self, classes: &[ClassName]) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.classes == classes)
    }

    fn check_arity(&self, found: usize) -> Result<(), DispatchError> {
        if found != self.arity() {
            return Err(DispatchError::ArityMismatch {
                generic: self.name.clone(),
                expected: self.arity(),
                found,
            });
        }
        Ok(())
    }
}

/// Outcome of [`MethodTable::register_method`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodAdded {
    pub id: MethodId,
    /// The method previously registered for the same class tuple.
    pub replaced: Option<MethodSignature>,
}

/// All generic functions, keyed by name.
#[derive(Debug, Default)]
pub struct MethodTable {
    generics: FxHashMap<String, GenericFunction>,
    /// Method id -> owning generic name.
    owners: FxHashMap<MethodId, String>,
    next_generic: u32,
    next_method: u32,
}

impl MethodTable {
    /// Create an empty method table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generic, or rename the parameters of an existing one.
    ///
    /// Re-registering with the same arity keeps the id and every method.
    /// A different arity fails with `DuplicateGeneric`; zero parameters fail
    /// with `ArityMismatch` since there would be nothing to dispatch on.
    pub fn register_generic<I, S>(&mut self, name: &str, params: I) -> Result<GenericId, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        if params.is_empty() {
            return Err(DispatchError::ArityMismatch {
                generic: name.to_string(),
                expected: 1,
                found: 0,
            });
        }

        if let Some(existing) = self.generics.get_mut(name) {
            if existing.arity() != params.len() {
                return Err(DispatchError::DuplicateGeneric {
                    name: name.to_string(),
                    existing_arity: existing.arity(),
                    requested_arity: params.len(),
                });
            }
            existing.params = params;
            tracing::debug!(generic = name, "redefined generic");
            return Ok(existing.id);
        }

        let id = GenericId(self.next_generic);
        self.next_generic += 1;
        tracing::debug!(generic = name, arity = params.len(), "registered generic");
        self.generics.insert(
            name.to_string(),
            GenericFunction {
                id,
                name: name.to_string(),
                params,
                methods: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Register a method for `generic` on `classes`.
    pub fn register_method(
        &mut self,
        generic: &str,
        classes: Vec<ClassName>,
    ) -> Result<MethodAdded, DispatchError> {
        let gf = self
            .generics
            .get_mut(generic)
            .ok_or_else(|| DispatchError::UnknownGeneric {
                name: generic.to_string(),
            })?;
        gf.check_arity(classes.len())?;

        let id = MethodId(self.next_method);
        self.next_method += 1;

        let replaced = match gf.methods.iter().position(|m| m.classes == classes) {
            Some(pos) => Some(gf.methods.remove(pos)),
            None => None,
        };
        if let Some(old) = &replaced {
            self.owners.remove(&old.id);
        }

        tracing::debug!(
            generic,
            signature = %render_signature(&classes),
            method = id.0,
            replaced = replaced.is_some(),
            "registered method"
        );
        gf.methods.push(MethodSignature {
            id,
            generic: generic.to_string(),
            classes,
        });
        self.owners.insert(id, generic.to_string());

        Ok(MethodAdded { id, replaced })
    }

    /// Remove the method registered for exactly `classes`.
    ///
    /// Returns the removed signature, or `None` if no such method existed.
    pub fn remove_method(
        &mut self,
        generic: &str,
        classes: &[ClassName],
    ) -> Result<Option<MethodSignature>, DispatchError> {
        let gf = self
            .generics
            .get_mut(generic)
            .ok_or_else(|| DispatchError::UnknownGeneric {
                name: generic.to_string(),
            })?;
        gf.check_arity(classes.len())?;

        let removed = match gf.methods.iter().position(|m| m.classes == classes) {
            Some(pos) => Some(gf.methods.remove(pos)),
            None => None,
        };
        if let Some(old) = &removed {
            self.owners.remove(&old.id);
            tracing::debug!(generic, signature = %old.render(), "removed method");
        }
        Ok(removed)
    }

    /// Look up a generic by name.
    pub fn get(&self, name: &str) -> Option<&GenericFunction> {
        self.generics.get(name)
    }

    /// Look up a generic, failing with `UnknownGeneric`.
    pub fn generic(&self, name: &str) -> Result<&GenericFunction, DispatchError> {
        self.generics
            .get(name)
            .ok_or_else(|| DispatchError::UnknownGeneric {
                name: name.to_string(),
            })
    }

    /// All signatures of a generic. Their order carries no meaning.
    pub fn signatures_for(&self, generic: &str) -> Result<&[MethodSignature], DispatchError> {
        Ok(self.generic(generic)?.signatures())
    }

    /// Whether a method is registered for exactly `classes`.
    pub fn exists_method(&self, generic: &str, classes: &[ClassName]) -> Result<bool, DispatchError> {
        Ok(self.generic(generic)?.find(classes).is_some())
    }

    /// Signatures sorted by canonical rendering, for listings.
    pub fn show_methods(&self, generic: &str) -> Result<Vec<MethodSignature>, DispatchError> {
        let mut methods = self.signatures_for(generic)?.to_vec();
        methods.sort_by(|a, b| {
            a.render()
                .cmp(&b.render())
                .then_with(|| a.classes.cmp(&b.classes))
        });
        Ok(methods)
    }

    /// Find a method by id.
    pub fn method(&self, id: MethodId) -> Option<&MethodSignature> {
        let owner = self.owners.get(&id)?;
        self.generics
            .get(owner)?
            .methods
            .iter()
            .find(|m| m.id == id)
    }

    /// Generic names, sorted.
    pub fn generic_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generics.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
