//! Registry of compiled schema types and global element declarations.

use std::collections::{HashMap, HashSet};

use super::types::{QName, SchemaType, ValueKind};
use crate::error::{BindingError, Result};

/// Registry mapping qualified type names to their compiled descriptors.
///
/// Populated once at startup, then shared read-only (behind an `Arc`) by
/// every binder. Global elements map a root tag to the type it binds to.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<QName, SchemaType>,
    elements: HashMap<QName, QName>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema type under its qualified name.
    ///
    /// # Errors
    /// Returns `DuplicateType` if a type with the same name exists.
    pub fn register(&mut self, schema_type: SchemaType) -> Result<()> {
        let name = schema_type.name().clone();
        if self.types.contains_key(&name) {
            return Err(BindingError::DuplicateType(name));
        }
        tracing::debug!(
            type_name = %name,
            elements = schema_type.elements().len(),
            attributes = schema_type.attributes().len(),
            states = schema_type.automaton().state_count(),
            "Registered schema type"
        );
        self.types.insert(name, schema_type);
        Ok(())
    }

    /// Declare a global element whose content is `type_name`.
    ///
    /// # Errors
    /// Returns `DuplicateElement` if the element is already declared and
    /// `UnknownType` if `type_name` has not been registered yet.
    pub fn register_element(&mut self, element: QName, type_name: QName) -> Result<()> {
        if self.elements.contains_key(&element) {
            return Err(BindingError::DuplicateElement(element));
        }
        if !self.types.contains_key(&type_name) {
            return Err(BindingError::UnknownType(type_name));
        }
        tracing::debug!(element = %element, type_name = %type_name, "Declared global element");
        self.elements.insert(element, type_name);
        Ok(())
    }

    /// Look up a schema type by qualified name.
    ///
    /// # Errors
    /// Returns `UnknownType` if no such type is registered.
    pub fn lookup(&self, name: &QName) -> Result<&SchemaType> {
        self.types
            .get(name)
            .ok_or_else(|| BindingError::UnknownType(name.clone()))
    }

    #[must_use]
    pub fn contains(&self, name: &QName) -> bool {
        self.types.contains_key(name)
    }

    /// Type bound to a global element, if declared.
    #[must_use]
    pub fn element_type(&self, element: &QName) -> Option<&QName> {
        self.elements.get(element)
    }

    /// Resolve a document root to its global element declaration.
    ///
    /// An exact match wins. A root without namespace falls back to the one
    /// declared element with that local name, so `<books>` resolves to
    /// `{urn:books}books` as long as that is unambiguous.
    #[must_use]
    pub fn resolve_element(&self, namespace: Option<&str>, local: &str) -> Option<&QName> {
        let exact = match namespace {
            Some(ns) => QName::new(ns, local),
            None => QName::unqualified(local),
        };
        if let Some((element, _)) = self.elements.get_key_value(&exact) {
            return Some(element);
        }
        if namespace.is_some() {
            return None;
        }

        let mut candidates = self.elements.keys().filter(|e| e.local_name() == local);
        match (candidates.next(), candidates.next()) {
            (Some(element), None) => Some(element),
            _ => None,
        }
    }

    /// Global elements declared with the given content type, sorted by name.
    #[must_use]
    pub fn elements_of(&self, type_name: &QName) -> Vec<&QName> {
        let mut elements: Vec<_> = self
            .elements
            .iter()
            .filter(|(_, t)| *t == type_name)
            .map(|(e, _)| e)
            .collect();
        elements.sort();
        elements
    }

    /// All declared global elements, sorted by name.
    #[must_use]
    pub fn declared_elements(&self) -> Vec<&QName> {
        let mut elements: Vec<_> = self.elements.keys().collect();
        elements.sort();
        elements
    }

    /// Return set of all registered type names.
    #[must_use]
    pub fn registered_types(&self) -> HashSet<&QName> {
        self.types.keys().collect()
    }

    /// Check that every nested field and global element refers to a
    /// registered type.
    ///
    /// # Errors
    /// Returns `UnknownType` for the first dangling reference found.
    pub fn validate_references(&self) -> Result<()> {
        let nested = self
            .types
            .values()
            .flat_map(|t| t.elements())
            .filter_map(|f| match &f.kind {
                ValueKind::Complex(name) => Some(name),
                _ => None,
            });

        for name in nested.chain(self.elements.values()) {
            if !self.types.contains_key(name) {
                return Err(BindingError::UnknownType(name.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
