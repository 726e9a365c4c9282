//! Structural descriptors for schema-defined complex types.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use super::automaton::ContentAutomaton;
use crate::error::{BindingError, Result};

/// Qualified name `{namespace}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    /// Create a name in the given namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Create a name without namespace.
    #[must_use]
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Parse Clark notation (`{urn:books}BooksForm`) or a bare local name.
    ///
    /// # Examples
    /// ```
    /// use defpi_binding::QName;
    ///
    /// let name = QName::parse("{urn:books}BooksForm");
    /// assert_eq!(name.namespace(), Some("urn:books"));
    /// assert_eq!(name.local_name(), "BooksForm");
    /// assert_eq!(QName::parse("book").namespace(), None);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix('{') {
            if let Some((namespace, local)) = rest.split_once('}') {
                if !namespace.is_empty() {
                    return Self::new(namespace, local);
                }
                return Self::unqualified(local);
            }
        }
        Self::unqualified(text)
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Declared value kind of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// `xs:string`, kept verbatim.
    String,
    /// `xs:float` / `xs:double`.
    Float,
    /// `xs:integer` and friends.
    Integer,
    /// `xs:boolean`.
    Boolean,
    /// `xs:date` without timezone.
    Date,
    /// Nested complex type.
    Complex(QName),
}

impl ValueKind {
    /// Short name used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Complex(_) => "complex",
        }
    }

    #[must_use]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }
}

/// Occurrence constraint of an element field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
    /// Explicit `minOccurs` / `maxOccurs`; `max: None` is unbounded.
    Range { min: u32, max: Option<u32> },
}

impl Cardinality {
    #[must_use]
    pub fn min(self) -> u32 {
        match self {
            Self::ExactlyOne | Self::OneOrMore => 1,
            Self::ZeroOrOne | Self::ZeroOrMore => 0,
            Self::Range { min, .. } => min,
        }
    }

    #[must_use]
    pub fn max(self) -> Option<u32> {
        match self {
            Self::ExactlyOne | Self::ZeroOrOne => Some(1),
            Self::ZeroOrMore | Self::OneOrMore => None,
            Self::Range { max, .. } => max,
        }
    }

    /// Whether the field binds to a list rather than a single value.
    #[must_use]
    pub fn is_repeatable(self) -> bool {
        self.max() != Some(1)
    }

    /// Whether the field may be absent.
    #[must_use]
    pub fn is_optional(self) -> bool {
        self.min() == 0
    }

    fn is_consistent(self) -> bool {
        match self.max() {
            Some(max) => max >= 1 && max >= self.min(),
            None => true,
        }
    }
}

/// Element slot of a complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
    pub cardinality: Cardinality,
}

/// Attribute slot of a complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
}

/// Compiled structural description of one complex type.
#[derive(Debug, Clone)]
pub struct SchemaType {
    name: QName,
    elements: Vec<FieldDescriptor>,
    attributes: Vec<AttributeDescriptor>,
    automaton: ContentAutomaton,
}

impl SchemaType {
    /// Start describing a type.
    #[must_use]
    pub fn builder(name: QName) -> SchemaTypeBuilder {
        SchemaTypeBuilder {
            name,
            elements: Vec::new(),
            attributes: Vec::new(),
            automaton: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Element fields in declaration order.
    #[must_use]
    pub fn elements(&self) -> &[FieldDescriptor] {
        &self.elements
    }

    /// Attribute fields in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    #[must_use]
    pub fn automaton(&self) -> &ContentAutomaton {
        &self.automaton
    }

    /// Find an element field by name.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&FieldDescriptor> {
        self.elements.iter().find(|f| f.name == name)
    }

    /// Find an attribute field by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Builder for [`SchemaType`].
///
/// When no automaton is supplied, the element fields are treated as an
/// `xs:sequence` and [`ContentAutomaton::sequence`] derives the table.
#[derive(Debug)]
pub struct SchemaTypeBuilder {
    name: QName,
    elements: Vec<FieldDescriptor>,
    attributes: Vec<AttributeDescriptor>,
    automaton: Option<ContentAutomaton>,
}

impl SchemaTypeBuilder {
    /// Declare the next element field.
    #[must_use]
    pub fn element(
        mut self,
        name: impl Into<String>,
        kind: ValueKind,
        cardinality: Cardinality,
    ) -> Self {
        self.elements.push(FieldDescriptor {
            name: name.into(),
            kind,
            cardinality,
        });
        self
    }

    /// Declare an attribute field.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, kind: ValueKind, required: bool) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.into(),
            kind,
            required,
        });
        self
    }

    /// Use a precompiled content automaton instead of the derived sequence.
    #[must_use]
    pub fn automaton(mut self, automaton: ContentAutomaton) -> Self {
        self.automaton = Some(automaton);
        self
    }

    /// Validate the descriptors and build the type.
    ///
    /// # Errors
    /// Returns `InvalidSchemaType` when field names collide, an attribute is
    /// complex-typed, a cardinality is unsatisfiable, or the automaton does
    /// not line up with the element fields.
    pub fn build(self) -> Result<SchemaType> {
        let invalid = |reason: String| BindingError::InvalidSchemaType {
            type_name: self.name.clone(),
            reason,
        };

        let mut seen = HashSet::new();
        let names = self
            .elements
            .iter()
            .map(|f| &f.name)
            .chain(self.attributes.iter().map(|a| &a.name));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("duplicate field '{name}'")));
            }
        }

        if let Some(field) = self
            .elements
            .iter()
            .find(|f| !f.cardinality.is_consistent())
        {
            return Err(invalid(format!(
                "unsatisfiable cardinality on '{}'",
                field.name
            )));
        }

        if let Some(attr) = self.attributes.iter().find(|a| a.kind.is_complex()) {
            return Err(invalid(format!(
                "attribute '{}' cannot have a complex type",
                attr.name
            )));
        }

        let automaton = match self.automaton {
            Some(automaton) => automaton,
            None => ContentAutomaton::sequence(&self.elements),
        };
        automaton
            .check_fields(&self.elements)
            .map_err(invalid)?;

        Ok(SchemaType {
            name: self.name,
            elements: self.elements,
            attributes: self.attributes,
            automaton,
        })
    }
}
