//! Binding raw XML documents to typed instances, and rendering them back.
//!
//! Binding is all-or-nothing: either every cardinality and value constraint
//! of the schema type holds and a [`DocumentInstance`] is returned, or the
//! first violation is reported as a [`BindingError`]. Child elements must
//! share the namespace of their parent; attributes must be unqualified
//! (`xsi:*` attributes are skipped).

use std::sync::Arc;

use chrono::NaiveDate;
use roxmltree::{Document, Node};

use crate::config::{DATE_PATTERN, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, XSI_NAMESPACE};
use crate::error::{BindingError, Result};
use crate::schema::{
    FieldDescriptor, FinishError, QName, Run, SchemaType, StepError, TypeRegistry, ValueKind,
};
use crate::value::{DocumentInstance, Value, DATE_FORMAT};
use crate::xml::{
    collect_text, element_children, escape_attribute, escape_text, get_tag_name,
    has_significant_text,
};

/// Validating binder over a shared, fully populated type registry.
///
/// Cheap to clone and safe to use from many connection handlers at once.
#[derive(Debug, Clone)]
pub struct Binder {
    registry: Arc<TypeRegistry>,
    max_document_size: usize,
}

impl Binder {
    /// Create a binder with the default size limit.
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }

    /// Override the maximum accepted document size in bytes.
    #[must_use]
    pub fn with_max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn max_document_size(&self) -> usize {
        self.max_document_size
    }

    /// Bind a document against an explicit root type.
    ///
    /// If global elements are declared for the type, the root element must
    /// be one of them.
    ///
    /// # Errors
    /// Returns the first syntax, structure or value violation found.
    pub fn bind(&self, raw: &str, root_type: &QName) -> Result<DocumentInstance> {
        self.check_size(raw.len())?;
        let doc = Document::parse(raw)?;
        let schema = self.registry.lookup(root_type)?;
        let root = doc.root_element();
        self.check_root(root, schema)?;

        let instance = self.bind_element(root, schema, 0)?;
        tracing::trace!(root_type = %root_type, element = instance.element(), "Bound document");
        Ok(instance)
    }

    /// Bind a document whose root type follows from its root element.
    ///
    /// # Errors
    /// Returns `UnexpectedElement` when the root is not a declared global
    /// element, plus everything [`Binder::bind`] can return.
    pub fn bind_document(&self, raw: &str) -> Result<DocumentInstance> {
        self.check_size(raw.len())?;
        let doc = Document::parse(raw)?;
        let root = doc.root_element();
        let tag = get_tag_name(root);

        let type_name = self
            .registry
            .resolve_element(root.tag_name().namespace(), tag)
            .and_then(|element| self.registry.element_type(element))
            .ok_or_else(|| BindingError::UnexpectedElement {
                tag: tag.to_string(),
                parent: None,
                expected: local_names(self.registry.declared_elements()),
            })?;
        let schema = self.registry.lookup(type_name)?;

        let instance = self.bind_element(root, schema, 0)?;
        tracing::trace!(root_type = %type_name, element = tag, "Bound document");
        Ok(instance)
    }

    /// Decode UTF-8 payload bytes and bind them with [`Binder::bind_document`].
    ///
    /// # Errors
    /// Returns `Encoding` for invalid UTF-8, plus everything
    /// [`Binder::bind_document`] can return.
    pub fn bind_bytes(&self, bytes: &[u8]) -> Result<DocumentInstance> {
        self.check_size(bytes.len())?;
        let raw = std::str::from_utf8(bytes)?;
        self.bind_document(raw)
    }

    /// Decode UTF-8 payload bytes and bind them with [`Binder::bind`].
    ///
    /// # Errors
    /// Returns `DocumentTooLarge` before decoding and `Encoding` for invalid
    /// UTF-8, plus everything [`Binder::bind`] can return.
    pub fn bind_bytes_as(&self, bytes: &[u8], root_type: &QName) -> Result<DocumentInstance> {
        self.check_size(bytes.len())?;
        let raw = std::str::from_utf8(bytes)?;
        self.bind(raw, root_type)
    }

    /// Render an instance back to compact XML.
    ///
    /// Attributes and child elements follow the declaration order of the
    /// schema type. A namespaced root is written with a default namespace
    /// declaration, so the output binds back to an equal instance.
    ///
    /// # Errors
    /// Returns `InvalidInstance` when the instance does not fit its type.
    pub fn render(&self, instance: &DocumentInstance) -> Result<String> {
        let schema = self.registry.lookup(instance.type_name())?;
        let mut out = String::new();
        let namespace = instance.namespace();
        self.render_element(instance.element(), instance, schema, namespace, &mut out, 0)?;
        Ok(out)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_document_size {
            return Err(BindingError::DocumentTooLarge {
                size,
                max: self.max_document_size,
            });
        }
        Ok(())
    }

    fn check_root(&self, root: Node<'_, '_>, schema: &SchemaType) -> Result<()> {
        let declared = self.registry.elements_of(schema.name());
        if declared.is_empty() {
            return Ok(());
        }

        let tag = get_tag_name(root);
        let matches = self
            .registry
            .resolve_element(root.tag_name().namespace(), tag)
            .and_then(|element| self.registry.element_type(element))
            .is_some_and(|type_name| type_name == schema.name());
        if matches {
            Ok(())
        } else {
            Err(BindingError::UnexpectedElement {
                tag: tag.to_string(),
                parent: None,
                expected: local_names(declared),
            })
        }
    }

    fn bind_element(
        &self,
        node: Node<'_, '_>,
        schema: &SchemaType,
        depth: usize,
    ) -> Result<DocumentInstance> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(BindingError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }

        let tag = get_tag_name(node);
        if has_significant_text(node) {
            return Err(BindingError::MixedContent {
                element: tag.to_string(),
            });
        }

        let namespace = node.tag_name().namespace();
        let children: Vec<Node<'_, '_>> = element_children(node).collect();
        let tags: Vec<&str> = children.iter().map(|child| get_tag_name(*child)).collect();
        let fields = schema.elements();
        let mut occurrences: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];

        let mut run = schema.automaton().start();
        for (position, child) in children.iter().enumerate() {
            if child.tag_name().namespace() != namespace {
                return Err(BindingError::UnexpectedElement {
                    tag: qualified_name(child.tag_name().namespace(), tags[position]),
                    parent: Some(tag.to_string()),
                    expected: run.expected(),
                });
            }
            match run.step(tags[position]) {
                Ok(index) => {
                    let value = self.bind_field(*child, &fields[index], depth)?;
                    occurrences[index].push(value);
                }
                Err(err) => return Err(step_error(err, &run, tag, &tags[position..], fields)),
            }
        }
        if let Err(err) = run.finish() {
            return Err(finish_error(err, &run, tag, fields));
        }

        let mut instance = DocumentInstance::new(schema.name().clone(), tag);
        instance.set_namespace(namespace.map(str::to_string));
        self.bind_attributes(node, schema, &mut instance)?;

        for (field, mut values) in fields.iter().zip(occurrences) {
            if field.cardinality.is_repeatable() {
                instance.set(field.name.as_str(), Value::List(values));
            } else if values.len() > 1 {
                return Err(BindingError::TooManyOccurrences {
                    element: tag.to_string(),
                    field: field.name.clone(),
                    max: 1,
                });
            } else if let Some(value) = values.pop() {
                instance.set(field.name.as_str(), value);
            }
        }

        Ok(instance)
    }

    fn bind_attributes(
        &self,
        node: Node<'_, '_>,
        schema: &SchemaType,
        instance: &mut DocumentInstance,
    ) -> Result<()> {
        let tag = get_tag_name(node);

        for attr in node.attributes() {
            let descriptor = match attr.namespace() {
                Some(XSI_NAMESPACE) => continue,
                Some(_) => None,
                None => schema.attribute(attr.name()),
            };
            let descriptor = descriptor.ok_or_else(|| BindingError::UnexpectedAttribute {
                element: tag.to_string(),
                attribute: qualified_name(attr.namespace(), attr.name()),
            })?;
            let value = convert_scalar(attr.value(), &descriptor.kind, &descriptor.name)?;
            instance.set(descriptor.name.as_str(), value);
        }

        if let Some(missing) = schema
            .attributes()
            .iter()
            .find(|a| a.required && instance.get(&a.name).is_none())
        {
            return Err(BindingError::MissingAttribute {
                element: tag.to_string(),
                attribute: missing.name.clone(),
            });
        }
        Ok(())
    }

    fn bind_field(
        &self,
        node: Node<'_, '_>,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<Value> {
        if let ValueKind::Complex(type_name) = &field.kind {
            let nested = self.registry.lookup(type_name)?;
            return Ok(Value::Document(self.bind_element(node, nested, depth + 1)?));
        }

        if let Some(child) = element_children(node).next() {
            return Err(BindingError::UnexpectedElement {
                tag: get_tag_name(child).to_string(),
                parent: Some(field.name.clone()),
                expected: Vec::new(),
            });
        }
        if let Some(attr) = node
            .attributes()
            .find(|a| a.namespace() != Some(XSI_NAMESPACE))
        {
            return Err(BindingError::UnexpectedAttribute {
                element: field.name.clone(),
                attribute: qualified_name(attr.namespace(), attr.name()),
            });
        }

        convert_scalar(&collect_text(node), &field.kind, &field.name)
    }

    fn render_element(
        &self,
        tag: &str,
        instance: &DocumentInstance,
        schema: &SchemaType,
        namespace: Option<&str>,
        out: &mut String,
        depth: usize,
    ) -> Result<()> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(BindingError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        let invalid = |reason: String| BindingError::InvalidInstance {
            type_name: schema.name().clone(),
            reason,
        };

        if instance.type_name() != schema.name() {
            return Err(invalid(format!(
                "<{tag}> holds an instance of {}",
                instance.type_name()
            )));
        }
        if instance.namespace() != namespace {
            return Err(invalid(format!(
                "<{tag}> is not in the namespace of its parent"
            )));
        }
        if let Some((name, _)) = instance
            .fields()
            .find(|(name, _)| schema.element(name).is_none() && schema.attribute(name).is_none())
        {
            return Err(invalid(format!("unknown field '{name}'")));
        }

        out.push('<');
        out.push_str(tag);
        if let (0, Some(ns)) = (depth, namespace) {
            out.push_str(" xmlns=\"");
            out.push_str(&escape_attribute(ns));
            out.push('"');
        }
        for attr in schema.attributes() {
            match instance.get(&attr.name) {
                Some(value) => {
                    let lexical = scalar_lexical(&attr.kind, value)
                        .ok_or_else(|| invalid(mismatch(&attr.name, &attr.kind, value)))?;
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&lexical));
                    out.push('"');
                }
                None if attr.required => {
                    return Err(invalid(format!("missing required attribute '{}'", attr.name)));
                }
                None => {}
            }
        }

        let mut body = String::new();
        for field in schema.elements() {
            let repeatable = field.cardinality.is_repeatable();
            let values: Vec<&Value> = match (instance.get(&field.name), repeatable) {
                (None, _) => Vec::new(),
                (Some(Value::List(items)), true) => items.iter().collect(),
                (Some(value), false) if !matches!(value, Value::List(_)) => vec![value],
                (Some(value), _) => {
                    return Err(invalid(mismatch(&field.name, &field.kind, value)));
                }
            };

            let count = u32::try_from(values.len()).unwrap_or(u32::MAX);
            let too_many = field.cardinality.max().is_some_and(|max| count > max);
            if count < field.cardinality.min() || too_many {
                return Err(invalid(format!(
                    "field '{}' has {count} occurrence(s)",
                    field.name
                )));
            }

            for value in values {
                self.render_field(schema, field, value, namespace, &mut body, depth)?;
            }
        }

        if body.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&body);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Ok(())
    }

    fn render_field(
        &self,
        parent: &SchemaType,
        field: &FieldDescriptor,
        value: &Value,
        namespace: Option<&str>,
        out: &mut String,
        depth: usize,
    ) -> Result<()> {
        if let ValueKind::Complex(type_name) = &field.kind {
            let nested_schema = self.registry.lookup(type_name)?;
            let Value::Document(nested) = value else {
                return Err(BindingError::InvalidInstance {
                    type_name: parent.name().clone(),
                    reason: mismatch(&field.name, &field.kind, value),
                });
            };
            return self.render_element(
                &field.name,
                nested,
                nested_schema,
                namespace,
                out,
                depth + 1,
            );
        }

        let lexical =
            scalar_lexical(&field.kind, value).ok_or_else(|| BindingError::InvalidInstance {
                type_name: parent.name().clone(),
                reason: mismatch(&field.name, &field.kind, value),
            })?;
        out.push('<');
        out.push_str(&field.name);
        out.push('>');
        out.push_str(&escape_text(&lexical));
        out.push_str("</");
        out.push_str(&field.name);
        out.push('>');
        Ok(())
    }
}

/// Convert leaf text to the declared kind.
///
/// Strings are kept verbatim; every other kind is parsed after trimming.
fn convert_scalar(text: &str, kind: &ValueKind, field: &str) -> Result<Value> {
    let trimmed = text.trim();
    let converted = match kind {
        ValueKind::String => Some(Value::String(text.to_string())),
        ValueKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float),
        ValueKind::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        ValueKind::Boolean => match trimmed {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        ValueKind::Date => Some(trimmed)
            .filter(|t| DATE_PATTERN.is_match(t))
            .and_then(|t| NaiveDate::parse_from_str(t, DATE_FORMAT).ok())
            .map(Value::Date),
        ValueKind::Complex(_) => None,
    };

    converted.ok_or_else(|| BindingError::ValueFormat {
        field: field.to_string(),
        kind: kind.as_str(),
        value: text.to_string(),
    })
}

/// Lexical form of a scalar, if it matches the declared kind.
fn scalar_lexical(kind: &ValueKind, value: &Value) -> Option<String> {
    let fits = match (kind, value) {
        (ValueKind::Float, Value::Float(f)) => f.is_finite(),
        (ValueKind::String, Value::String(_))
        | (ValueKind::Integer, Value::Integer(_))
        | (ValueKind::Boolean, Value::Boolean(_))
        | (ValueKind::Date, Value::Date(_)) => true,
        _ => false,
    };
    if fits { value.to_lexical() } else { None }
}

fn mismatch(field: &str, kind: &ValueKind, value: &Value) -> String {
    format!(
        "field '{field}' expects {} but holds {}",
        kind.as_str(),
        value.kind_name()
    )
}

fn step_error(
    err: StepError,
    run: &Run<'_>,
    element: &str,
    rest: &[&str],
    fields: &[FieldDescriptor],
) -> BindingError {
    match err {
        StepError::NoTransition => match run.repair(rest) {
            Some(missing) if !missing.is_empty() => BindingError::IncompleteContent {
                element: element.to_string(),
                missing,
            },
            _ => BindingError::UnexpectedElement {
                tag: rest.first().map(|t| t.to_string()).unwrap_or_default(),
                parent: Some(element.to_string()),
                expected: run.expected(),
            },
        },
        StepError::TooMany { field, max } => BindingError::TooManyOccurrences {
            element: element.to_string(),
            field: field_name(fields, field),
            max,
        },
        StepError::TooFew { field, .. } => BindingError::IncompleteContent {
            element: element.to_string(),
            missing: vec![field_name(fields, field)],
        },
    }
}

fn finish_error(
    err: FinishError,
    run: &Run<'_>,
    element: &str,
    fields: &[FieldDescriptor],
) -> BindingError {
    let missing = match err {
        FinishError::NotAccepting => run.repair(&[]).unwrap_or_else(|| run.expected()),
        FinishError::TooFew { field, .. } => vec![field_name(fields, field)],
    };
    BindingError::IncompleteContent {
        element: element.to_string(),
        missing,
    }
}

/// `local` or `{ns}local`, for error messages.
fn qualified_name(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(ns) => QName::new(ns, local).to_string(),
        None => local.to_string(),
    }
}

fn field_name(fields: &[FieldDescriptor], index: usize) -> String {
    fields
        .get(index)
        .map(|f| f.name.clone())
        .unwrap_or_default()
}

fn local_names(elements: Vec<&QName>) -> Vec<String> {
    elements
        .into_iter()
        .map(|e| e.local_name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cardinality;
    use pretty_assertions::assert_eq;

    fn item_type() -> SchemaType {
        SchemaType::builder(QName::new("urn:t", "Item"))
            .element("name", ValueKind::String, Cardinality::ExactlyOne)
            .element("count", ValueKind::Integer, Cardinality::ZeroOrOne)
            .element("active", ValueKind::Boolean, Cardinality::ZeroOrOne)
            .attribute("code", ValueKind::String, false)
            .build()
            .unwrap()
    }

    fn list_type() -> SchemaType {
        SchemaType::builder(QName::new("urn:t", "List"))
            .element(
                "item",
                ValueKind::Complex(QName::new("urn:t", "Item")),
                Cardinality::Range {
                    min: 0,
                    max: Some(2),
                },
            )
            .build()
            .unwrap()
    }

    fn binder() -> Binder {
        let mut registry = TypeRegistry::new();
        registry.register(item_type()).unwrap();
        registry.register(list_type()).unwrap();
        registry
            .register_element(QName::new("urn:t", "list"), QName::new("urn:t", "List"))
            .unwrap();
        Binder::new(Arc::new(registry))
    }

    fn list_name() -> QName {
        QName::new("urn:t", "List")
    }

    #[test]
    fn test_binder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Binder>();
    }

    #[test]
    fn test_bind_optional_and_repeatable() {
        let xml = r#"<list><item code="a"><name>x</name><count> 3 </count></item><item><name>y</name><active>0</active></item></list>"#;
        let instance = binder().bind(xml, &list_name()).unwrap();

        let items = instance.get("item").and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 2);
        let first = items[0].as_document().unwrap();
        assert_eq!(first.get("code"), Some(&Value::from("a")));
        assert_eq!(first.get("count"), Some(&Value::Integer(3)));
        assert_eq!(first.get("active"), None);
        let second = items[1].as_document().unwrap();
        assert_eq!(second.get("active"), Some(&Value::Boolean(false)));
        assert_eq!(second.get("code"), None);
    }

    #[test]
    fn test_bind_too_many_occurrences() {
        let item = "<item><name>x</name></item>";
        let xml = format!("<list>{item}{item}{item}</list>");
        let err = binder().bind(&xml, &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::TooManyOccurrences { ref field, max: 2, .. } if field == "item"
        ));
    }

    #[test]
    fn test_bind_unknown_root_type() {
        let err = binder()
            .bind("<list/>", &QName::new("urn:t", "Missing"))
            .unwrap_err();
        assert!(matches!(err, BindingError::UnknownType(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bind_wrong_root_element() {
        let err = binder().bind("<shelf/>", &list_name()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected element <shelf>; expected <list>"
        );
    }

    #[test]
    fn test_bind_document_picks_type_from_root() {
        let instance = binder()
            .bind_document(r#"<t:list xmlns:t="urn:t"/>"#)
            .unwrap();
        assert_eq!(instance.type_name(), &list_name());
        assert_eq!(instance.get("item"), Some(&Value::List(vec![])));

        let err = binder().bind_document("<item/>").unwrap_err();
        assert!(matches!(err, BindingError::UnexpectedElement { parent: None, .. }));
    }

    #[test]
    fn test_bind_rejects_wrong_namespace() {
        let err = binder()
            .bind_document(r#"<list xmlns="urn:other"/>"#)
            .unwrap_err();
        assert!(matches!(err, BindingError::UnexpectedElement { .. }));
    }

    #[test]
    fn test_bind_bytes_rejects_invalid_utf8() {
        let err = binder().bind_bytes(&[b'<', 0xff, b'>']).unwrap_err();
        assert!(matches!(err, BindingError::Encoding(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bind_syntax_error() {
        let err = binder().bind("<list><item></list>", &list_name()).unwrap_err();
        assert!(matches!(err, BindingError::Syntax(_)));
    }

    #[test]
    fn test_bind_size_limit() {
        let binder = binder().with_max_document_size(8);
        let err = binder.bind("<list></list>", &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::DocumentTooLarge { size: 13, max: 8 }
        ));
    }

    #[test]
    fn test_bind_mixed_content() {
        let err = binder().bind("<list>loose</list>", &list_name()).unwrap_err();
        assert!(matches!(err, BindingError::MixedContent { ref element } if element == "list"));
    }

    #[test]
    fn test_bind_unexpected_attribute() {
        let xml = r#"<list><item colour="red"><name>x</name></item></list>"#;
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::UnexpectedAttribute { ref attribute, .. } if attribute == "colour"
        ));
    }

    #[test]
    fn test_bind_ignores_xsi_attributes() {
        let xml = r#"<list xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="urn:t list.xsd"/>"#;
        assert!(binder().bind(xml, &list_name()).is_ok());
    }

    #[test]
    fn test_bind_element_inside_scalar() {
        let xml = "<list><item><name><b>x</b></name></item></list>";
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected element <b> in <name>; no further elements allowed"
        );
    }

    #[test]
    fn test_bind_invalid_boolean() {
        let xml = "<list><item><name>x</name><active>yes</active></item></list>";
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid boolean value for 'active': 'yes'");
    }

    #[test]
    fn test_bind_nesting_limit() {
        let mut registry = TypeRegistry::new();
        let node = QName::unqualified("Node");
        registry
            .register(
                SchemaType::builder(node.clone())
                    .element("node", ValueKind::Complex(node.clone()), Cardinality::ZeroOrOne)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let binder = Binder::new(Arc::new(registry));

        let depth = MAX_NESTING_DEPTH + 1;
        let xml = format!("{}{}", "<node>".repeat(depth), "</node>".repeat(depth));
        let err = binder.bind(&xml, &node).unwrap_err();
        assert!(matches!(err, BindingError::NestingTooDeep { .. }));

        let xml = "<node><node/></node>";
        assert!(binder.bind(xml, &node).is_ok());
    }

    #[test]
    fn test_bind_rejects_child_in_foreign_namespace() {
        let xml = r#"<t:list xmlns:t="urn:t" xmlns:x="urn:x"><x:item><t:name>x</t:name></x:item></t:list>"#;
        let err = binder().bind_document(xml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected element <{urn:x}item> in <list>; expected <item>"
        );

        let xml = r#"<list xmlns="urn:t"><item xmlns=""><name>x</name></item></list>"#;
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::UnexpectedElement { ref tag, .. } if tag == "item"
        ));
    }

    #[test]
    fn test_bind_rejects_attribute_in_foreign_namespace() {
        let xml = r#"<list xmlns:x="urn:x"><item code="a" x:code="b"><name>x</name></item></list>"#;
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::UnexpectedAttribute { ref element, ref attribute }
                if element == "item" && attribute == "{urn:x}code"
        ));

        let xml = r#"<list xmlns:x="urn:x"><item><name x:lang="en">x</name></item></list>"#;
        let err = binder().bind(xml, &list_name()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::UnexpectedAttribute { ref attribute, .. } if attribute == "{urn:x}lang"
        ));
    }

    #[test]
    fn test_bind_bytes_as_applies_limits() {
        let binder = binder();
        let instance = binder.bind_bytes_as(b"<list/>", &list_name()).unwrap();
        assert_eq!(instance.type_name(), &list_name());

        let err = binder.bind_bytes_as(&[b'<', 0xff, b'>'], &list_name()).unwrap_err();
        assert!(matches!(err, BindingError::Encoding(_)));

        let err = binder
            .with_max_document_size(4)
            .bind_bytes_as(&[0xff; 8], &list_name())
            .unwrap_err();
        assert!(matches!(err, BindingError::DocumentTooLarge { size: 8, max: 4 }));
    }

    fn two_namespace_binder() -> Binder {
        let mut registry = TypeRegistry::new();
        for ns in ["urn:a", "urn:b"] {
            registry
                .register(
                    SchemaType::builder(QName::new(ns, "Doc"))
                        .element("v", ValueKind::String, Cardinality::ExactlyOne)
                        .build()
                        .unwrap(),
                )
                .unwrap();
            registry
                .register_element(QName::new(ns, "doc"), QName::new(ns, "Doc"))
                .unwrap();
        }
        Binder::new(Arc::new(registry))
    }

    #[test]
    fn test_render_keeps_root_namespace() {
        let binder = two_namespace_binder();
        for (xml, expected) in [
            (r#"<doc xmlns="urn:a"><v>x</v></doc>"#, r#"<doc xmlns="urn:a"><v>x</v></doc>"#),
            (r#"<b:doc xmlns:b="urn:b"><b:v>y</b:v></b:doc>"#, r#"<doc xmlns="urn:b"><v>y</v></doc>"#),
        ] {
            let instance = binder.bind_document(xml).unwrap();
            let rendered = binder.render(&instance).unwrap();
            assert_eq!(rendered, expected);
            assert_eq!(binder.bind_document(&rendered).unwrap(), instance);
        }

        let err = binder.bind_document("<doc><v>x</v></doc>").unwrap_err();
        assert!(matches!(err, BindingError::UnexpectedElement { .. }));
    }

    #[test]
    fn test_render_rejects_nested_namespace_mismatch() {
        let item = DocumentInstance::new(QName::new("urn:t", "Item"), "item").with("name", "x");
        let instance = DocumentInstance::new(list_name(), "list")
            .with_namespace("urn:t")
            .with("item", Value::List(vec![item.clone().into()]));
        let err = binder().render(&instance).unwrap_err();
        assert!(matches!(err, BindingError::InvalidInstance { ref reason, .. } if reason.contains("namespace")));

        let instance = DocumentInstance::new(list_name(), "list")
            .with_namespace("urn:t")
            .with("item", Value::List(vec![item.with_namespace("urn:t").into()]));
        assert_eq!(
            binder().render(&instance).unwrap(),
            r#"<list xmlns="urn:t"><item><name>x</name></item></list>"#
        );
    }

    #[test]
    fn test_render_round_trip() {
        let xml = r#"<list><item code="a&amp;b"><name> spaced </name><count>3</count></item><item><name>y</name><active>true</active></item></list>"#;
        let binder = binder();
        let instance = binder.bind(xml, &list_name()).unwrap();
        let rendered = binder.render(&instance).unwrap();

        assert_eq!(rendered, xml);
        assert_eq!(binder.bind(&rendered, &list_name()).unwrap(), instance);
    }

    #[test]
    fn test_render_empty_complex_self_closes() {
        let binder = binder();
        let instance = binder.bind("<list></list>", &list_name()).unwrap();
        assert_eq!(binder.render(&instance).unwrap(), "<list/>");
    }

    #[test]
    fn test_render_rejects_unknown_field() {
        let instance = DocumentInstance::new(list_name(), "list").with("colour", "red");
        let err = binder().render(&instance).unwrap_err();
        assert!(matches!(err, BindingError::InvalidInstance { ref reason, .. } if reason.contains("colour")));
    }

    #[test]
    fn test_render_rejects_wrong_kind() {
        let item = DocumentInstance::new(QName::new("urn:t", "Item"), "item")
            .with("name", "x")
            .with("count", "three");
        let instance =
            DocumentInstance::new(list_name(), "list").with("item", Value::List(vec![item.into()]));
        let err = binder().render(&instance).unwrap_err();
        assert!(matches!(err, BindingError::InvalidInstance { ref reason, .. } if reason.contains("'count'")));
    }

    #[test]
    fn test_render_rejects_missing_required_field() {
        let item = DocumentInstance::new(QName::new("urn:t", "Item"), "item");
        let instance =
            DocumentInstance::new(list_name(), "list").with("item", Value::List(vec![item.into()]));
        assert!(binder().render(&instance).is_err());
    }

    #[test]
    fn test_convert_scalar_rejects_non_finite_float() {
        for text in ["NaN", "inf", "-infinity", "", "1,5"] {
            let result = convert_scalar(text, &ValueKind::Float, "price");
            assert!(result.is_err(), "{text:?} should be rejected");
        }
        assert_eq!(
            convert_scalar(" 1e2 ", &ValueKind::Float, "price").unwrap(),
            Value::Float(100.0)
        );
    }

    #[test]
    fn test_convert_scalar_requires_strict_date_form() {
        for text in ["2020-1-1", "+2020-01-01", "2020-01-1", "2020-02-30", "2020-01-01Z", "20200101"] {
            let result = convert_scalar(text, &ValueKind::Date, "pub_date");
            assert!(
                matches!(result, Err(BindingError::ValueFormat { kind: "date", .. })),
                "{text:?} should be rejected"
            );
        }
        assert_eq!(
            convert_scalar(" 2020-01-01 ", &ValueKind::Date, "pub_date").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_convert_scalar_keeps_strings_verbatim() {
        assert_eq!(
            convert_scalar("  padded\n", &ValueKind::String, "review").unwrap(),
            Value::from("  padded\n")
        );
    }
}
