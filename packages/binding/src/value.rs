//! Bound values and document instances.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::QName;

/// Lexical date format (`xs:date` without timezone).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A typed field value produced by the binder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// String value, kept verbatim
    String(String),
    /// Finite floating point value
    Float(f64),
    /// Integer value
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Nested complex-typed element
    Document(DocumentInstance),
    /// Occurrences of a repeatable field, in document order
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentInstance> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Float(_) => "float",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Document(_) => "complex",
            Value::List(_) => "list",
        }
    }

    /// Canonical lexical form of a scalar value.
    ///
    /// Floats use the shortest representation that parses back to the same
    /// number, so `9.99` stays `9.99`. Returns `None` for documents and lists.
    ///
    /// # Examples
    /// ```
    /// use defpi_binding::Value;
    ///
    /// assert_eq!(Value::Float(9.99).to_lexical().as_deref(), Some("9.99"));
    /// assert_eq!(Value::Float(10.0).to_lexical().as_deref(), Some("10"));
    /// assert_eq!(Value::Boolean(true).to_lexical().as_deref(), Some("true"));
    /// ```
    #[must_use]
    pub fn to_lexical(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Float(f) => Some(f.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Value::Document(_) | Value::List(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DocumentInstance> for Value {
    fn from(d: DocumentInstance) -> Self {
        Value::Document(d)
    }
}

/// Typed result of binding one element to its schema type.
///
/// The type name, element tag and element namespace identify what the
/// instance was bound against, and fields map field names to values.
/// Serializes to JSON as the fields plus `$type`, `$element` and (for
/// namespaced elements) `$namespace` keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInstance {
    #[serde(rename = "$type")]
    type_name: QName,
    #[serde(rename = "$element")]
    element: String,
    #[serde(rename = "$namespace", skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl DocumentInstance {
    /// Create an unqualified instance with no fields set.
    #[must_use]
    pub fn new(type_name: QName, element: impl Into<String>) -> Self {
        Self {
            type_name,
            element: element.into(),
            namespace: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter for the element namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Namespace of the element this instance was bound from, if any.
    ///
    /// Child elements always share the namespace of their parent.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }

    #[must_use]
    pub fn type_name(&self) -> &QName {
        &self.type_name
    }

    /// Local name of the element this instance was bound from.
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Builder-style variant of [`DocumentInstance::set`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// All fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(1.5).as_float(), Some(1.5));
        assert_eq!(Value::from(7_i64).as_integer(), Some(7));
        assert_eq!(Value::from(false).as_bool(), Some(false));
        assert_eq!(Value::from("x").as_float(), None);
        assert_eq!(Value::List(vec![]).as_list().map(<[Value]>::len), Some(0));
    }

    #[test]
    fn test_lexical_forms() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(Value::Date(date).to_lexical().as_deref(), Some("2020-01-01"));
        assert_eq!(Value::Integer(-3).to_lexical().as_deref(), Some("-3"));
        assert_eq!(Value::Float(0.1).to_lexical().as_deref(), Some("0.1"));
        assert_eq!(Value::List(vec![]).to_lexical(), None);
    }

    #[test]
    fn test_instance_fields() {
        let mut book = DocumentInstance::new(QName::new("urn:books", "BookForm"), "book")
            .with("id", "1")
            .with("price", 9.99);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("price"), Some(&Value::Float(9.99)));

        let previous = book.set("id", "2");
        assert_eq!(previous, Some(Value::from("1")));
        assert_eq!(book.remove("price"), Some(Value::Float(9.99)));
        assert_eq!(book.fields().map(|(k, _)| k).collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_instance_serializes_with_type_keys() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let book = DocumentInstance::new(QName::new("urn:books", "BookForm"), "book")
            .with("id", "1")
            .with("price", 9.99)
            .with("pub_date", date);
        let books = DocumentInstance::new(QName::new("urn:books", "BooksForm"), "books")
            .with("book", Value::List(vec![Value::Document(book)]));

        let json = serde_json::to_value(&books).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "$type": "{urn:books}BooksForm",
                "$element": "books",
                "book": [{
                    "$type": "{urn:books}BookForm",
                    "$element": "book",
                    "id": "1",
                    "price": 9.99,
                    "pub_date": "2020-01-01"
                }]
            })
        );
    }

    #[test]
    fn test_namespaced_instance_serializes_namespace() {
        let doc = DocumentInstance::new(QName::new("urn:a", "Doc"), "doc").with_namespace("urn:a");
        assert_eq!(doc.namespace(), Some("urn:a"));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "$type": "{urn:a}Doc",
                "$element": "doc",
                "$namespace": "urn:a"
            })
        );
    }
}
