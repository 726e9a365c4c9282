//! Compiled descriptors of the `urn:books` catalogue schema.
//!
//! ```text
//! books    : BooksForm
//! BooksForm: book (BookForm) *
//! BookForm : @id (string, required)
//!            author title genre (string), price (float),
//!            pub_date (date), review (string), each once, in order
//! ```
//!
//! The content automata are written out as tables rather than derived, the
//! way a schema compiler would emit them.

use crate::error::Result;
use crate::schema::{
    Cardinality, ContentAutomaton, CounterUpdate, QName, SchemaType, TypeRegistry, ValueKind,
    START,
};

/// Target namespace of the catalogue schema.
pub const BOOKS_NAMESPACE: &str = "urn:books";

/// Element fields of `BookForm`, in declaration order.
const BOOK_FIELDS: [(&str, ValueKind); 6] = [
    ("author", ValueKind::String),
    ("title", ValueKind::String),
    ("genre", ValueKind::String),
    ("price", ValueKind::Float),
    ("pub_date", ValueKind::Date),
    ("review", ValueKind::String),
];

#[must_use]
pub fn books_form_name() -> QName {
    QName::new(BOOKS_NAMESPACE, "BooksForm")
}

#[must_use]
pub fn book_form_name() -> QName {
    QName::new(BOOKS_NAMESPACE, "BookForm")
}

/// Name of the global `books` element.
#[must_use]
pub fn books_element_name() -> QName {
    QName::new(BOOKS_NAMESPACE, "books")
}

/// Build a registry holding the catalogue types and its global element.
///
/// # Errors
/// Only fails if the descriptors below are inconsistent, which the tests
/// rule out.
pub fn create_books_registry() -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry.register(book_form()?)?;
    registry.register(books_form()?)?;
    registry.register_element(books_element_name(), books_form_name())?;
    registry.validate_references()?;
    Ok(registry)
}

fn books_form() -> Result<SchemaType> {
    let mut automaton = ContentAutomaton::builder();
    let books = automaton.counter(0, 0, None);
    let book = automaton.state(0, true);
    automaton
        .accept_start()
        .transition(START, "book", book, vec![CounterUpdate::Increment(books)])
        .transition(book, "book", book, vec![CounterUpdate::Increment(books)])
        .final_check(book, books);

    SchemaType::builder(books_form_name())
        .element(
            "book",
            ValueKind::Complex(book_form_name()),
            Cardinality::ZeroOrMore,
        )
        .automaton(automaton.build())
        .build()
}

fn book_form() -> Result<SchemaType> {
    let mut automaton = ContentAutomaton::builder();
    let mut builder = SchemaType::builder(book_form_name());
    let mut previous = START;

    for (index, (name, kind)) in BOOK_FIELDS.into_iter().enumerate() {
        let state = automaton.state(index, index + 1 == BOOK_FIELDS.len());
        automaton.transition(previous, name, state, Vec::new());
        builder = builder.element(name, kind, Cardinality::ExactlyOne);
        previous = state;
    }

    builder
        .attribute("id", ValueKind::String, true)
        .automaton(automaton.build())
        .build()
}
