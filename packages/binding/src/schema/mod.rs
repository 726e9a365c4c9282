//! Compiled schema model: types, content automata and the type registry.

mod automaton;
mod registry;
mod types;

pub use automaton::{
    AutomatonBuilder, ContentAutomaton, CounterCondition, CounterId, CounterUpdate, FinishError,
    Run, StateId, StepError, Transition, START,
};
pub use registry::TypeRegistry;
pub use types::{
    AttributeDescriptor, Cardinality, FieldDescriptor, QName, SchemaType, SchemaTypeBuilder,
    ValueKind,
};
