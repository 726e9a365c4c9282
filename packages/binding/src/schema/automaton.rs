//! Table-driven content automata.
//!
//! Each complex type owns a [`ContentAutomaton`] that decides which child
//! element may come next. States correspond to "the last child seen was
//! field N"; state [`START`] is "no child seen yet". Repeatable fields carry
//! a counter whose bounds are checked by guards on the transitions and by
//! final checks on accepting states.
//!
//! A [`Run`] walks the table for one element's children. When a child is
//! rejected, [`Run::repair`] searches for the smallest set of elements that
//! would have to be inserted to make the remaining children valid, which is
//! what separates "required element missing" from "element out of place".

use std::collections::{BTreeMap, HashSet};

use super::types::FieldDescriptor;
use crate::config::MAX_REPAIR_INSERTIONS;

pub type StateId = usize;
pub type CounterId = usize;

/// Initial state of every automaton.
pub const START: StateId = 0;

/// Occurrence bounds tracked by one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterCondition {
    pub field: usize,
    pub min: u32,
    pub max: Option<u32>,
}

/// Counter side effect of taking a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// Count one more occurrence. Guarded by `count < max`.
    Increment(CounterId),
    /// Leave the field for good. Guarded by `count >= min`, then zeroes it.
    Reset(CounterId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: StateId,
    pub updates: Vec<CounterUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct State {
    field: Option<usize>,
    accepting: bool,
    final_checks: Vec<CounterId>,
    transitions: BTreeMap<String, Vec<Transition>>,
}

impl State {
    fn new(field: Option<usize>, accepting: bool) -> Self {
        Self {
            field,
            accepting,
            final_checks: Vec::new(),
            transitions: BTreeMap::new(),
        }
    }
}

/// Why a child element was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// No transition for this tag from the current state.
    NoTransition,
    /// The field's counter is already at its maximum.
    TooMany { field: usize, max: u32 },
    /// Leaving a repeatable field that has not reached its minimum.
    TooFew { field: usize, min: u32 },
}

/// Why a run cannot end here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishError {
    NotAccepting,
    TooFew { field: usize, min: u32 },
}

/// Compiled content model of one complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAutomaton {
    counters: Vec<CounterCondition>,
    states: Vec<State>,
}

impl ContentAutomaton {
    /// Start an empty table with only the non-accepting [`START`] state.
    #[must_use]
    pub fn builder() -> AutomatonBuilder {
        AutomatonBuilder {
            counters: Vec::new(),
            states: vec![State::new(None, false)],
        }
    }

    /// Derive the automaton for an `xs:sequence` of the given fields.
    ///
    /// Optional fields may be skipped, repeatable fields loop on themselves,
    /// and every field occurs at most once as a contiguous run.
    #[must_use]
    pub fn sequence(fields: &[FieldDescriptor]) -> Self {
        let mut builder = Self::builder();

        let counters: Vec<Option<CounterId>> = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                field.cardinality.is_repeatable().then(|| {
                    builder.counter(index, field.cardinality.min(), field.cardinality.max())
                })
            })
            .collect();

        let optional_from = |index: usize| {
            fields[index..]
                .iter()
                .all(|f| f.cardinality.is_optional())
        };

        if optional_from(0) {
            builder.accept_start();
        }

        let states: Vec<StateId> = (0..fields.len())
            .map(|index| builder.state(index, optional_from(index + 1)))
            .collect();

        for (index, &state) in states.iter().enumerate() {
            if let Some(counter) = counters[index] {
                builder.final_check(state, counter);
                builder.transition(
                    state,
                    &fields[index].name,
                    state,
                    vec![CounterUpdate::Increment(counter)],
                );
            }
        }

        let sources = std::iter::once((START, None, 0)).chain(
            states
                .iter()
                .enumerate()
                .map(|(index, &state)| (state, counters[index], index + 1)),
        );
        for (source, source_counter, first) in sources {
            for (index, field) in fields.iter().enumerate().skip(first) {
                let updates = source_counter
                    .map(CounterUpdate::Reset)
                    .into_iter()
                    .chain(counters[index].map(CounterUpdate::Increment))
                    .collect();
                builder.transition(source, &field.name, states[index], updates);
                if !field.cardinality.is_optional() {
                    break;
                }
            }
        }

        builder.build()
    }

    /// Begin matching a fresh sequence of children.
    #[must_use]
    pub fn start(&self) -> Run<'_> {
        Run {
            automaton: self,
            state: START,
            counts: vec![0; self.counters.len()],
        }
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Check that every state, counter and transition label refers to an
    /// existing field and that labels match the field they lead to.
    pub(crate) fn check_fields(&self, fields: &[FieldDescriptor]) -> Result<(), String> {
        for counter in &self.counters {
            if counter.field >= fields.len() {
                return Err(format!("counter refers to unknown field #{}", counter.field));
            }
        }

        for (id, state) in self.states.iter().enumerate() {
            match (id, state.field) {
                (START, Some(_)) => return Err("start state cannot consume a field".to_string()),
                (START, None) => {}
                (_, None) => return Err(format!("state {id} has no field")),
                (_, Some(field)) if field >= fields.len() => {
                    return Err(format!("state {id} refers to unknown field #{field}"));
                }
                (_, Some(_)) => {}
            }

            if let Some(&counter) = state
                .final_checks
                .iter()
                .find(|&&c| c >= self.counters.len())
            {
                return Err(format!("state {id} checks unknown counter {counter}"));
            }

            let labelled = state
                .transitions
                .iter()
                .flat_map(|(tag, targets)| targets.iter().map(move |t| (tag, t)));
            for (tag, transition) in labelled {
                let target = self
                    .states
                    .get(transition.target)
                    .filter(|_| transition.target != START)
                    .ok_or_else(|| format!("transition from state {id} has invalid target"))?;
                let field = target.field.and_then(|f| fields.get(f));
                if field.map(|f| f.name.as_str()) != Some(tag.as_str()) {
                    return Err(format!(
                        "transition <{tag}> from state {id} does not lead to field '{tag}'"
                    ));
                }
                let unknown_counter = transition.updates.iter().any(|update| match update {
                    CounterUpdate::Increment(c) | CounterUpdate::Reset(c) => {
                        *c >= self.counters.len()
                    }
                });
                if unknown_counter {
                    return Err(format!(
                        "transition <{tag}> from state {id} updates an unknown counter"
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Incremental builder for hand-written automata.
#[derive(Debug)]
pub struct AutomatonBuilder {
    counters: Vec<CounterCondition>,
    states: Vec<State>,
}

impl AutomatonBuilder {
    /// Add a counter for `field` with the given bounds.
    pub fn counter(&mut self, field: usize, min: u32, max: Option<u32>) -> CounterId {
        self.counters.push(CounterCondition { field, min, max });
        self.counters.len() - 1
    }

    /// Add the state reached after consuming `field`.
    pub fn state(&mut self, field: usize, accepting: bool) -> StateId {
        self.states.push(State::new(Some(field), accepting));
        self.states.len() - 1
    }

    /// Allow a run that consumes no children at all.
    pub fn accept_start(&mut self) -> &mut Self {
        if let Some(start) = self.states.get_mut(START) {
            start.accepting = true;
        }
        self
    }

    /// Add a labelled transition. Ids that do not exist are reported by
    /// [`crate::SchemaTypeBuilder::build`].
    pub fn transition(
        &mut self,
        from: StateId,
        tag: &str,
        to: StateId,
        updates: Vec<CounterUpdate>,
    ) -> &mut Self {
        if let Some(state) = self.states.get_mut(from) {
            state
                .transitions
                .entry(tag.to_string())
                .or_default()
                .push(Transition {
                    target: to,
                    updates,
                });
        }
        self
    }

    /// Require `counter` to have reached its minimum when a run ends in `state`.
    pub fn final_check(&mut self, state: StateId, counter: CounterId) -> &mut Self {
        if let Some(state) = self.states.get_mut(state) {
            state.final_checks.push(counter);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> ContentAutomaton {
        ContentAutomaton {
            counters: self.counters,
            states: self.states,
        }
    }
}

/// Position of one element's children within its automaton.
#[derive(Debug, Clone)]
pub struct Run<'a> {
    automaton: &'a ContentAutomaton,
    state: StateId,
    counts: Vec<u32>,
}

type SearchKey = (StateId, Vec<u32>, usize, usize);

impl Run<'_> {
    /// Consume one child tag and return the index of the field it binds to.
    ///
    /// The first transition whose guards hold is taken; the run is left
    /// untouched on error.
    pub fn step(&mut self, tag: &str) -> Result<usize, StepError> {
        let automaton = self.automaton;
        let mut first_error = None;

        let candidates = automaton.states[self.state]
            .transitions
            .get(tag)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for transition in candidates {
            match self.check_guards(transition) {
                Ok(()) => {
                    self.apply(transition);
                    let field = automaton.states[transition.target].field;
                    return field.ok_or(StepError::NoTransition);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        Err(first_error.unwrap_or(StepError::NoTransition))
    }

    /// Check that the children consumed so far form complete content.
    pub fn finish(&self) -> Result<(), FinishError> {
        let state = &self.automaton.states[self.state];
        if !state.accepting {
            return Err(FinishError::NotAccepting);
        }
        for &counter in &state.final_checks {
            let condition = self.automaton.counters[counter];
            if self.counts[counter] < condition.min {
                return Err(FinishError::TooFew {
                    field: condition.field,
                    min: condition.min,
                });
            }
        }
        Ok(())
    }

    /// Tags that may legally come next, in field declaration order.
    #[must_use]
    pub fn expected(&self) -> Vec<String> {
        let mut allowed: Vec<(usize, &str)> = self.automaton.states[self.state]
            .transitions
            .iter()
            .flat_map(|(tag, targets)| targets.iter().map(move |t| (tag, t)))
            .filter(|(_, transition)| self.check_guards(transition).is_ok())
            .map(|(tag, transition)| {
                let field = self.automaton.states[transition.target]
                    .field
                    .unwrap_or_default();
                (field, tag.as_str())
            })
            .collect();
        allowed.sort_unstable();
        allowed.dedup();
        allowed.into_iter().map(|(_, tag)| tag.to_string()).collect()
    }

    /// Smallest list of tags that, inserted at the current position or
    /// between the remaining children, makes `rest` a valid completion.
    ///
    /// Returns `None` when no repair within the insertion budget exists,
    /// which means some child in `rest` is out of place rather than a
    /// required element being absent.
    #[must_use]
    pub fn repair(&self, rest: &[&str]) -> Option<Vec<String>> {
        let limit = self.automaton.states.len().min(MAX_REPAIR_INSERTIONS);
        let mut dead = HashSet::new();
        (0..=limit).find_map(|budget| self.search(rest, budget, &mut dead))
    }

    fn search(
        &self,
        rest: &[&str],
        budget: usize,
        dead: &mut HashSet<SearchKey>,
    ) -> Option<Vec<String>> {
        let mut run = self.clone();
        let mut rest = rest;
        let mut visited = Vec::new();

        loop {
            let key = (run.state, run.counts.clone(), rest.len(), budget);
            if dead.contains(&key) {
                break;
            }
            visited.push(key);

            if budget > 0 {
                for tag in run.expected() {
                    let mut next = run.clone();
                    if next.step(&tag).is_err() {
                        continue;
                    }
                    if let Some(mut found) = next.search(rest, budget - 1, dead) {
                        found.insert(0, tag);
                        return Some(found);
                    }
                }
            }

            match rest.split_first() {
                None => {
                    if run.finish().is_ok() {
                        return Some(Vec::new());
                    }
                    break;
                }
                Some((tag, tail)) => {
                    if run.step(tag).is_err() {
                        break;
                    }
                    rest = tail;
                }
            }
        }

        dead.extend(visited);
        None
    }

    fn check_guards(&self, transition: &Transition) -> Result<(), StepError> {
        for update in &transition.updates {
            match *update {
                CounterUpdate::Increment(counter) => {
                    let condition = self.automaton.counters[counter];
                    if let Some(max) = condition.max {
                        if self.counts[counter] >= max {
                            return Err(StepError::TooMany {
                                field: condition.field,
                                max,
                            });
                        }
                    }
                }
                CounterUpdate::Reset(counter) => {
                    let condition = self.automaton.counters[counter];
                    if self.counts[counter] < condition.min {
                        return Err(StepError::TooFew {
                            field: condition.field,
                            min: condition.min,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, transition: &Transition) {
        for update in &transition.updates {
            match *update {
                CounterUpdate::Increment(counter) => self.counts[counter] += 1,
                CounterUpdate::Reset(counter) => self.counts[counter] = 0,
            }
        }
        self.state = transition.target;
    }
}
