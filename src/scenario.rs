use std::collections::HashMap;

///
/// The state every scenario starts in, and returns to after a reset.
///
pub const STARTED: &str = "started";

///
/// The scenario a stub belongs to: the state it requires and the state it moves the scenario to
/// once it serves a request.
///
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ScenarioStep {
    pub(crate) name: String,
    pub(crate) required_state: Option<String>,
    pub(crate) new_state: Option<String>,
}

impl ScenarioStep {
    pub(crate) fn new(name: &str) -> Self {
        ScenarioStep {
            name: name.to_owned(),
            required_state: None,
            new_state: None,
        }
    }

    pub(crate) fn is_satisfied_by(&self, scenarios: &Scenarios) -> bool {
        match self.required_state {
            Some(ref state) => scenarios.state_of(&self.name) == state,
            None => true,
        }
    }
}

///
/// The states of all the scenarios known to one server.
///
#[derive(Debug, Default)]
pub(crate) struct Scenarios {
    states: HashMap<String, String>,
}

impl Scenarios {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes the scenario known, in the `STARTED` state unless it already exists.
    pub(crate) fn register(&mut self, name: &str) {
        self.states
            .entry(name.to_owned())
            .or_insert_with(|| STARTED.to_owned());
    }

    pub(crate) fn state_of(&self, name: &str) -> &str {
        self.states.get(name).map(String::as_str).unwrap_or(STARTED)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.states.get(name).map(String::as_str)
    }

    pub(crate) fn set(&mut self, name: &str, state: &str) {
        log::debug!("Scenario {:?} moves to {:?}", name, state);
        self.states.insert(name.to_owned(), state.to_owned());
    }

    /// Applies the transition of a stub that just served a request.
    pub(crate) fn advance(&mut self, step: &ScenarioStep) {
        if let Some(ref next) = step.new_state {
            self.set(&step.name, next);
        }
    }

    /// Moves every known scenario back to `STARTED`.
    pub(crate) fn reset(&mut self) {
        for state in self.states.values_mut() {
            *state = STARTED.to_owned();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.states.clear();
    }
}
