use crate::diff;
use crate::response::Response;
use crate::scenario::ScenarioStep;
use crate::server::{RemoteStub, State};
use crate::{Error, ErrorKind, Matcher, RequestPattern};
use bytes::Bytes;
use hyper::StatusCode;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::convert::Into;
use std::fmt;
use std::ops::Drop;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// The priority of stubs that don't call `Stub::at_priority`: every explicit priority wins over it.
pub(crate) const DEFAULT_PRIORITY: u32 = u32::MAX;

#[derive(Clone, Debug)]
pub(crate) struct InnerStub {
    pub(crate) id: String,
    pub(crate) pattern: RequestPattern,
    pub(crate) priority: u32,
    pub(crate) scenario: Option<String>,
    pub(crate) required_state: Option<String>,
    pub(crate) new_state: Option<String>,
    pub(crate) response: Response,
    pub(crate) expected_hits_at_least: Option<usize>,
    pub(crate) expected_hits_at_most: Option<usize>,
}

impl InnerStub {
    pub(crate) fn scenario_step(&self) -> Option<ScenarioStep> {
        self.scenario.as_ref().map(|name| ScenarioStep {
            required_state: self.required_state.clone(),
            new_state: self.new_state.clone(),
            ..ScenarioStep::new(name)
        })
    }
}

impl fmt::Display for InnerStub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl PartialEq for InnerStub {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.pattern == other.pattern
            && self.priority == other.priority
            && self.scenario == other.scenario
            && self.required_state == other.required_state
            && self.new_state == other.new_state
            && self.response == other.response
    }
}

///
/// Stores information about a stubbed request. Should be initialized via `Server::stub()` or
/// `Server::stub_for()`.
///
#[derive(Debug)]
pub struct Stub {
    state: Arc<RwLock<State>>,
    inner: InnerStub,
    /// Used to warn of stubs missing a `.create()` call.
    created: bool,
}

impl Stub {
    pub(crate) fn new(state: Arc<RwLock<State>>, pattern: RequestPattern) -> Stub {
        let inner = InnerStub {
            id: rand::rng()
                .sample_iter(&Alphanumeric)
                .map(char::from)
                .take(24)
                .collect(),
            pattern,
            priority: DEFAULT_PRIORITY,
            scenario: None,
            required_state: None,
            new_state: None,
            response: Response::default(),
            expected_hits_at_least: None,
            expected_hits_at_most: None,
        };

        Self {
            state,
            inner,
            created: false,
        }
    }

    ///
    /// Allows matching a particular request header when responding with a stub.
    ///
    /// When matching a request, the field letter case is ignored. Panics on an invalid
    /// `Matcher::Regex`.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::Matcher;
    ///
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/")
    ///   .match_header("accept", Matcher::Regex("text/.*".into()))
    ///   .match_header("authorization", "password");
    /// ```
    ///
    #[track_caller]
    pub fn match_header<M: Into<Matcher>>(mut self, field: &str, value: M) -> Self {
        self.inner.pattern.add_header(field, value.into());

        self
    }

    ///
    /// Allows matching the request body. Can be called several times: every body
    /// matcher has to accept the body.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::Matcher;
    ///
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("POST", "/")
    ///   .match_body(Matcher::Contains("\"creator\"".into()))
    ///   .match_body(Matcher::Contains("\"website\"".into()))
    ///   .with_body("json")
    ///   .create();
    /// ```
    ///
    #[track_caller]
    pub fn match_body<M: Into<Matcher>>(mut self, body: M) -> Self {
        self.inner.pattern.add_body(body.into());

        self
    }

    ///
    /// Sets the priority of the stub. When several stubs match a request, the lowest
    /// priority value wins. Stubs without a priority lose against every stub with one,
    /// and between equal priorities the most recently created stub wins.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::UrlMatcher;
    ///
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", UrlMatcher::PathRegex("/sample/.*".into())).at_priority(1).create();
    /// s.stub("GET", "/sample/wiremock").at_priority(2).with_status(503).create();
    ///
    /// // GET /sample/wiremock responds with 200.
    /// ```
    ///
    pub fn at_priority(mut self, priority: u32) -> Self {
        self.inner.priority = priority;
        self
    }

    ///
    /// Puts the stub into the named scenario. The scenario is created in the
    /// `STARTED` state when the stub is created, unless it already exists.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::STARTED;
    ///
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/todo")
    ///   .in_scenario("todo list")
    ///   .when_scenario_state_is(STARTED)
    ///   .will_set_state_to("item added")
    ///   .with_body("empty")
    ///   .create();
    ///
    /// s.stub("GET", "/todo")
    ///   .in_scenario("todo list")
    ///   .when_scenario_state_is("item added")
    ///   .with_body("one item")
    ///   .create();
    /// ```
    ///
    pub fn in_scenario(mut self, name: &str) -> Self {
        self.inner.scenario = Some(name.to_owned());
        self
    }

    ///
    /// Only matches while the scenario is in the given state. Without this call a stub
    /// matches in every state of its scenario.
    ///
    pub fn when_scenario_state_is(mut self, state: &str) -> Self {
        self.inner.required_state = Some(state.to_owned());
        self
    }

    ///
    /// Moves the scenario to the given state every time this stub serves a request.
    ///
    pub fn will_set_state_to(mut self, state: &str) -> Self {
        self.inner.new_state = Some(state.to_owned());
        self
    }

    ///
    /// Sets the status code of the stub response. The default status code is 200.
    ///
    /// ## Example
    ///
    /// ```
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/").with_status(201);
    /// ```
    ///
    #[track_caller]
    pub fn with_status(mut self, status: usize) -> Self {
        self.inner.response.status = u16::try_from(status)
            .ok()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .ok_or_else(|| Error::new_with_context(ErrorKind::InvalidStatusCode, status))
            .unwrap();

        self
    }

    ///
    /// Sets a header of the stub response.
    ///
    /// ## Example
    ///
    /// ```
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/").with_header("content-type", "application/json");
    /// ```
    ///
    pub fn with_header(mut self, field: &str, value: &str) -> Self {
        self.inner
            .response
            .headers
            .push((field.to_owned(), value.to_owned()));

        self
    }

    ///
    /// Sets the body of the stub response. Its `Content-Length` is handled automatically.
    ///
    /// ## Example
    ///
    /// ```
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/").with_body("hello world");
    /// ```
    ///
    pub fn with_body<StrOrBytes: AsRef<[u8]>>(mut self, body: StrOrBytes) -> Self {
        self.inner.response.body = Bytes::copy_from_slice(body.as_ref());
        self
    }

    ///
    /// Sets the body of the stub response from the contents of a file stored under `path`.
    /// Its `Content-Length` is handled automatically.
    ///
    /// ## Example
    ///
    /// ```
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/").with_body_from_file("tests/files/intro.json");
    /// ```
    ///
    #[track_caller]
    pub fn with_body_from_file(mut self, path: impl AsRef<Path>) -> Self {
        self.inner.response.body = Bytes::from(
            std::fs::read(path)
                .map_err(|err| Error::new_with_context(ErrorKind::FileNotFound, err))
                .unwrap(),
        );
        self
    }

    ///
    /// Sets the expected amount of requests that this stub is supposed to serve.
    /// This is only enforced when calling the `assert` method.
    /// Defaults to 1 request.
    ///
    pub fn expect(mut self, hits: usize) -> Self {
        self.inner.expected_hits_at_least = Some(hits);
        self.inner.expected_hits_at_most = Some(hits);
        self
    }

    ///
    /// Sets the minimum amount of requests that this stub is supposed to serve.
    /// This is only enforced when calling the `assert` method.
    ///
    pub fn expect_at_least(mut self, hits: usize) -> Self {
        self.inner.expected_hits_at_least = Some(hits);
        if self.inner.expected_hits_at_most.is_some()
            && self.inner.expected_hits_at_most < self.inner.expected_hits_at_least
        {
            self.inner.expected_hits_at_most = None;
        }
        self
    }

    ///
    /// Sets the maximum amount of requests that this stub is supposed to serve.
    /// This is only enforced when calling the `assert` method.
    ///
    pub fn expect_at_most(mut self, hits: usize) -> Self {
        self.inner.expected_hits_at_most = Some(hits);
        if self.inner.expected_hits_at_least.is_some()
            && self.inner.expected_hits_at_least > self.inner.expected_hits_at_most
        {
            self.inner.expected_hits_at_least = None;
        }
        self
    }

    ///
    /// Asserts that the expected amount of requests (defaults to 1 request) were served
    /// by this stub.
    ///
    #[track_caller]
    pub fn assert(&self) {
        let state = State::read(&self.state);
        if let Some(hits) = state.stub_hits(&self.inner.id) {
            let matched = self.matched_hits(hits);
            let message = if !matched {
                let last_request = state.last_unmatched_request();
                self.build_assert_message(hits, last_request)
            } else {
                String::default()
            };

            assert!(matched, "{}", message)
        } else {
            panic!("could not retrieve enough information about the stub")
        }
    }

    ///
    /// Returns whether the expected amount of requests (defaults to 1) were served.
    ///
    pub fn matched(&self) -> bool {
        let state = State::read(&self.state);
        let Some(hits) = state.stub_hits(&self.inner.id) else {
            return false;
        };

        self.matched_hits(hits)
    }

    ///
    /// Returns how many requests this stub served so far.
    ///
    pub fn hits(&self) -> usize {
        State::read(&self.state)
            .stub_hits(&self.inner.id)
            .unwrap_or(0)
    }

    ///
    /// Registers the stub to the server - your stub will be served only after calling this method.
    ///
    /// ## Example
    ///
    /// ```
    /// let mut s = wirestub::Server::new();
    ///
    /// s.stub("GET", "/").with_body("hello world").create();
    /// ```
    ///
    pub fn create(mut self) -> Stub {
        if self.inner.scenario.is_none()
            && (self.inner.required_state.is_some() || self.inner.new_state.is_some())
        {
            log::warn!(
                "Scenario state set without .in_scenario() on stub {}",
                self.inner
            );
        }

        let remote_stub = RemoteStub::new(self.inner.clone());
        State::write(&self.state).register(remote_stub);

        self.created = true;

        self
    }

    ///
    /// Removes the stub from the server.
    ///
    pub fn remove(&self) {
        State::write(&self.state).remove_stub(&self.inner.id);
    }

    fn matched_hits(&self, hits: usize) -> bool {
        match (
            self.inner.expected_hits_at_least,
            self.inner.expected_hits_at_most,
        ) {
            (Some(min), Some(max)) => hits >= min && hits <= max,
            (Some(min), None) => hits >= min,
            (None, Some(max)) => hits <= max,
            (None, None) => hits == 1,
        }
    }

    fn build_assert_message(&self, hits: usize, last_request: Option<String>) -> String {
        let mut message = match (
            self.inner.expected_hits_at_least,
            self.inner.expected_hits_at_most,
        ) {
            (Some(min), Some(max)) if min == max => format!(
                "\n> Expected {} request(s) to:\n{}\n...but received {}\n\n",
                min, self, hits
            ),
            (Some(min), Some(max)) => format!(
                "\n> Expected between {} and {} request(s) to:\n{}\n...but received {}\n\n",
                min, max, self, hits
            ),
            (Some(min), None) => format!(
                "\n> Expected at least {} request(s) to:\n{}\n...but received {}\n\n",
                min, self, hits
            ),
            (None, Some(max)) => format!(
                "\n> Expected at most {} request(s) to:\n{}\n...but received {}\n\n",
                max, self, hits
            ),
            (None, None) => format!(
                "\n> Expected 1 request(s) to:\n{}\n...but received {}\n\n",
                self, hits
            ),
        };

        if let Some(last_request) = last_request {
            message.push_str(&format!(
                "> The last unmatched request was:\n{}\n",
                last_request
            ));

            let difference = diff::compare(&self.to_string(), &last_request);
            message.push_str(&format!("> Difference:\n{}\n", difference));
        }

        message
    }
}

impl Drop for Stub {
    fn drop(&mut self) {
        if !self.created {
            log::warn!("Missing .create() call on stub {}", self);
        }
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.inner.to_string())
    }
}

impl PartialEq for Stub {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
