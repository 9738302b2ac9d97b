#![warn(missing_docs)]

//!
//! Wirestub is a library for stubbing HTTP services in integration tests, including stateful
//! scenarios where the same request gets a different answer depending on what happened before.
//!
//! Every `Server` runs on a separate thread within the same process, listens on its own local
//! port and keeps its own stubs, scenario states and request journal. Servers are cleaned up
//! when they go out of scope.
//!
//! # Getting Started
//!
//! Fetch a server with `Server::new()` and point your HTTP client at `Server::url()`.
//!
//! ## Example
//!
//! ```
//! let mut s = wirestub::Server::new();
//!
//! s.stub("GET", "/hello")
//!   .with_status(201)
//!   .with_header("content-type", "text/plain")
//!   .with_body("world")
//!   .create();
//!
//! // Any calls to GET {s.url()}/hello beyond this line will respond with 201, the
//! // `content-type: text/plain` header and the body "world".
//! ```
//!
//! Any calls to the server that are not matched by a stub will return *404 Not Found* with a
//! short description of the request.
//!
//! # Matching the URL
//!
//! A plain `&str` matches the whole URL (path and query) exactly. Use `UrlMatcher` to match only
//! the path, or to match by regular expression. Regular expressions have to match the whole value.
//!
//! ## Example
//!
//! ```
//! use wirestub::UrlMatcher;
//!
//! let mut s = wirestub::Server::new();
//!
//! s.stub("GET", "/sample/wiremock?page=1").create();
//! s.stub("GET", UrlMatcher::PathExact("/sample/wiremock".into())).create();
//! s.stub("GET", UrlMatcher::PathRegex("/sample/.*".into())).create();
//! ```
//!
//! # Matching by header and body
//!
//! The header field letter case is ignored. Body matchers can be added several times and all of
//! them have to accept the body.
//!
//! ## Example
//!
//! ```
//! use wirestub::Matcher;
//!
//! let mut s = wirestub::Server::new();
//!
//! s.stub("POST", "/sample/wiremock")
//!   .match_header("content-type", "application/json")
//!   .match_body(Matcher::Contains("\"testing-library\": \"WireMock\"".into()))
//!   .match_body(Matcher::Contains("\"creator\": \"Tom Akehurst\"".into()))
//!   .with_body("\"success\": \"true\"")
//!   .create();
//!
//! s.stub("GET", "/sample/wiremock")
//!   .match_header("accept", Matcher::Regex("text/.*".into()))
//!   .with_status(503)
//!   .create();
//! ```
//!
//! # Priorities
//!
//! When several stubs match a request, the one with the lowest priority value wins. Stubs without
//! a priority lose against every stub with one, and between equal priorities **the most recently
//! created stub wins**.
//!
//! # Scenarios
//!
//! A scenario is a named state held by the server. A stub can require a state to match and move
//! the scenario to another state once it served a request. Every scenario begins in `STARTED`.
//!
//! ## Example
//!
//! ```
//! use wirestub::STARTED;
//!
//! let mut s = wirestub::Server::new();
//!
//! for (current, next, body) in [
//!     (STARTED, "second", "success1"),
//!     ("second", "third", "success2"),
//!     ("third", STARTED, "success3"),
//! ] {
//!     s.stub("GET", "/mock-scenario-test")
//!         .in_scenario("mock scenario")
//!         .when_scenario_state_is(current)
//!         .will_set_state_to(next)
//!         .with_body(body)
//!         .create();
//! }
//!
//! // Three requests answer success1, success2 and success3, the fourth starts over.
//! assert_eq!(Some(STARTED.to_string()), s.scenario_state("mock scenario"));
//! ```
//!
//! # Verifying
//!
//! Every request is recorded, matched or not. `Server::verify` checks that exactly one recorded
//! request matches a `RequestPattern`, `Server::verify_count` accepts any `Times`.
//!
//! ## Example
//!
//! ```
//! use wirestub::{RequestPattern, Times};
//!
//! let s = wirestub::Server::new();
//!
//! // Nothing was sent to the server yet.
//! assert!(s.verify(&RequestPattern::get("/hello")).is_err());
//! assert!(s.verify_count(Times::Exactly(0), &RequestPattern::get("/hello")).is_ok());
//! ```
//!
//! Stubs also count the requests they served: see `Stub::expect` and `Stub::assert`.
//!
//! # Cleaning up
//!
//! `Server::reset` removes all stubs, recorded requests and scenarios. `Server::reset_scenarios`
//! and `Server::reset_requests` only clear one of them. Pooled servers are reset when they go out
//! of scope.
//!
//! # Debug
//!
//! Wirestub logs through the `log` crate. Install any logger (for example `env_logger`) and set
//! the level to `debug` to see every incoming request and the stub it matched.
//!

pub use error::{Error, ErrorKind};
pub use matcher::{Matcher, UrlMatcher};
pub use request::Request;
pub use request_pattern::RequestPattern;
pub use scenario::STARTED;
pub use server::{Server, ServerOpts};
pub use server_pool::ServerGuard;
pub use stub::Stub;
pub use verification::Times;

mod diff;
mod error;
mod journal;
mod matcher;
mod request;
mod request_pattern;
mod response;
mod scenario;
mod server;
mod server_pool;
mod stub;
mod verification;
