use crate::journal::Journal;
use crate::response::Response;
use crate::scenario::{ScenarioStep, Scenarios};
use crate::server_pool::{pool, ServerGuard};
use crate::stub::InnerStub;
use crate::verification::{self, Times};
use crate::{Error, ErrorKind, Request, RequestPattern, Stub, UrlMatcher};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use std::cmp::Reverse;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use tokio::net::TcpListener;
use tokio::runtime;
use tokio::sync::oneshot;

#[derive(Clone, Debug)]
pub(crate) struct RemoteStub {
    pub(crate) inner: InnerStub,
    pub(crate) scenario: Option<ScenarioStep>,
    pub(crate) sequence: usize,
    pub(crate) hits: usize,
}

impl RemoteStub {
    pub(crate) fn new(inner: InnerStub) -> Self {
        let scenario = inner.scenario_step();
        RemoteStub {
            inner,
            scenario,
            sequence: 0,
            hits: 0,
        }
    }

    fn accepts(&self, request: &Request, scenarios: &Scenarios) -> bool {
        self.inner.pattern.matches(request)
            && self
                .scenario
                .as_ref()
                .map_or(true, |step| step.is_satisfied_by(scenarios))
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    stubs: Vec<RemoteStub>,
    scenarios: Scenarios,
    journal: Journal,
    next_sequence: usize,
}

impl State {
    fn new() -> Self {
        State {
            stubs: Vec::new(),
            scenarios: Scenarios::new(),
            journal: Journal::new(),
            next_sequence: 0,
        }
    }

    pub(crate) fn read(lock: &RwLock<State>) -> RwLockReadGuard<'_, State> {
        lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(lock: &RwLock<State>) -> RwLockWriteGuard<'_, State> {
        lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&mut self, mut remote_stub: RemoteStub) {
        if let Some(ref step) = remote_stub.scenario {
            self.scenarios.register(&step.name);
        }

        remote_stub.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.stubs.push(remote_stub);
    }

    pub(crate) fn remove_stub(&mut self, stub_id: &str) {
        if let Some(pos) = self
            .stubs
            .iter()
            .position(|remote_stub| remote_stub.inner.id == stub_id)
        {
            self.stubs.remove(pos);
        }
    }

    pub(crate) fn stub_hits(&self, stub_id: &str) -> Option<usize> {
        self.stubs
            .iter()
            .find(|remote_stub| remote_stub.inner.id == stub_id)
            .map(|remote_stub| remote_stub.hits)
    }

    /// Journals a request that never reached matching.
    pub(crate) fn record_unserved(&mut self, request: Request) {
        self.journal.record(request, None);
    }

    pub(crate) fn last_unmatched_request(&self) -> Option<String> {
        self.journal.last_unmatched().map(Request::to_string)
    }

    fn winner(&self, request: &Request) -> Option<usize> {
        self.stubs
            .iter()
            .enumerate()
            .filter(|(_, remote_stub)| remote_stub.accepts(request, &self.scenarios))
            .min_by_key(|(_, remote_stub)| {
                (remote_stub.inner.priority, Reverse(remote_stub.sequence))
            })
            .map(|(index, _)| index)
    }

    /// Picks the winning stub, applies its scenario transition and records the request.
    /// Callers hold the write lock for the whole call.
    pub(crate) fn serve(&mut self, request: Request) -> Result<Response, Error> {
        let Some(index) = self.winner(&request) else {
            let error = Error::new_with_context(ErrorKind::NoMatchingStub, &request);
            self.journal.record(request, None);
            return Err(error);
        };

        let remote_stub = &mut self.stubs[index];
        remote_stub.hits += 1;
        if let Some(ref step) = remote_stub.scenario {
            self.scenarios.advance(step);
        }

        log::debug!("Request matched stub {}", remote_stub.inner);

        let response = remote_stub.inner.response.clone();
        self.journal
            .record(request, Some(remote_stub.inner.id.clone()));

        Ok(response)
    }

    fn reset(&mut self) {
        self.stubs.clear();
        self.scenarios.clear();
        self.journal.clear();
    }
}

///
/// Options for starting a server outside of the pool.
///
#[derive(Clone, Debug)]
pub struct ServerOpts {
    /// The host to bind to. Defaults to `127.0.0.1`.
    pub host: &'static str,
    /// The port to bind to. Defaults to `0`, a random free port.
    pub port: u16,
}

impl Default for ServerOpts {
    fn default() -> Self {
        ServerOpts {
            host: "127.0.0.1",
            port: 0,
        }
    }
}

///
/// One instance of the stub server.
///
/// Each server runs on a separate thread within the same process and owns its stubs, its
/// scenario states and its request journal. Stopping or dropping the server releases its port.
///
/// Servers created with `Server::new` or `Server::new_async` come from a pool: they listen on a
/// random port and are reset before being handed out again.
///
/// ## Example
///
/// ```
/// let mut s = wirestub::Server::new();
///
/// let _stub = s.stub("GET", "/hello").with_body("world").create();
///
/// // Point your client at `s.url()`, then verify:
/// assert!(s.verify(&wirestub::RequestPattern::get("/hello")).is_err());
/// ```
///
#[derive(Debug)]
pub struct Server {
    address: SocketAddr,
    state: Arc<RwLock<State>>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Server {
    ///
    /// Fetches a new stub server from the server pool.
    ///
    /// This method will panic on failure.
    ///
    /// If for any reason you'd like to bypass the server pool, you can use `Server::new_with_opts`.
    ///
    #[allow(clippy::new_ret_no_self)]
    #[track_caller]
    pub fn new() -> ServerGuard {
        Server::try_new().unwrap()
    }

    ///
    /// Same as `Server::new` but async.
    ///
    pub async fn new_async() -> ServerGuard {
        Server::try_new_async().await.unwrap()
    }

    ///
    /// Same as `Server::new` but won't panic on failure.
    ///
    pub fn try_new() -> Result<ServerGuard, Error> {
        runtime::Builder::new_current_thread()
            .build()
            .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?
            .block_on(Server::try_new_async())
    }

    ///
    /// Same as `Server::try_new` but async.
    ///
    pub async fn try_new_async() -> Result<ServerGuard, Error> {
        pool().get_async().await
    }

    ///
    /// Starts a new server with the given options, outside of the pool.
    ///
    /// This method will panic on failure.
    ///
    #[track_caller]
    pub fn new_with_opts(opts: ServerOpts) -> Server {
        Server::try_new_with_opts(opts).unwrap()
    }

    ///
    /// Starts a new server on `127.0.0.1` and the given port, outside of the pool.
    ///
    /// Fails with `ErrorKind::BindFailure` when the port is taken.
    ///
    pub fn start(port: u16) -> Result<Server, Error> {
        Server::try_new_with_opts(ServerOpts {
            port,
            ..Default::default()
        })
    }

    ///
    /// Same as `Server::new_with_opts` but won't panic on failure.
    ///
    /// The address is bound before this method returns, so a port already in use fails
    /// here with `ErrorKind::BindFailure`.
    ///
    pub fn try_new_with_opts(opts: ServerOpts) -> Result<Server, Error> {
        let listener = StdTcpListener::bind((opts.host, opts.port)).map_err(|err| {
            Error::new_with_context(
                ErrorKind::BindFailure,
                format!("{}:{}: {}", opts.host, opts.port, err),
            )
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?;
        let address = listener
            .local_addr()
            .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?;

        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?;

        let state = Arc::new(RwLock::new(State::new()));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let worker = {
            let state = state.clone();
            thread::Builder::new()
                .name(format!("wirestub::server_{}", address))
                .spawn(move || runtime.block_on(serve(listener, state, shutdown_receiver)))
                .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?
        };

        log::debug!("Server listening on {}", address);

        Ok(Server {
            address,
            state,
            shutdown: Some(shutdown_sender),
            worker: Some(worker),
        })
    }

    ///
    /// Initializes a stub with the given HTTP `method` and `url`.
    ///
    /// The stub is registered to the server only after the `create()` method has been called.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::UrlMatcher;
    ///
    /// let mut s = wirestub::Server::new();
    ///
    /// let _s1 = s.stub("GET", "/").create();
    /// let _s2 = s.stub("POST", "/users").create();
    /// let _s3 = s.stub("GET", UrlMatcher::PathRegex("/users/[0-9]+".into())).create();
    /// ```
    ///
    #[track_caller]
    pub fn stub<U: Into<UrlMatcher>>(&mut self, method: &str, url: U) -> Stub {
        self.stub_for(RequestPattern::new(method, url))
    }

    ///
    /// Initializes a stub accepting the requests the given pattern matches.
    ///
    pub fn stub_for(&mut self, pattern: RequestPattern) -> Stub {
        Stub::new(self.state.clone(), pattern)
    }

    ///
    /// The URL of the stub server (including the protocol).
    ///
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    ///
    /// The host and port of the stub server.
    /// Can be used with `std::net::TcpStream`.
    ///
    pub fn host_with_port(&self) -> String {
        self.address.to_string()
    }

    ///
    /// The raw address of the stub server.
    ///
    pub fn socket_address(&self) -> SocketAddr {
        self.address
    }

    ///
    /// The port the stub server listens on.
    ///
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    ///
    /// Whether the server still accepts connections.
    ///
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    ///
    /// Removes all the stubs, the recorded requests and the scenarios.
    ///
    pub fn reset(&mut self) {
        State::write(&self.state).reset();
    }

    ///
    /// Moves every scenario back to `STARTED`. Stubs and recorded requests are kept.
    ///
    pub fn reset_scenarios(&mut self) {
        State::write(&self.state).scenarios.reset();
    }

    ///
    /// Forgets the recorded requests. Stubs and scenarios are kept.
    ///
    pub fn reset_requests(&mut self) {
        State::write(&self.state).journal.clear();
    }

    ///
    /// The current state of the named scenario, if the server knows it.
    ///
    pub fn scenario_state(&self, name: &str) -> Option<String> {
        State::read(&self.state)
            .scenarios
            .get(name)
            .map(ToOwned::to_owned)
    }

    ///
    /// Forces the named scenario into the given state.
    ///
    pub fn set_scenario_state(&mut self, name: &str, state: &str) {
        State::write(&self.state).scenarios.set(name, state);
    }

    ///
    /// All the requests received so far, in arrival order.
    ///
    pub fn received_requests(&self) -> Vec<Request> {
        State::read(&self.state).journal.requests().cloned().collect()
    }

    ///
    /// The requests no stub matched, in arrival order.
    ///
    pub fn unmatched_requests(&self) -> Vec<Request> {
        State::read(&self.state)
            .journal
            .unmatched()
            .cloned()
            .collect()
    }

    ///
    /// The received requests matching the pattern, in arrival order.
    ///
    pub fn find_requests(&self, pattern: &RequestPattern) -> Vec<Request> {
        State::read(&self.state)
            .journal
            .find(pattern)
            .cloned()
            .collect()
    }

    ///
    /// How many received requests match the pattern.
    ///
    pub fn count_requests(&self, pattern: &RequestPattern) -> usize {
        State::read(&self.state).journal.count(pattern)
    }

    ///
    /// Checks that exactly one received request matches the pattern.
    ///
    /// ## Example
    ///
    /// ```
    /// use wirestub::{Matcher, RequestPattern};
    ///
    /// let s = wirestub::Server::new();
    ///
    /// let result = s.verify(
    ///     &RequestPattern::post("/sample/wiremock").match_header("content-type", "application/json"),
    /// );
    ///
    /// // Nothing was sent yet.
    /// assert_eq!(wirestub::ErrorKind::VerificationFailure, result.unwrap_err().kind);
    /// ```
    ///
    pub fn verify(&self, pattern: &RequestPattern) -> Result<(), Error> {
        self.verify_count(Times::Exactly(1), pattern)
    }

    ///
    /// Checks that at least one received request matches the pattern.
    ///
    pub fn verify_at_least_once(&self, pattern: &RequestPattern) -> Result<(), Error> {
        self.verify_count(Times::AtLeast(1), pattern)
    }

    ///
    /// Checks how many received requests match the pattern. The error context explains the
    /// mismatch. The journal is left untouched.
    ///
    pub fn verify_count(&self, times: Times, pattern: &RequestPattern) -> Result<(), Error> {
        verification::verify(&State::read(&self.state).journal, times, pattern)
    }

    ///
    /// Stops accepting connections and releases the port. Called on drop.
    ///
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Server thread for {} panicked", self.address);
            }
            log::debug!("Server on {} stopped", self.address);
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    listener: StdTcpListener,
    state: Arc<RwLock<State>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            log::warn!("Could not register the listener: {}", err);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let state = state.clone();

                    tokio::spawn(async move {
                        let service = service_fn(move |request| {
                            handle_request(request, state.clone())
                        });

                        let builder = ConnectionBuilder::new(TokioExecutor::new());
                        if let Err(err) = builder
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            log::debug!("Error while serving a connection: {}", err);
                        }
                    });
                }
                Err(err) => log::debug!("Error while accepting a connection: {}", err),
            }
        }
    }
}

async fn handle_request(
    request: hyper::Request<Incoming>,
    state: Arc<RwLock<State>>,
) -> Result<hyper::Response<Full<Bytes>>, Error> {
    let (parts, body) = request.into_parts();

    let response = match body.collect().await {
        Ok(collected) => {
            let request = Request::new(parts, collected.to_bytes());
            log::debug!("Request received: {}", request);

            let served = State::write(&state).serve(request);
            served.unwrap_or_else(|error| {
                log::debug!("{}", error);
                Response::not_matched(&error)
            })
        }
        Err(err) => {
            let error = Error::new_with_context(ErrorKind::MalformedRequest, err);
            log::debug!("{}", error);

            State::write(&state).record_unserved(Request::new(parts, Bytes::new()));
            Response::malformed(&error)
        }
    };

    response.into_hyper().or_else(|error| {
        log::warn!("{}", error);
        let mut fallback = hyper::Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        Ok(fallback)
    })
}
