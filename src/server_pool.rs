use crate::server::ServerOpts;
use crate::Server;
use crate::{Error, ErrorKind};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut, Drop};
use std::sync::{Mutex, OnceLock, PoisonError};
use tokio::sync::{Semaphore, SemaphorePermit};

const DEFAULT_POOL_SIZE: usize = if cfg!(target_os = "macos") { 20 } else { 50 };

static SERVER_POOL: OnceLock<ServerPool> = OnceLock::new();

pub(crate) fn pool() -> &'static ServerPool {
    SERVER_POOL.get_or_init(|| ServerPool::new(DEFAULT_POOL_SIZE))
}

///
/// A handle around a pooled `Server` object which dereferences to `Server`.
///
/// Dropping the guard resets the server (stubs, requests and scenarios) and returns it
/// to the pool.
///
#[derive(Debug)]
pub struct ServerGuard {
    server: Option<Server>,
    _permit: SemaphorePermit<'static>,
}

impl ServerGuard {
    fn new(server: Server, _permit: SemaphorePermit<'static>) -> ServerGuard {
        ServerGuard {
            server: Some(server),
            _permit,
        }
    }
}

impl Deref for ServerGuard {
    type Target = Server;

    fn deref(&self) -> &Self::Target {
        self.server.as_ref().unwrap()
    }
}

impl DerefMut for ServerGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.server.as_mut().unwrap()
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            pool().recycle(server);
        }
    }
}

pub(crate) struct ServerPool {
    semaphore: Semaphore,
    idle: Mutex<VecDeque<Server>>,
}

impl ServerPool {
    fn new(max_size: usize) -> ServerPool {
        ServerPool {
            semaphore: Semaphore::new(max_size),
            idle: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) async fn get_async(&'static self) -> Result<ServerGuard, Error> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::new(ErrorKind::Deadlock))?;

        let recycled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let server = match recycled {
            Some(server) => server,
            None => Server::try_new_with_opts(ServerOpts::default())?,
        };

        Ok(ServerGuard::new(server, permit))
    }

    fn recycle(&self, mut server: Server) {
        // A stopped server can't be handed out again; the next caller starts a fresh one.
        if !server.is_running() {
            return;
        }

        server.reset();
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(server);
    }
}
