//! Moving encoded frames between a client and a server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::error::RemoteError;
use crate::server::CommandServer;

/// Carries one request frame to a server and brings its response back.
pub trait Transport: Send + Sync {
    fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, RemoteError>;
}

/// In-process transport handing frames straight to a [`CommandServer`].
///
/// It can be taken offline to exercise network failure paths.
pub struct LoopbackTransport {
    server: Arc<CommandServer>,
    online: AtomicBool,
}

impl LoopbackTransport {
    pub fn new(server: Arc<CommandServer>) -> Arc<Self> {
        Arc::new(Self {
            server,
            online: AtomicBool::new(true),
        })
    }

    pub fn server(&self) -> &Arc<CommandServer> {
        &self.server
    }

    pub fn set_online(&self, online: bool) {
        debug!(
            "loopback to {} {}",
            self.server.provided().full_name(),
            if online { "online" } else { "offline" }
        );
        self.online.store(online, Ordering::Release);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}

impl Transport for LoopbackTransport {
    fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, RemoteError> {
        if !self.is_online() {
            return Err(RemoteError::Disconnected);
        }
        Ok(self.server.handle(request))
    }
}
