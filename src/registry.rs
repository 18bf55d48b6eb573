//! Session registry.
//!
//! Every connected client gets its own [`PlotSession`] with its own catalog and
//! visibility matrix; nothing is shared between entries. The registry hands out
//! handles by session id and tears sessions down.

use crate::bridge::SharedSelection;
use crate::commands::EventReceiver;
use crate::config::AppConfig;
use crate::error::{AppResult, PlotError};
use crate::session::{PlotSession, SessionHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// How long a closing session may take to flush and stop before it is aborted.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What a caller receives when a session is opened.
#[derive(Debug)]
pub struct OpenedSession {
    pub handle: SessionHandle,
    pub events: EventReceiver,
    /// Selection the client's table widget writes into.
    pub selection: SharedSelection,
}

struct RegisteredSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

pub struct SessionRegistry {
    config: AppConfig,
    sessions: RwLock<HashMap<Uuid, RegisteredSession>>,
}

impl SessionRegistry {
    /// Create a registry whose sessions all start from `config`
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Spawn a fresh, empty session
    pub fn open(&self) -> OpenedSession {
        let selection = SharedSelection::new();
        let (handle, events, task) =
            PlotSession::spawn(self.config.clone(), Arc::new(selection.clone()));
        info!(session = %handle.id(), "Session opened");

        self.sessions.write().insert(
            handle.id(),
            RegisteredSession {
                handle: handle.clone(),
                task,
            },
        );

        OpenedSession {
            handle,
            events,
            selection,
        }
    }

    /// Get a handle to a running session
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.read().get(id).map(|s| s.handle.clone())
    }

    /// Ids of all registered sessions
    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Shut a session down and forget it
    ///
    /// Returns `false` if no session with this id was registered. A session that does
    /// not stop within [`SHUTDOWN_TIMEOUT`] is aborted.
    pub async fn close(&self, id: &Uuid) -> AppResult<bool> {
        let removed = self.sessions.write().remove(id);
        let Some(registered) = removed else {
            return Ok(false);
        };

        // Already stopped sessions only need their task reaped.
        match registered.handle.shutdown().await {
            Ok(()) | Err(PlotError::SessionClosed) => {}
            Err(e) => return Err(e),
        }

        let mut task = registered.task;
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
            Ok(Ok(())) => info!(session = %id, "Session closed"),
            Ok(Err(e)) => warn!(session = %id, error = %e, "Session task failed"),
            Err(_) => {
                warn!(session = %id, "Session did not stop in time, aborting");
                task.abort();
            }
        }
        Ok(true)
    }

    /// Close every registered session
    pub async fn close_all(&self) {
        for id in self.ids() {
            if let Err(e) = self.close(&id).await {
                warn!(session = %id, error = %e, "Failed to close session");
            }
        }
    }
}
