/*
[INPUT]:  Discovery options, reader candidates, registration codes
[OUTPUT]: Connection state transitions and the connected reader handle
[POS]:    Orchestration layer - reader connection state machine
[UPDATE]: When discovery, connection, or registration flows change
*/

use std::sync::atomic::Ordering;

use terminal_pos_adapter::{DiscoveryOptions, Reader, RegisterReaderRequest, TerminalError};
use tracing::{info, warn};

use super::WorkflowController;
use crate::error::{Result, WorkflowError};
use crate::session::{ConnectionState, ReaderHandle};

/// How a discovery run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Found(Vec<Reader>),
    /// `cancel_discovery` was called; the result was discarded
    Cancelled,
}

impl WorkflowController {
    /// Look for readers. Only valid while not connected.
    pub async fn discover(&self, options: &DiscoveryOptions) -> Result<DiscoveryOutcome> {
        {
            let mut session = self.inner.session();
            if session.connection != ConnectionState::NotConnected {
                return Err(WorkflowError::InvalidState {
                    action: "discover readers",
                    state: session.connection,
                });
            }
            // Reset under the lock so a cancel landing right after the switch is kept
            self.inner.discovery_cancelled.store(false, Ordering::SeqCst);
            session.connection = ConnectionState::Discovering;
        }
        info!(simulated = options.simulated, location = ?options.location, "discovering readers");

        let result = self.inner.reader.discover_readers(options).await;
        let cancelled = self.inner.discovery_cancelled.swap(false, Ordering::SeqCst);

        let mut session = self.inner.session();
        if session.connection == ConnectionState::Discovering {
            session.connection = ConnectionState::NotConnected;
        }
        if cancelled {
            info!("reader discovery cancelled");
            return Ok(DiscoveryOutcome::Cancelled);
        }
        match result {
            Ok(readers) => {
                info!(count = readers.len(), "readers discovered");
                session.discovered_readers = readers.clone();
                Ok(DiscoveryOutcome::Found(readers))
            }
            Err(err) => {
                warn!(error = %err, "reader discovery failed");
                Err(err.into())
            }
        }
    }

    /// Discard the result of the discovery currently running
    pub fn cancel_discovery(&self) -> Result<()> {
        let session = self.inner.session();
        if session.connection != ConnectionState::Discovering {
            return Err(WorkflowError::NotCancelable("no discovery in progress"));
        }
        self.inner.discovery_cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn connect(&self, candidate: &Reader) -> Result<ReaderHandle> {
        {
            let mut session = self.inner.session();
            if session.connection != ConnectionState::NotConnected {
                return Err(WorkflowError::InvalidState {
                    action: "connect a reader",
                    state: session.connection,
                });
            }
            session.connection = ConnectionState::Connecting;
        }
        info!(reader_id = %candidate.id, "connecting to reader");

        match self.inner.reader.connect_reader(candidate).await {
            Ok(connected) => {
                let mut session = self.inner.session();
                session.set_connected(&connected);
                info!(
                    reader_id = %connected.id,
                    label = connected.display_label(),
                    simulator = session.using_simulator,
                    "reader connected"
                );
                Ok(ReaderHandle::from(&connected))
            }
            Err(err) => {
                self.inner.session().clear_connection();
                warn!(reader_id = %candidate.id, error = %err, "reader connection failed");
                Err(err.into())
            }
        }
    }

    /// Discover the simulated reader and connect to it
    pub async fn connect_to_simulator(&self) -> Result<ReaderHandle> {
        let readers = match self.discover(&DiscoveryOptions::simulated()).await? {
            DiscoveryOutcome::Found(readers) => readers,
            DiscoveryOutcome::Cancelled => return Err(WorkflowError::DiscoveryCancelled),
        };
        let simulator = readers.into_iter().next().ok_or_else(|| {
            TerminalError::reader_with_code("no_readers_found", "no simulated reader found")
        })?;
        self.connect(&simulator).await
    }

    /// Register a reader with the backend, then connect to it
    pub async fn register_and_connect(
        &self,
        label: &str,
        registration_code: &str,
        location: Option<String>,
    ) -> Result<ReaderHandle> {
        {
            let session = self.inner.session();
            if session.connection != ConnectionState::NotConnected {
                return Err(WorkflowError::InvalidState {
                    action: "register a reader",
                    state: session.connection,
                });
            }
        }
        if registration_code.trim().is_empty() {
            return Err(WorkflowError::validation("registration code is required"));
        }

        let request = RegisterReaderRequest {
            label: label.trim().to_string(),
            registration_code: registration_code.trim().to_string(),
            location: location.filter(|location| !location.trim().is_empty()),
        };
        let reader = self.inner.backend.register_reader(&request).await?;
        info!(reader_id = %reader.id, label = reader.display_label(), "reader registered");
        self.connect(&reader).await
    }

    /// Disconnect the reader. State is cleared even if the reader call fails.
    pub async fn disconnect(&self) -> Result<()> {
        let reader_id = {
            let session = self.inner.session();
            match &session.reader {
                Some(reader) => reader.id.clone(),
                None => return Err(WorkflowError::NotConnected),
            }
        };

        let result = self.inner.reader.disconnect_reader().await;
        self.inner.session().clear_connection();

        match result {
            Ok(()) => {
                info!(reader_id = %reader_id, "reader disconnected");
                Ok(())
            }
            Err(err) => {
                warn!(reader_id = %reader_id, error = %err, "reader disconnect failed");
                Err(err.into())
            }
        }
    }

    /// Ask the backend whether the connected reader is reachable
    pub async fn verify_reader(&self) -> Result<ReaderHandle> {
        let reader_id = {
            let session = self.inner.session();
            session
                .reader
                .as_ref()
                .map(|reader| reader.id.clone())
                .ok_or(WorkflowError::NotConnected)?
        };

        let verified = self.inner.backend.verify_reader(&reader_id).await?;
        info!(reader_id = %reader_id, status = ?verified.status, "reader verified");

        let mut session = self.inner.session();
        match session.reader.as_mut() {
            Some(handle) if handle.id == reader_id => {
                handle.status = verified.status.or(handle.status);
                if verified.label.is_some() {
                    handle.label = verified.label;
                }
                Ok(handle.clone())
            }
            _ => Err(WorkflowError::NotConnected),
        }
    }
}
