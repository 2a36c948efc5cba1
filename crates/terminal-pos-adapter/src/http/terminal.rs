/*
[INPUT]:  Reader registration data, reader ids
[OUTPUT]: Connection tokens, readers, locations
[POS]:    HTTP layer - terminal management endpoints
[UPDATE]: When adding new terminal endpoints or changing request fields
*/

use reqwest::Method;
use tracing::info;

use crate::http::{Result, TerminalBackendClient, TerminalError};
use crate::types::{ConnectionToken, Location, LocationsResponse, Reader, RegisterReaderRequest};

impl TerminalBackendClient {
    /// Issue a connection token for the reader SDK
    ///
    /// POST /connection_token
    pub async fn create_connection_token(&self) -> Result<ConnectionToken> {
        self.post_form("/connection_token", &[]).await
    }

    /// Register a reader by its registration code
    ///
    /// POST /register_reader
    pub async fn register_reader(&self, req: &RegisterReaderRequest) -> Result<Reader> {
        if req.registration_code.trim().is_empty() {
            return Err(TerminalError::Validation(
                "registration code is required".to_string(),
            ));
        }
        let reader: Reader = self
            .post_form("/register_reader", &req.form_fields())
            .await?;
        info!(reader_id = %reader.id, "reader registered");
        Ok(reader)
    }

    /// List terminal locations
    ///
    /// GET /list_locations
    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        let builder = self.request(Method::GET, "/list_locations")?;
        let LocationsResponse(locations) = self.send_json(builder).await?;
        Ok(locations)
    }

    /// Ask the backend for the reader's current state
    ///
    /// POST /verify_terminal_connection
    pub async fn verify_terminal_connection(&self, reader_id: &str) -> Result<Reader> {
        self.post_form(
            "/verify_terminal_connection",
            &[("reader_id", reader_id.to_string())],
        )
        .await
    }

    /// Disconnect a reader server-side
    ///
    /// POST /disconnect_terminal
    pub async fn disconnect_terminal(&self, reader_id: &str) -> Result<Reader> {
        self.post_form("/disconnect_terminal", &[("reader_id", reader_id.to_string())])
            .await
    }
}
