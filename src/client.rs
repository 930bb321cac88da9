//! Typed gateway operations on top of a [`Transport`].

use serde::de::DeserializeOwned;

use crate::api::{
    Message, MessagesResponse, PeersResponse, WifiInfo, MESSAGES_PATH, PEERS_PATH, SEND_PATH,
    WIFI_INFO_PATH,
};
use crate::error::{MeshError, Result};
use crate::form::encode_pair;
use crate::transport::{HttpRequest, Transport};

/// Client for the four gateway endpoints.
#[derive(Debug, Clone)]
pub struct MeshClient<T> {
    transport: T,
}

impl<T: Transport> MeshClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST `message=<text>` to `/send`.
    ///
    /// The text is sent as given; trimming is the caller's concern.
    ///
    /// # Returns
    /// - `Ok(())` on a 2xx response.
    /// - `Err(MeshError::Http)` when the gateway rejects the message.
    /// - `Err(MeshError::Connect)` when it never answers.
    pub async fn send(&self, text: &str) -> Result<()> {
        let request = HttpRequest::post_form(SEND_PATH, encode_pair("message", text));
        let resp = self.transport.execute(request).await?;
        if !resp.is_success() {
            return Err(MeshError::Http {
                status: resp.status,
                url: SEND_PATH.to_string(),
            });
        }
        Ok(())
    }

    /// GET `/messages`: whatever the gateway has not delivered yet.
    pub async fn fetch_messages(&self) -> Result<Vec<Message>> {
        let resp: MessagesResponse = self.get_json(MESSAGES_PATH).await?;
        Ok(resp.messages)
    }

    /// GET `/peers` and reduce it to a count.
    pub async fn fetch_peers(&self) -> Result<usize> {
        let resp: PeersResponse = self.get_json(PEERS_PATH).await?;
        Ok(resp.count())
    }

    pub async fn fetch_wifi_info(&self) -> Result<WifiInfo> {
        self.get_json(WIFI_INFO_PATH).await
    }

    async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let resp = self.transport.execute(HttpRequest::get(path)).await?;
        if !resp.is_success() {
            return Err(MeshError::Http {
                status: resp.status,
                url: path.to_string(),
            });
        }
        serde_json::from_slice(&resp.body).map_err(|e| MeshError::Json {
            endpoint: path.to_string(),
            detail: e.to_string(),
        })
    }
}
