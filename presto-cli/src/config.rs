//! Configuration module
//!
//! Handles CLI configuration: server URL and requester identity.

use presto_client::PrestoClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Presto server
    pub server_url: String,

    /// Requesting user, sent as `X-Presto-User`
    pub user: Option<String>,

    /// Dedup scope, sent as `X-Presto-Session`
    pub session: Option<String>,
}

impl Config {
    /// Builds a client carrying this configuration's identity
    pub fn client(&self) -> PrestoClient {
        let mut client = PrestoClient::new(&self.server_url);
        if let Some(user) = &self.user {
            client = client.with_user(user);
        }
        if let Some(session) = &self.session {
            client = client.with_session(session);
        }
        client
    }
}
