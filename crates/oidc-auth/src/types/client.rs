//! OAuth 2.0 client registration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// A registered relying party.
///
/// Clients are immutable once registered. Every `redirect_uri` used in a flow
/// must be an exact member of [`Client::redirect_uris`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    /// OAuth client identifier.
    pub client_id: String,

    /// Shared secret presented at the token endpoint.
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Registered redirect URIs.
    pub redirect_uris: HashSet<String>,
}

impl Client {
    /// Creates a client with the given redirect URIs.
    #[must_use]
    pub fn new<I, S>(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uris: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uris: redirect_uris.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks if the given redirect URI is registered for this client.
    ///
    /// Exact string match: no prefix, query or trailing-slash normalization.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.contains(uri)
    }

    /// Compares `candidate` with the stored secret in constant time.
    ///
    /// Running time does not depend on how many leading bytes match.
    #[must_use]
    pub fn verify_secret(&self, candidate: &str) -> bool {
        self.client_secret
            .as_bytes()
            .ct_eq(candidate.as_bytes())
            .into()
    }
}
