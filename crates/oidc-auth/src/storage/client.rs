//! Client directory.
//!
//! Defines the lookup contract the authorize and token flows use to resolve
//! clients, plus an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::types::Client;

// =============================================================================
// Client Repository Trait
// =============================================================================

/// Read access to registered clients.
///
/// # Example
///
/// ```ignore
/// use oidc_auth::storage::ClientRepository;
///
/// async fn example(clients: &impl ClientRepository) -> AuthResult<()> {
///     if let Some(client) = clients.get("my-app").await? {
///         assert!(client.is_redirect_uri_allowed("https://app/cb"));
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Finds a client by its OAuth client_id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Finds a client by id and verifies its secret.
    ///
    /// Returns `None` when the client is unknown or the secret does not
    /// match. Implementations must compare secrets in constant time.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<Option<Client>>;
}

// =============================================================================
// In-Memory Directory
// =============================================================================

/// [`ClientRepository`] backed by a locked `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing any client with the same id.
    pub fn insert(&self, client: Client) {
        self.clients
            .write()
            .insert(client.client_id.clone(), client);
    }

    /// Removes a client.
    pub fn remove(&self, client_id: &str) -> Option<Client> {
        self.clients.write().remove(client_id)
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns `true` if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl FromIterator<Client> for InMemoryClientDirectory {
    fn from_iter<T: IntoIterator<Item = Client>>(iter: T) -> Self {
        let clients = iter
            .into_iter()
            .map(|c| (c.client_id.clone(), c))
            .collect();
        Self {
            clients: RwLock::new(clients),
        }
    }
}

/// Compared against when the client id is unknown.
const UNKNOWN_CLIENT_SECRET: &str = "unknown-client-secret-placeholder";

#[async_trait]
impl ClientRepository for InMemoryClientDirectory {
    async fn get(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.read().get(client_id).cloned())
    }

    async fn get_by_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<Option<Client>> {
        let clients = self.clients.read();
        match clients.get(client_id) {
            Some(client) => Ok(client
                .verify_secret(client_secret)
                .then(|| client.clone())),
            None => {
                // Spend the same comparison on unknown ids
                let _ = UNKNOWN_CLIENT_SECRET.as_bytes().ct_eq(client_secret.as_bytes());
                Ok(None)
            }
        }
    }
}
