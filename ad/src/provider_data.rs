//! Provider data structure passed to resources and data sources

use crate::ldap::LdapClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AdProviderData {
    pub client: Arc<LdapClient>,
}

impl AdProviderData {
    pub fn new(client: LdapClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
