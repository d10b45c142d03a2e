//! Connection handling and raw LDAP operations.
//!
//! One bound connection is shared by every resource and data source; the
//! session mutex serializes operations on it. ldap3 message IDs are not
//! multiplexed here, so concurrent callers queue instead of interleaving.

use std::collections::HashSet;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tokio::sync::Mutex;
use url::Url;

use super::error::{LdapClientError, Result};

/// Connection parameters, resolved from provider config and environment
#[derive(Debug, Clone)]
pub struct LdapConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub insecure: bool,
    pub base_dn: String,
}

pub struct LdapClient {
    session: Mutex<Option<Ldap>>,
    base_dn: String,
}

impl LdapClient {
    /// Connects and binds. The returned client is ready for operations.
    pub async fn connect(config: &LdapConfig) -> Result<Self> {
        let scheme = if config.use_tls { "ldaps" } else { "ldap" };
        let url = format!("{}://{}:{}", scheme, config.server, config.port);
        Url::parse(&url)
            .map_err(|e| LdapClientError::InvalidServerUrl(format!("{}: {}", url, e)))?;

        let settings = LdapConnSettings::new().set_no_tls_verify(config.insecure);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(LdapClientError::Dial)?;
        ldap3::drive!(conn);

        tracing::debug!(
            server = %config.server,
            port = config.port,
            tls = config.use_tls,
            "binding to LDAP server"
        );
        let result = ldap
            .simple_bind(&config.username, &config.password)
            .await
            .map_err(LdapClientError::Dial)?;
        if result.rc != 0 {
            return Err(LdapClientError::Bind {
                rc: result.rc,
                text: result.text,
            });
        }

        Ok(Self {
            session: Mutex::new(Some(ldap)),
            base_dn: config.base_dn.clone(),
        })
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub(crate) async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>> {
        let mut guard = self.session.lock().await;
        let ldap = guard.as_mut().ok_or(LdapClientError::NotConnected)?;
        tracing::debug!(base = %base, filter = %filter, "LDAP search");
        let (entries, _) = ldap
            .search(base, scope, filter, attrs.to_vec())
            .await
            .map_err(|e| LdapClientError::from_op("search", base, e))?
            .success()
            .map_err(|e| LdapClientError::from_op("search", base, e))?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    pub(crate) async fn add(&self, dn: &str, attrs: Vec<(String, HashSet<String>)>) -> Result<()> {
        let mut guard = self.session.lock().await;
        let ldap = guard.as_mut().ok_or(LdapClientError::NotConnected)?;
        tracing::debug!(dn = %dn, "LDAP add");
        ldap.add(dn, attrs)
            .await
            .map_err(|e| LdapClientError::from_op("add", dn, e))?
            .success()
            .map_err(|e| LdapClientError::from_op("add", dn, e))?;
        Ok(())
    }

    pub(crate) async fn modify(&self, dn: &str, mods: Vec<Mod<String>>) -> Result<()> {
        let mut guard = self.session.lock().await;
        let ldap = guard.as_mut().ok_or(LdapClientError::NotConnected)?;
        tracing::debug!(dn = %dn, "LDAP modify");
        ldap.modify(dn, mods)
            .await
            .map_err(|e| LdapClientError::from_op("modify", dn, e))?
            .success()
            .map_err(|e| LdapClientError::from_op("modify", dn, e))?;
        Ok(())
    }

    pub(crate) async fn delete(&self, dn: &str) -> Result<()> {
        let mut guard = self.session.lock().await;
        let ldap = guard.as_mut().ok_or(LdapClientError::NotConnected)?;
        tracing::debug!(dn = %dn, "LDAP delete");
        ldap.delete(dn)
            .await
            .map_err(|e| LdapClientError::from_op("delete", dn, e))?
            .success()
            .map_err(|e| LdapClientError::from_op("delete", dn, e))?;
        Ok(())
    }

    pub(crate) async fn rename(
        &self,
        dn: &str,
        new_rdn: &str,
        new_parent: Option<&str>,
    ) -> Result<()> {
        let mut guard = self.session.lock().await;
        let ldap = guard.as_mut().ok_or(LdapClientError::NotConnected)?;
        tracing::debug!(dn = %dn, new_rdn = %new_rdn, "LDAP modifyDN");
        ldap.modifydn(dn, new_rdn, true, new_parent)
            .await
            .map_err(|e| LdapClientError::from_op("modifydn", dn, e))?
            .success()
            .map_err(|e| LdapClientError::from_op("modifydn", dn, e))?;
        Ok(())
    }

    /// Unbinds and drops the session. Safe to call more than once.
    pub async fn close(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut ldap) = guard.take() {
            if let Err(e) = ldap.unbind().await {
                tracing::debug!(error = %e, "LDAP unbind failed");
            }
        }
    }
}
