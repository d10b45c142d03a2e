//! Terraform provider for Active Directory group management over LDAP

pub mod data_sources;
pub mod ldap;
pub mod provider_data;
pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use ldap::{LdapClient, LdapConfig};
use provider_data::AdProviderData;

pub struct AdProvider;

impl Default for AdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AdProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Config value with environment fallback; empty strings count as unset
fn config_string(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
}

fn config_bool(config: &DynamicValue, name: &str, env: &str) -> Option<bool> {
    config
        .get_bool(&AttributePath::new(name))
        .ok()
        .or_else(|| {
            std::env::var(env)
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
        })
}

fn config_port(config: &DynamicValue) -> Option<u16> {
    config
        .get_number(&AttributePath::new("port"))
        .ok()
        .map(|n| n as u16)
        .or_else(|| {
            std::env::var("AD_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
        })
}

/// 636 for LDAPS, 389 for plain LDAP, unless an explicit port is given
fn resolve_port(port: Option<u16>, use_tls: bool) -> u16 {
    port.unwrap_or(if use_tls { 636 } else { 389 })
}

fn required_diag(name: &str, env: &str) -> Diagnostic {
    Diagnostic::error(
        "Missing provider configuration",
        format!("{} is required (set in provider config or {} env var)", name, env),
    )
}

#[async_trait]
impl Provider for AdProvider {
    fn type_name(&self) -> &str {
        "ad"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "ad".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Manage Active Directory groups and memberships over LDAP")
            .attribute(
                AttributeBuilder::new("server", AttributeType::String)
                    .description("AD server hostname (or AD_SERVER env var)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::Number)
                    .description("LDAP port, defaults to 389 or 636 with TLS (or AD_PORT env var)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("base_dn", AttributeType::String)
                    .description("Base DN for searches, e.g. DC=example,DC=com (or AD_BASE_DN env var)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("Bind username (or AD_USERNAME env var)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Bind password (or AD_PASSWORD env var)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("use_tls", AttributeType::Bool)
                    .description("Connect over LDAPS (or AD_USE_TLS env var)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification (or AD_INSECURE env var)")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = &request.config;

        let server = config_string(config, "server", "AD_SERVER");
        let base_dn = config_string(config, "base_dn", "AD_BASE_DN");
        let username = config_string(config, "username", "AD_USERNAME");
        let password = config_string(config, "password", "AD_PASSWORD");
        let use_tls = config_bool(config, "use_tls", "AD_USE_TLS").unwrap_or(false);
        let insecure = config_bool(config, "insecure", "AD_INSECURE").unwrap_or(false);
        let port = resolve_port(config_port(config), use_tls);

        let mut diagnostics = vec![];
        if server.is_none() {
            diagnostics.push(required_diag("server", "AD_SERVER"));
        }
        if base_dn.is_none() {
            diagnostics.push(required_diag("base_dn", "AD_BASE_DN"));
        }
        if username.is_none() {
            diagnostics.push(required_diag("username", "AD_USERNAME"));
        }
        if password.is_none() {
            diagnostics.push(required_diag("password", "AD_PASSWORD"));
        }
        let (Some(server), Some(base_dn), Some(username), Some(password)) =
            (server, base_dn, username, password)
        else {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        let ldap_config = LdapConfig {
            server,
            port,
            username,
            password,
            use_tls,
            insecure,
            base_dn,
        };

        match LdapClient::connect(&ldap_config).await {
            Ok(client) => ConfigureProviderResponse {
                diagnostics,
                provider_data: Some(Arc::new(AdProviderData::new(client))),
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to configure LDAP client",
                    e.to_string(),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "ad_group".to_string(),
            Box::new(|| Box::new(resources::group::GroupResource::new())),
        );
        factories.insert(
            "ad_group_membership".to_string(),
            Box::new(|| Box::new(resources::group_membership::GroupMembershipResource::new())),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "ad_group".to_string(),
            Box::new(|| Box::new(data_sources::group::GroupDataSource::new())),
        );
        factories.insert(
            "ad_groups".to_string(),
            Box::new(|| Box::new(data_sources::groups::GroupsDataSource::new())),
        );
        factories.insert(
            "ad_user".to_string(),
            Box::new(|| Box::new(data_sources::user::UserDataSource::new())),
        );
        factories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_ad_env() {
        for var in [
            "AD_SERVER",
            "AD_PORT",
            "AD_BASE_DN",
            "AD_USERNAME",
            "AD_PASSWORD",
            "AD_USE_TLS",
            "AD_INSECURE",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn port_defaults_follow_tls() {
        assert_eq!(resolve_port(None, false), 389);
        assert_eq!(resolve_port(None, true), 636);
        assert_eq!(resolve_port(Some(3268), true), 3268);
    }

    #[tokio::test]
    #[serial]
    async fn configure_reports_each_missing_value() {
        clear_ad_env();
        let mut provider = AdProvider::new();
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    config: DynamicValue::empty_object(),
                },
            )
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics.len(), 4);
        let details: Vec<_> = response
            .diagnostics
            .iter()
            .map(|d| d.detail.as_str())
            .collect();
        assert!(details.iter().any(|d| d.contains("AD_SERVER")));
        assert!(details.iter().any(|d| d.contains("AD_BASE_DN")));
        assert!(details.iter().any(|d| d.contains("AD_USERNAME")));
        assert!(details.iter().any(|d| d.contains("AD_PASSWORD")));
    }

    #[test]
    #[serial]
    fn config_values_fall_back_to_env() {
        clear_ad_env();
        std::env::set_var("AD_SERVER", "dc01.example.com");
        std::env::set_var("AD_USE_TLS", "true");
        std::env::set_var("AD_PORT", "3269");

        let config = DynamicValue::empty_object();
        assert_eq!(
            config_string(&config, "server", "AD_SERVER").as_deref(),
            Some("dc01.example.com")
        );
        assert_eq!(config_bool(&config, "use_tls", "AD_USE_TLS"), Some(true));
        assert_eq!(config_port(&config), Some(3269));

        clear_ad_env();
        assert_eq!(config_string(&config, "server", "AD_SERVER"), None);
    }

    #[test]
    #[serial]
    fn explicit_config_wins_over_env() {
        clear_ad_env();
        std::env::set_var("AD_SERVER", "env.example.com");

        let mut config = DynamicValue::empty_object();
        config
            .set_string(&AttributePath::new("server"), "explicit.example.com".into())
            .unwrap();
        assert_eq!(
            config_string(&config, "server", "AD_SERVER").as_deref(),
            Some("explicit.example.com")
        );
        clear_ad_env();
    }

    #[test]
    fn factories_cover_declared_surface() {
        let provider = AdProvider::new();
        let resources = provider.resources();
        assert_eq!(resources.len(), 2);
        assert!(resources.contains_key("ad_group"));
        assert!(resources.contains_key("ad_group_membership"));

        let data_sources = provider.data_sources();
        assert_eq!(data_sources.len(), 3);
        assert!(data_sources.contains_key("ad_group"));
        assert!(data_sources.contains_key("ad_groups"));
        assert!(data_sources.contains_key("ad_user"));
    }
}
