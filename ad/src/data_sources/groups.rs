//! ad_groups data source - list groups matching a filter

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::ldap::{Group, LdapClient};
use crate::provider_data::AdProviderData;

const DEFAULT_FILTER: &str = "(objectClass=group)";

pub struct GroupsDataSource {
    provider_data: Option<AdProviderData>,
}

impl Default for GroupsDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupsDataSource {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    fn client(&self) -> Option<Arc<LdapClient>> {
        self.provider_data.as_ref().map(|d| d.client.clone())
    }

    pub fn schema_static() -> Schema {
        let summary_object = AttributeType::Object(HashMap::from([
            ("dn".to_string(), AttributeType::String),
            ("cn".to_string(), AttributeType::String),
            ("name".to_string(), AttributeType::String),
            ("sam_account_name".to_string(), AttributeType::String),
            ("description".to_string(), AttributeType::String),
            ("group_type".to_string(), AttributeType::Number),
            ("object_guid".to_string(), AttributeType::String),
            ("object_sid".to_string(), AttributeType::String),
        ]));
        SchemaBuilder::new()
            .version(1)
            .description("List Active Directory groups under the base DN")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("filter", AttributeType::String)
                    .description("LDAP search filter, defaults to (objectClass=group)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("groups", AttributeType::List(Box::new(summary_object)))
                    .description("Group summaries, membership lists omitted")
                    .computed()
                    .build(),
            )
            .build()
    }
}

/// Summary form: membership lists are deliberately left out
fn group_summary(group: &Group) -> Dynamic {
    let mut map = HashMap::new();
    map.insert("dn".to_string(), Dynamic::String(group.dn.clone()));
    map.insert("cn".to_string(), Dynamic::String(group.cn.clone()));
    map.insert("name".to_string(), Dynamic::String(group.name.clone()));
    map.insert(
        "sam_account_name".to_string(),
        Dynamic::String(group.sam_account_name.clone()),
    );
    map.insert(
        "description".to_string(),
        Dynamic::String(group.description.clone()),
    );
    map.insert(
        "group_type".to_string(),
        Dynamic::Number(group.group_type as f64),
    );
    map.insert(
        "object_guid".to_string(),
        Dynamic::String(group.object_guid.clone()),
    );
    map.insert(
        "object_sid".to_string(),
        Dynamic::String(group.object_sid.clone()),
    );
    Dynamic::Map(map)
}

#[async_trait]
impl DataSource for GroupsDataSource {
    fn type_name(&self) -> &str {
        "ad_groups"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "ad_groups".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(client) = self.client() else {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error(
                    "Provider not configured",
                    "The LDAP client is not available; configure the provider first",
                )],
            };
        };

        let filter = request
            .config
            .get_string(&AttributePath::new("filter"))
            .ok()
            .filter(|s| !s.is_empty());

        let groups = match client.list_groups(filter.as_deref()).await {
            Ok(groups) => groups,
            Err(e) => {
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error("Failed to list groups", e.to_string())],
                };
            }
        };
        tracing::debug!(count = groups.len(), "listed groups");

        let mut state = DynamicValue::empty_object();
        let filter_used = filter.unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let build = state
            .set_string(&AttributePath::new("id"), filter_used.clone())
            .and_then(|_| state.set_string(&AttributePath::new("filter"), filter_used))
            .and_then(|_| {
                state.set_list(
                    &AttributePath::new("groups"),
                    groups.iter().map(group_summary).collect(),
                )
            });
        if let Err(e) = build {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
            };
        }

        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for GroupsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        if let Some(data) = request.provider_data {
            match data.downcast_ref::<AdProviderData>() {
                Some(provider_data) => self.provider_data = Some(provider_data.clone()),
                None => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Expected AdProviderData",
                )),
            }
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_omits_membership() {
        let group = Group {
            dn: "CN=engineers,OU=Groups,DC=example,DC=com".into(),
            cn: "engineers".into(),
            members: vec!["CN=alice,OU=Users,DC=example,DC=com".into()],
            ..Default::default()
        };
        let Dynamic::Map(map) = group_summary(&group) else {
            panic!("expected map");
        };
        assert_eq!(
            map.get("dn"),
            Some(&Dynamic::String(
                "CN=engineers,OU=Groups,DC=example,DC=com".into()
            ))
        );
        assert!(!map.contains_key("members"));
        assert!(!map.contains_key("member_of"));
    }
}
