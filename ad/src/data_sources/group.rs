//! ad_group data source - look up one group by DN or CN

use async_trait::async_trait;
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

pub struct GroupDataSource {
    provider_data: Option<AdProviderData>,
}

impl Default for GroupDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupDataSource {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    fn client(&self) -> Option<Arc<LdapClient>> {
        self.provider_data.as_ref().map(|d| d.client.clone())
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(1)
            .description("Look up an Active Directory group by DN or CN")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dn", AttributeType::String)
                    .description("Distinguished name to look up, conflicts with cn")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cn", AttributeType::String)
                    .description("Common name to search for under the base DN, conflicts with dn")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sam_account_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_type", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("managed_by", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "members",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("DNs of all direct members")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "member_of",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("DNs of groups this group belongs to")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("object_guid", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("object_sid", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }
}

pub(crate) fn group_state(group: &Group) -> tfplug::error::Result<DynamicValue> {
    let mut state = DynamicValue::empty_object();
    state.set_string(&AttributePath::new("id"), group.dn.clone())?;
    state.set_string(&AttributePath::new("dn"), group.dn.clone())?;
    state.set_string(&AttributePath::new("cn"), group.cn.clone())?;
    state.set_string(&AttributePath::new("name"), group.name.clone())?;
    state.set_string(
        &AttributePath::new("sam_account_name"),
        group.sam_account_name.clone(),
    )?;
    state.set_string(&AttributePath::new("description"), group.description.clone())?;
    state.set_number(&AttributePath::new("group_type"), group.group_type as f64)?;
    state.set_string(&AttributePath::new("managed_by"), group.managed_by.clone())?;
    state.set_list(
        &AttributePath::new("members"),
        group.members.iter().cloned().map(Dynamic::String).collect(),
    )?;
    state.set_list(
        &AttributePath::new("member_of"),
        group
            .member_of
            .iter()
            .cloned()
            .map(Dynamic::String)
            .collect(),
    )?;
    state.set_string(&AttributePath::new("object_guid"), group.object_guid.clone())?;
    state.set_string(&AttributePath::new("object_sid"), group.object_sid.clone())?;
    Ok(state)
}

fn error_response(summary: &str, detail: String) -> ReadDataSourceResponse {
    ReadDataSourceResponse {
        state: DynamicValue::null(),
        diagnostics: vec![Diagnostic::error(summary, detail)],
    }
}

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &str {
        "ad_group"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "ad_group".to_string(),
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
            return error_response(
                "Provider not configured",
                "The LDAP client is not available; configure the provider first".to_string(),
            );
        };

        let dn = request
            .config
            .get_string(&AttributePath::new("dn"))
            .ok()
            .filter(|s| !s.is_empty());
        let cn = request
            .config
            .get_string(&AttributePath::new("cn"))
            .ok()
            .filter(|s| !s.is_empty());

        let result = match (dn, cn) {
            (Some(_), Some(_)) => {
                return error_response(
                    "Invalid configuration",
                    "dn and cn are mutually exclusive, set only one".to_string(),
                );
            }
            (None, None) => {
                return error_response(
                    "Invalid configuration",
                    "one of dn or cn must be set".to_string(),
                );
            }
            (Some(dn), None) => client.get_group(&dn).await,
            (None, Some(cn)) => client.get_group_by_cn(&cn).await,
        };

        match result {
            Ok(group) => match group_state(&group) {
                Ok(state) => ReadDataSourceResponse {
                    state,
                    diagnostics: vec![],
                },
                Err(e) => error_response("Failed to build state", e.to_string()),
            },
            Err(e) => error_response("Failed to read group", e.to_string()),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for GroupDataSource {
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
    fn full_projection_includes_membership_lists() {
        let group = Group {
            dn: "CN=engineers,OU=Groups,DC=example,DC=com".into(),
            cn: "engineers".into(),
            name: "engineers".into(),
            sam_account_name: "engineers".into(),
            description: String::new(),
            group_type: -2147483646,
            managed_by: String::new(),
            members: vec![
                "CN=alice,OU=Users,DC=example,DC=com".into(),
                "CN=bob,OU=Users,DC=example,DC=com".into(),
            ],
            member_of: vec!["CN=all,OU=Groups,DC=example,DC=com".into()],
            object_guid: "01234567-89ab-cdef-0123-456789abcdef".into(),
            object_sid: "S-1-5-32-544".into(),
        };

        let state = group_state(&group).unwrap();
        let members = state.get_list(&AttributePath::new("members")).unwrap();
        assert_eq!(members.len(), 2);
        let member_of = state.get_list(&AttributePath::new("member_of")).unwrap();
        assert_eq!(member_of.len(), 1);
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            group.dn
        );
    }
}
