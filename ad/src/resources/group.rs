//! ad_group resource - manages an Active Directory group

use async_trait::async_trait;
use std::sync::Arc;

use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::ldap::escape::split_rdn;
use crate::ldap::group::NewGroup;
use crate::ldap::{Group, LdapClient, LdapClientError, GROUP_TYPE_GLOBAL_SECURITY};
use crate::provider_data::AdProviderData;

pub struct GroupResource {
    provider_data: Option<AdProviderData>,
}

impl Default for GroupResource {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupResource {
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
            .description("Active Directory group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Distinguished name of the group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dn", AttributeType::String)
                    .description("Distinguished name of the group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cn", AttributeType::String)
                    .description("Common name of the group")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ou", AttributeType::String)
                    .description("DN of the organizational unit the group is created in")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sam_account_name", AttributeType::String)
                    .description("Pre-Windows 2000 name, defaults to the common name")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the group")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_type", AttributeType::Number)
                    .description("groupType attribute value, defaults to global security")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("managed_by", AttributeType::String)
                    .description("DN of the user or group that manages this group")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("object_guid", AttributeType::String)
                    .description("objectGUID assigned by the directory")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("object_sid", AttributeType::String)
                    .description("objectSid assigned by the directory")
                    .computed()
                    .build(),
            )
            .build()
    }
}

/// Builds resource state from a directory group. Optional attributes that the
/// directory reports as empty become null so they do not show up as drift.
fn state_from_group(group: &Group) -> tfplug::error::Result<DynamicValue> {
    let mut state = DynamicValue::empty_object();
    state.set_string(&AttributePath::new("id"), group.dn.clone())?;
    state.set_string(&AttributePath::new("dn"), group.dn.clone())?;
    state.set_string(&AttributePath::new("cn"), group.cn.clone())?;
    state.set_string(&AttributePath::new("ou"), parent_dn(&group.dn))?;
    state.set_string(&AttributePath::new("name"), group.name.clone())?;
    state.set_string(
        &AttributePath::new("sam_account_name"),
        group.sam_account_name.clone(),
    )?;
    if group.description.is_empty() {
        state.set_null(&AttributePath::new("description"))?;
    } else {
        state.set_string(&AttributePath::new("description"), group.description.clone())?;
    }
    state.set_number(&AttributePath::new("group_type"), group.group_type as f64)?;
    if group.managed_by.is_empty() {
        state.set_null(&AttributePath::new("managed_by"))?;
    } else {
        state.set_string(&AttributePath::new("managed_by"), group.managed_by.clone())?;
    }
    state.set_string(&AttributePath::new("object_guid"), group.object_guid.clone())?;
    state.set_string(&AttributePath::new("object_sid"), group.object_sid.clone())?;
    Ok(state)
}

/// Everything after the first unescaped comma, i.e. the containing OU
fn parent_dn(dn: &str) -> String {
    split_rdn(dn)
        .map(|(_, parent)| parent.to_string())
        .unwrap_or_default()
}

/// Turns a directory lookup into a refresh outcome. A typed not-found means
/// the group was deleted out of band and gets dropped from state.
fn read_response(
    dn: &str,
    current_state: DynamicValue,
    result: Result<Group, LdapClientError>,
) -> ReadResourceResponse {
    match result {
        Ok(group) => match state_from_group(&group) {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(current_state),
                diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
            },
        },
        Err(e) if e.is_not_found() => {
            tracing::debug!(dn = %dn, "group gone, removing from state");
            ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            }
        }
        Err(e) => ReadResourceResponse {
            new_state: Some(current_state),
            diagnostics: vec![Diagnostic::error("Failed to read group", e.to_string())],
        },
    }
}

fn delete_response(result: Result<(), LdapClientError>) -> DeleteResourceResponse {
    match result {
        Ok(()) => DeleteResourceResponse {
            diagnostics: vec![],
        },
        // already gone counts as deleted
        Err(e) if e.is_not_found() => DeleteResourceResponse {
            diagnostics: vec![],
        },
        Err(e) => DeleteResourceResponse {
            diagnostics: vec![Diagnostic::error("Failed to delete group", e.to_string())],
        },
    }
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "The LDAP client is not available; configure the provider first",
    )
}

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &str {
        "ad_group"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "ad_group".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];
        let Some(client) = self.client() else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let config = &request.config;
        let cn = config.get_string(&AttributePath::new("cn")).ok();
        let ou = config.get_string(&AttributePath::new("ou")).ok();
        let (Some(cn), Some(ou)) = (cn, ou) else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error(
                    "Invalid configuration",
                    "cn and ou are required",
                )],
            };
        };

        let new_group = NewGroup {
            cn,
            ou,
            sam_account_name: config
                .get_string(&AttributePath::new("sam_account_name"))
                .ok()
                .filter(|s| !s.is_empty()),
            description: config
                .get_string(&AttributePath::new("description"))
                .ok()
                .filter(|s| !s.is_empty()),
            group_type: config
                .get_number(&AttributePath::new("group_type"))
                .ok()
                .map(|n| n as i64)
                .unwrap_or(GROUP_TYPE_GLOBAL_SECURITY),
        };

        let mut group = match client.create_group(&new_group).await {
            Ok(group) => group,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![Diagnostic::error("Failed to create group", e.to_string())],
                };
            }
        };
        tracing::info!(dn = %group.dn, "created group");

        // managedBy cannot be part of the add, the referenced object must be
        // validated by the server in a separate modify
        let managed_by = config
            .get_string(&AttributePath::new("managed_by"))
            .ok()
            .filter(|s| !s.is_empty());
        if let Some(managed_by) = managed_by {
            let change = [("managedBy".to_string(), vec![managed_by])];
            if let Err(e) = client.update_group(&group.dn, &change).await {
                diagnostics.push(Diagnostic::error(
                    "Failed to set managed_by on new group",
                    e.to_string(),
                ));
            } else {
                match client.get_group(&group.dn).await {
                    Ok(refreshed) => group = refreshed,
                    Err(e) => diagnostics.push(Diagnostic::error(
                        "Failed to read back new group",
                        e.to_string(),
                    )),
                }
            }
        }

        match state_from_group(&group) {
            Ok(state) => CreateResourceResponse {
                new_state: state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error("Failed to build state", e.to_string()));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(client) = self.client() else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let dn = match request.current_state.get_string(&AttributePath::new("dn")) {
            Ok(dn) => dn,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error("Missing dn in state", e.to_string())],
                };
            }
        };

        let result = client.get_group(&dn).await;
        read_response(&dn, request.current_state, result)
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let Some(client) = self.client() else {
            return UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let dn = match request.prior_state.get_string(&AttributePath::new("dn")) {
            Ok(dn) => dn,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![Diagnostic::error("Missing dn in state", e.to_string())],
                };
            }
        };

        let mut changes: Vec<(String, Vec<String>)> = vec![];
        for (config_name, ldap_name) in [("description", "description"), ("managed_by", "managedBy")]
        {
            let path = AttributePath::new(config_name);
            let prior = request.prior_state.get_string(&path).ok();
            let planned = request.planned_state.get_string(&path).ok();
            if planned != prior {
                let values = planned
                    .filter(|s| !s.is_empty())
                    .map(|s| vec![s])
                    .unwrap_or_default();
                changes.push((ldap_name.to_string(), values));
            }
        }
        let prior_type = request
            .prior_state
            .get_number(&AttributePath::new("group_type"))
            .ok();
        let planned_type = request
            .planned_state
            .get_number(&AttributePath::new("group_type"))
            .ok();
        if let Some(planned_type) = planned_type {
            if Some(planned_type) != prior_type {
                changes.push((
                    "groupType".to_string(),
                    vec![(planned_type as i64).to_string()],
                ));
            }
        }

        if let Err(e) = client.update_group(&dn, &changes).await {
            return UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error("Failed to update group", e.to_string())],
            };
        }

        match client.get_group(&dn).await {
            Ok(group) => match state_from_group(&group) {
                Ok(state) => UpdateResourceResponse {
                    new_state: state,
                    diagnostics: vec![],
                },
                Err(e) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
                },
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error(
                    "Failed to read group after update",
                    e.to_string(),
                )],
            },
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let Some(client) = self.client() else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let dn = match request.prior_state.get_string(&AttributePath::new("dn")) {
            Ok(dn) => dn,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error("Missing dn in state", e.to_string())],
                };
            }
        };

        delete_response(client.delete_group(&dn).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for GroupResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
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
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for GroupResource {
    /// Import by DN, e.g. terraform import ad_group.x "CN=eng,OU=Groups,DC=example,DC=com"
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("dn"), &request, &mut response);
        if let Some(imported) = response.imported_resources.first_mut() {
            if let Err(e) = imported
                .state
                .set_string(&AttributePath::new("id"), request.id.clone())
            {
                response
                    .diagnostics
                    .push(Diagnostic::error("Failed to set import ID", e.to_string()));
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_flags() {
        let schema = GroupResource::schema_static();
        for name in ["id", "dn", "name", "object_guid", "object_sid"] {
            let attr = schema.attribute(name).unwrap();
            assert!(attr.computed, "{} should be computed", name);
            assert!(!attr.required);
        }
        for name in ["cn", "ou"] {
            let attr = schema.attribute(name).unwrap();
            assert!(attr.required);
            assert!(attr.requires_replace, "{} is immutable", name);
        }
        assert!(schema.attribute("description").unwrap().optional);
        let group_type = schema.attribute("group_type").unwrap();
        assert!(group_type.optional && group_type.computed);
    }

    #[test]
    fn state_projection_round_trip() {
        let group = Group {
            dn: "CN=engineers,OU=Groups,DC=example,DC=com".into(),
            cn: "engineers".into(),
            name: "engineers".into(),
            sam_account_name: "engineers".into(),
            description: "Engineering team".into(),
            group_type: GROUP_TYPE_GLOBAL_SECURITY,
            managed_by: String::new(),
            members: vec![],
            member_of: vec![],
            object_guid: "01234567-89ab-cdef-0123-456789abcdef".into(),
            object_sid: "S-1-5-32-544".into(),
        };

        let state = state_from_group(&group).unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            group.dn
        );
        assert_eq!(
            state.get_string(&AttributePath::new("ou")).unwrap(),
            "OU=Groups,DC=example,DC=com"
        );
        assert_eq!(
            state.get_number(&AttributePath::new("group_type")).unwrap(),
            GROUP_TYPE_GLOBAL_SECURITY as f64
        );
        assert_eq!(
            state.get_string(&AttributePath::new("description")).unwrap(),
            "Engineering team"
        );
        // empty managed_by is null, not ""
        assert!(state
            .get_string(&AttributePath::new("managed_by"))
            .is_err());
    }

    #[test]
    fn read_drops_state_when_group_is_gone() {
        let response = read_response(
            "CN=g,DC=x",
            DynamicValue::empty_object(),
            Err(LdapClientError::NotFound("CN=g,DC=x".to_string())),
        );
        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn read_keeps_state_on_other_errors() {
        let response = read_response(
            "CN=g,DC=x",
            DynamicValue::empty_object(),
            Err(LdapClientError::Rejected {
                op: "search",
                dn: "CN=g,DC=x".to_string(),
                rc: 50,
                text: "insufficient access".to_string(),
            }),
        );
        assert!(response.new_state.is_some());
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[test]
    fn delete_treats_missing_group_as_success() {
        let response = delete_response(Err(LdapClientError::NotFound("CN=g,DC=x".to_string())));
        assert!(response.diagnostics.is_empty());

        let response = delete_response(Err(LdapClientError::Rejected {
            op: "delete",
            dn: "CN=g,DC=x".to_string(),
            rc: 53,
            text: "unwilling to perform".to_string(),
        }));
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[test]
    fn parent_dn_respects_escaped_commas() {
        assert_eq!(
            parent_dn("CN=eng,OU=Groups,DC=example,DC=com"),
            "OU=Groups,DC=example,DC=com"
        );
        assert_eq!(
            parent_dn("CN=a\\,b,OU=Groups,DC=example,DC=com"),
            "OU=Groups,DC=example,DC=com"
        );
        assert_eq!(parent_dn("DC=com"), "");
    }
}
