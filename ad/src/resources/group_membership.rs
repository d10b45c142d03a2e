//! ad_group_membership resource - one (group, member) edge
//!
//! The member DN may point at a user, computer or another group. Identity is
//! the pair "<group DN>|<member DN>", which is also the import format.

use async_trait::async_trait;
use std::sync::Arc;

use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::ldap::{Group, LdapClient, LdapClientError};
use crate::provider_data::AdProviderData;

pub struct GroupMembershipResource {
    provider_data: Option<AdProviderData>,
}

impl Default for GroupMembershipResource {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupMembershipResource {
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
            .description("Membership of one object in an Active Directory group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identity in the form <group DN>|<member DN>")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_dn", AttributeType::String)
                    .description("DN of the group")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("member_dn", AttributeType::String)
                    .description("DN of the member object")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .build()
    }
}

fn membership_id(group_dn: &str, member_dn: &str) -> String {
    format!("{}|{}", group_dn, member_dn)
}

/// Splits an import identity into (group DN, member DN). DNs never contain
/// '|', so exactly one separator must be present.
fn parse_membership_id(id: &str) -> Option<(String, String)> {
    let (group_dn, member_dn) = id.split_once('|')?;
    if group_dn.is_empty() || member_dn.is_empty() || member_dn.contains('|') {
        return None;
    }
    Some((group_dn.to_string(), member_dn.to_string()))
}

fn membership_state(group_dn: &str, member_dn: &str) -> tfplug::error::Result<DynamicValue> {
    let mut state = DynamicValue::empty_object();
    state.set_string(&AttributePath::new("id"), membership_id(group_dn, member_dn))?;
    state.set_string(&AttributePath::new("group_dn"), group_dn.to_string())?;
    state.set_string(&AttributePath::new("member_dn"), member_dn.to_string())?;
    Ok(state)
}

/// Refresh outcome for one membership edge. State is dropped when the group
/// itself is gone or the member no longer appears in its member list.
fn read_response(
    group_dn: &str,
    member_dn: &str,
    current_state: DynamicValue,
    result: Result<Group, LdapClientError>,
) -> ReadResourceResponse {
    let group = match result {
        Ok(group) => group,
        Err(e) if e.is_not_found() => {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            };
        }
        Err(e) => {
            return ReadResourceResponse {
                new_state: Some(current_state),
                diagnostics: vec![Diagnostic::error("Failed to read group", e.to_string())],
            };
        }
    };

    // AD returns member DNs with its own canonical casing
    let present = group
        .members
        .iter()
        .any(|m| m.eq_ignore_ascii_case(member_dn));
    if !present {
        return ReadResourceResponse {
            new_state: None,
            diagnostics: vec![],
        };
    }

    match membership_state(group_dn, member_dn) {
        Ok(state) => ReadResourceResponse {
            new_state: Some(state),
            diagnostics: vec![],
        },
        Err(e) => ReadResourceResponse {
            new_state: Some(current_state),
            diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
        },
    }
}

fn delete_response(result: Result<(), LdapClientError>) -> DeleteResourceResponse {
    match result {
        Ok(()) => DeleteResourceResponse {
            diagnostics: vec![],
        },
        // group gone or member already removed both count as success
        Err(e) if e.is_benign_absent() => DeleteResourceResponse {
            diagnostics: vec![],
        },
        Err(e) => DeleteResourceResponse {
            diagnostics: vec![Diagnostic::error("Failed to remove member", e.to_string())],
        },
    }
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "The LDAP client is not available; configure the provider first",
    )
}

fn dns_from(value: &DynamicValue) -> Option<(String, String)> {
    let group_dn = value.get_string(&AttributePath::new("group_dn")).ok()?;
    let member_dn = value.get_string(&AttributePath::new("member_dn")).ok()?;
    Some((group_dn, member_dn))
}

#[async_trait]
impl Resource for GroupMembershipResource {
    fn type_name(&self) -> &str {
        "ad_group_membership"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "ad_group_membership".to_string(),
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
        let Some(client) = self.client() else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let Some((group_dn, member_dn)) = dns_from(&request.config) else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error(
                    "Invalid configuration",
                    "group_dn and member_dn are required",
                )],
            };
        };

        // verify the group exists before mutating, the error is clearer than
        // a raw modify rejection
        if let Err(e) = client.get_group(&group_dn).await {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error(
                    format!("Cannot add member to group {}", group_dn),
                    e.to_string(),
                )],
            };
        }

        if let Err(e) = client.add_member(&group_dn, &member_dn).await {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error("Failed to add member", e.to_string())],
            };
        }
        tracing::info!(group = %group_dn, member = %member_dn, "added group member");

        match membership_state(&group_dn, &member_dn) {
            Ok(state) => CreateResourceResponse {
                new_state: state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(client) = self.client() else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let Some((group_dn, member_dn)) = dns_from(&request.current_state) else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error(
                    "Invalid state",
                    "group_dn and member_dn missing from state",
                )],
            };
        };

        let result = client.get_group(&group_dn).await;
        read_response(&group_dn, &member_dn, request.current_state, result)
    }

    /// Both attributes force replacement, so update is never a semantic change
    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
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

        let Some((group_dn, member_dn)) = dns_from(&request.prior_state) else {
            return DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    "Invalid state",
                    "group_dn and member_dn missing from state",
                )],
            };
        };

        delete_response(client.remove_member(&group_dn, &member_dn).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for GroupMembershipResource {
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
impl ResourceWithImportState for GroupMembershipResource {
    /// Import as "CN=group,...|CN=member,..."
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let Some((group_dn, member_dn)) = parse_membership_id(&request.id) else {
            return ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Invalid import ID",
                    format!(
                        "Expected \"<group DN>|<member DN>\", got \"{}\"",
                        request.id
                    ),
                )],
            };
        };

        match membership_state(&group_dn, &member_dn) {
            Ok(state) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: request.type_name.clone(),
                    state,
                }],
                diagnostics: vec![],
            },
            Err(e) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_id_format() {
        assert_eq!(
            membership_id("CN=g,DC=x", "CN=m,DC=x"),
            "CN=g,DC=x|CN=m,DC=x"
        );
    }

    #[test]
    fn parse_valid_id() {
        let id = "CN=engineers,OU=Groups,DC=example,DC=com|CN=alice,OU=Users,DC=example,DC=com";
        let (group_dn, member_dn) = parse_membership_id(id).unwrap();
        assert_eq!(group_dn, "CN=engineers,OU=Groups,DC=example,DC=com");
        assert_eq!(member_dn, "CN=alice,OU=Users,DC=example,DC=com");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(parse_membership_id("no-separator").is_none());
        assert!(parse_membership_id("|CN=m,DC=x").is_none());
        assert!(parse_membership_id("CN=g,DC=x|").is_none());
        assert!(parse_membership_id("a|b|c").is_none());
    }

    fn group_with_members(members: &[&str]) -> Group {
        Group {
            dn: "CN=engineers,OU=Groups,DC=example,DC=com".to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn read_drops_state_when_group_is_gone() {
        let response = read_response(
            "CN=g,DC=x",
            "CN=m,DC=x",
            DynamicValue::empty_object(),
            Err(LdapClientError::NotFound("CN=g,DC=x".to_string())),
        );
        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn read_drops_state_when_member_is_absent() {
        let group = group_with_members(&["CN=someone-else,OU=Users,DC=example,DC=com"]);
        let response = read_response(
            "CN=g,DC=x",
            "CN=m,DC=x",
            DynamicValue::empty_object(),
            Ok(group),
        );
        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn read_matches_members_case_insensitively() {
        let group = group_with_members(&["cn=M,dc=X"]);
        let response = read_response(
            "CN=g,DC=x",
            "CN=m,DC=x",
            DynamicValue::empty_object(),
            Ok(group),
        );
        let state = response.new_state.unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "CN=g,DC=x|CN=m,DC=x"
        );
    }

    #[test]
    fn read_keeps_state_on_other_errors() {
        let response = read_response(
            "CN=g,DC=x",
            "CN=m,DC=x",
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
    fn delete_treats_absent_membership_as_success() {
        let response = delete_response(Err(LdapClientError::NotFound("CN=g,DC=x".to_string())));
        assert!(response.diagnostics.is_empty());

        // noSuchAttribute from removing an already-removed member value
        let response = delete_response(Err(LdapClientError::Rejected {
            op: "modify",
            dn: "CN=g,DC=x".to_string(),
            rc: 16,
            text: "no such attribute".to_string(),
        }));
        assert!(response.diagnostics.is_empty());

        let response = delete_response(Err(LdapClientError::Rejected {
            op: "modify",
            dn: "CN=g,DC=x".to_string(),
            rc: 53,
            text: "unwilling to perform".to_string(),
        }));
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[test]
    fn membership_state_attributes() {
        let state = membership_state("CN=g,DC=x", "CN=m,DC=x").unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "CN=g,DC=x|CN=m,DC=x"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("group_dn")).unwrap(),
            "CN=g,DC=x"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("member_dn")).unwrap(),
            "CN=m,DC=x"
        );
    }
}
