//! ad_user data source - declared surface only, reads are not implemented

use async_trait::async_trait;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use crate::provider_data::AdProviderData;

pub struct UserDataSource {
    provider_data: Option<AdProviderData>,
}

impl Default for UserDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDataSource {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(1)
            .description("Look up an Active Directory user (not yet implemented)")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dn", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sam_account_name", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_principal_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("given_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("surname", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mail", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "member_of",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
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

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &str {
        "ad_user"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "ad_user".to_string(),
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

    async fn read(
        &self,
        _ctx: Context,
        _request: ReadDataSourceRequest,
    ) -> ReadDataSourceResponse {
        ReadDataSourceResponse {
            state: DynamicValue::null(),
            diagnostics: vec![Diagnostic::error(
                "Not Implemented",
                "The ad_user data source is declared but not implemented yet",
            )],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserDataSource {
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

    #[tokio::test]
    async fn read_reports_not_implemented() {
        let ds = UserDataSource::new();
        let response = ds
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ad_user".to_string(),
                    config: DynamicValue::empty_object(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Not Implemented");
    }
}
