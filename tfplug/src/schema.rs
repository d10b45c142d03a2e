//! Schema types and builders for tfplug
//!
//! Schemas describe the attribute surface of providers, resources, and data
//! sources. The type system mirrors Terraform's.

use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

/// Schema is returned by providers/resources/data sources.
/// Version is used for state migration.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    /// Looks up a root attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub description: String,
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this attribute forces replacement of the resource
    pub requires_replace: bool,
}

/// Builder for attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                requires_replace: false,
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.attribute.description = description.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.attribute.requires_replace = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Builder for schemas
pub struct SchemaBuilder {
    version: i64,
    attributes: Vec<Attribute>,
    description: String,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            description: String::new(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            block: Block {
                attributes: self.attributes,
                description: self.description,
            },
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_builder_collects_attributes() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("test schema")
            .attribute(
                AttributeBuilder::new("dn", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cn", AttributeType::String)
                    .required()
                    .requires_replace()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 2);
        assert!(schema.attribute("dn").unwrap().computed);
        assert!(schema.attribute("cn").unwrap().requires_replace);
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn nested_list_of_objects_type() {
        let mut fields = HashMap::new();
        fields.insert("dn".to_string(), AttributeType::String);
        fields.insert("group_type".to_string(), AttributeType::Number);

        let attr = AttributeBuilder::new(
            "groups",
            AttributeType::List(Box::new(AttributeType::Object(fields))),
        )
        .computed()
        .build();

        match attr.r#type {
            AttributeType::List(inner) => {
                assert!(matches!(*inner, AttributeType::Object(_)));
            }
            _ => panic!("expected list type"),
        }
    }
}
