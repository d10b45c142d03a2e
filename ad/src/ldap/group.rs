//! Group entity and its directory operations.

use std::collections::HashSet;

use ldap3::{Mod, Scope, SearchEntry};
use serde::{Deserialize, Serialize};

use super::attrs;
use super::client::LdapClient;
use super::error::{LdapClientError, Result};
use super::escape::{escape_dn_value, escape_filter_value, split_rdn};

/// Default groupType: global scope, security-enabled
pub const GROUP_TYPE_GLOBAL_SECURITY: i64 = -2147483646;

pub(crate) const GROUP_ATTRS: [&str; 10] = [
    "cn",
    "name",
    "sAMAccountName",
    "description",
    "groupType",
    "managedBy",
    "member",
    "memberOf",
    "objectGUID",
    "objectSid",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub dn: String,
    pub cn: String,
    pub name: String,
    pub sam_account_name: String,
    pub description: String,
    pub group_type: i64,
    pub managed_by: String,
    pub members: Vec<String>,
    pub member_of: Vec<String>,
    pub object_guid: String,
    pub object_sid: String,
}

impl Group {
    pub(crate) fn from_entry(entry: SearchEntry) -> Self {
        let group_type = attrs::single(&entry, "groupType").parse().unwrap_or(0);
        let object_guid = attrs::binary(&entry, "objectGUID")
            .and_then(|b| attrs::decode_guid(&b))
            .unwrap_or_default();
        let object_sid = attrs::binary(&entry, "objectSid")
            .and_then(|b| attrs::decode_sid(&b))
            .unwrap_or_default();
        Group {
            cn: attrs::single(&entry, "cn"),
            name: attrs::single(&entry, "name"),
            sam_account_name: attrs::single(&entry, "sAMAccountName"),
            description: attrs::single(&entry, "description"),
            group_type,
            managed_by: attrs::single(&entry, "managedBy"),
            members: attrs::multi(&entry, "member"),
            member_of: attrs::multi(&entry, "memberOf"),
            object_guid,
            object_sid,
            dn: entry.dn,
        }
    }
}

/// Attributes for a new group. The DN is derived as CN=<cn>,<ou> with the CN
/// escaped; the OU is taken verbatim as it is already a DN fragment.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub cn: String,
    pub ou: String,
    pub sam_account_name: Option<String>,
    pub description: Option<String>,
    pub group_type: i64,
}

impl LdapClient {
    pub async fn get_group(&self, dn: &str) -> Result<Group> {
        let entries = self
            .search(dn, Scope::Base, "(objectClass=group)", &GROUP_ATTRS)
            .await?;
        match entries.into_iter().next() {
            Some(entry) => Ok(Group::from_entry(entry)),
            None => Err(LdapClientError::NotFound(dn.to_string())),
        }
    }

    /// Subtree lookup by common name. More than one match is an error rather
    /// than a silent first-entry pick.
    pub async fn get_group_by_cn(&self, cn: &str) -> Result<Group> {
        let filter = format!("(&(objectClass=group)(cn={}))", escape_filter_value(cn));
        let base = self.base_dn().to_string();
        let mut entries = self
            .search(&base, Scope::Subtree, &filter, &GROUP_ATTRS)
            .await?;
        match entries.len() {
            0 => Err(LdapClientError::NotFound(format!("group with cn '{}'", cn))),
            1 => Ok(Group::from_entry(entries.remove(0))),
            count => Err(LdapClientError::AmbiguousLookup { filter, count }),
        }
    }

    pub async fn list_groups(&self, filter: Option<&str>) -> Result<Vec<Group>> {
        let filter = filter.unwrap_or("(objectClass=group)");
        let base = self.base_dn().to_string();
        let entries = self
            .search(&base, Scope::Subtree, filter, &GROUP_ATTRS)
            .await?;
        Ok(entries.into_iter().map(Group::from_entry).collect())
    }

    /// Creates the group and reads it back so computed attributes (GUID, SID)
    /// are populated.
    pub async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        let dn = format!("CN={},{}", escape_dn_value(&group.cn), group.ou);
        let sam = group
            .sam_account_name
            .clone()
            .unwrap_or_else(|| group.cn.clone());

        let mut add_attrs: Vec<(String, HashSet<String>)> = vec![
            (
                "objectClass".to_string(),
                HashSet::from(["top".to_string(), "group".to_string()]),
            ),
            ("cn".to_string(), HashSet::from([group.cn.clone()])),
            ("name".to_string(), HashSet::from([group.cn.clone()])),
            ("sAMAccountName".to_string(), HashSet::from([sam])),
            (
                "groupType".to_string(),
                HashSet::from([group.group_type.to_string()]),
            ),
        ];
        if let Some(description) = &group.description {
            if !description.is_empty() {
                add_attrs.push((
                    "description".to_string(),
                    HashSet::from([description.clone()]),
                ));
            }
        }

        self.add(&dn, add_attrs).await?;
        self.get_group(&dn).await
    }

    /// Replaces attribute values; an empty value list deletes the attribute
    pub async fn update_group(&self, dn: &str, changes: &[(String, Vec<String>)]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mods: Vec<Mod<String>> = changes
            .iter()
            .map(|(attr, values)| {
                if values.is_empty() {
                    Mod::Delete(attr.clone(), HashSet::new())
                } else {
                    Mod::Replace(attr.clone(), values.iter().cloned().collect())
                }
            })
            .collect();
        self.modify(dn, mods).await
    }

    pub async fn delete_group(&self, dn: &str) -> Result<()> {
        self.delete(dn).await
    }

    /// Moves the group to a different OU, keeping its RDN. Returns the new DN.
    /// The split honors escaped commas so a CN like "a,b" keeps its full RDN.
    pub async fn move_group(&self, dn: &str, new_ou: &str) -> Result<String> {
        let (rdn, _) =
            split_rdn(dn).ok_or_else(|| LdapClientError::InvalidDn(dn.to_string()))?;
        self.rename(dn, rdn, Some(new_ou)).await?;
        Ok(format!("{},{}", rdn, new_ou))
    }

    pub async fn add_member(&self, group_dn: &str, member_dn: &str) -> Result<()> {
        let mods = vec![Mod::Add(
            "member".to_string(),
            HashSet::from([member_dn.to_string()]),
        )];
        self.modify(group_dn, mods).await
    }

    pub async fn remove_member(&self, group_dn: &str, member_dn: &str) -> Result<()> {
        let mods = vec![Mod::Delete(
            "member".to_string(),
            HashSet::from([member_dn.to_string()]),
        )];
        self.modify(group_dn, mods).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_entry() -> SearchEntry {
        let mut attrs: HashMap<String, Vec<String>> = HashMap::new();
        attrs.insert("cn".into(), vec!["engineers".into()]);
        attrs.insert("name".into(), vec!["engineers".into()]);
        attrs.insert("sAMAccountName".into(), vec!["engineers".into()]);
        attrs.insert("description".into(), vec!["Engineering team".into()]);
        attrs.insert("groupType".into(), vec!["-2147483646".into()]);
        attrs.insert(
            "member".into(),
            vec![
                "CN=alice,OU=Users,DC=example,DC=com".into(),
                "CN=bob,OU=Users,DC=example,DC=com".into(),
            ],
        );
        let mut bin_attrs: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
        bin_attrs.insert(
            "objectGUID".into(),
            vec![vec![
                0x67, 0x45, 0x23, 0x01, 0xAB, 0x89, 0xEF, 0xCD, 0x01, 0x23, 0x45, 0x67, 0x89,
                0xAB, 0xCD, 0xEF,
            ]],
        );
        bin_attrs.insert(
            "objectSid".into(),
            vec![vec![1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 0x02, 0, 0]],
        );
        SearchEntry {
            dn: "CN=engineers,OU=Groups,DC=example,DC=com".into(),
            attrs,
            bin_attrs,
        }
    }

    #[test]
    fn from_entry_full_projection() {
        let group = Group::from_entry(sample_entry());
        assert_eq!(group.dn, "CN=engineers,OU=Groups,DC=example,DC=com");
        assert_eq!(group.cn, "engineers");
        assert_eq!(group.sam_account_name, "engineers");
        assert_eq!(group.description, "Engineering team");
        assert_eq!(group.group_type, GROUP_TYPE_GLOBAL_SECURITY);
        assert_eq!(group.members.len(), 2);
        assert!(group.member_of.is_empty());
        assert_eq!(group.object_guid, "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(group.object_sid, "S-1-5-32-544");
    }

    #[test]
    fn from_entry_tolerates_sparse_entries() {
        let entry = SearchEntry {
            dn: "CN=empty,DC=example,DC=com".into(),
            attrs: HashMap::new(),
            bin_attrs: HashMap::new(),
        };
        let group = Group::from_entry(entry);
        assert_eq!(group.dn, "CN=empty,DC=example,DC=com");
        assert_eq!(group.cn, "");
        assert_eq!(group.group_type, 0);
        assert!(group.members.is_empty());
        assert_eq!(group.object_guid, "");
        assert_eq!(group.object_sid, "");
    }
}
