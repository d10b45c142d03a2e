//! User entity. Read-only; directory user management is out of scope, the
//! write path is a declared stub.

use ldap3::{Scope, SearchEntry};
use serde::{Deserialize, Serialize};

use super::attrs;
use super::client::LdapClient;
use super::error::{LdapClientError, Result};
use super::escape::escape_filter_value;

pub(crate) const USER_ATTRS: [&str; 10] = [
    "cn",
    "sAMAccountName",
    "userPrincipalName",
    "displayName",
    "givenName",
    "sn",
    "mail",
    "memberOf",
    "objectGUID",
    "objectSid",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub dn: String,
    pub cn: String,
    pub sam_account_name: String,
    pub user_principal_name: String,
    pub display_name: String,
    pub given_name: String,
    pub surname: String,
    pub mail: String,
    pub member_of: Vec<String>,
    pub object_guid: String,
    pub object_sid: String,
}

impl User {
    pub(crate) fn from_entry(entry: SearchEntry) -> Self {
        let object_guid = attrs::binary(&entry, "objectGUID")
            .and_then(|b| attrs::decode_guid(&b))
            .unwrap_or_default();
        let object_sid = attrs::binary(&entry, "objectSid")
            .and_then(|b| attrs::decode_sid(&b))
            .unwrap_or_default();
        User {
            cn: attrs::single(&entry, "cn"),
            sam_account_name: attrs::single(&entry, "sAMAccountName"),
            user_principal_name: attrs::single(&entry, "userPrincipalName"),
            display_name: attrs::single(&entry, "displayName"),
            given_name: attrs::single(&entry, "givenName"),
            surname: attrs::single(&entry, "sn"),
            mail: attrs::single(&entry, "mail"),
            member_of: attrs::multi(&entry, "memberOf"),
            object_guid,
            object_sid,
            dn: entry.dn,
        }
    }
}

impl LdapClient {
    pub async fn get_user(&self, dn: &str) -> Result<User> {
        let entries = self
            .search(dn, Scope::Base, "(objectClass=user)", &USER_ATTRS)
            .await?;
        match entries.into_iter().next() {
            Some(entry) => Ok(User::from_entry(entry)),
            None => Err(LdapClientError::NotFound(dn.to_string())),
        }
    }

    pub async fn get_user_by_sam(&self, sam: &str) -> Result<User> {
        let filter = format!(
            "(&(objectClass=user)(sAMAccountName={}))",
            escape_filter_value(sam)
        );
        let base = self.base_dn().to_string();
        let mut entries = self
            .search(&base, Scope::Subtree, &filter, &USER_ATTRS)
            .await?;
        match entries.len() {
            0 => Err(LdapClientError::NotFound(format!(
                "user with sAMAccountName '{}'",
                sam
            ))),
            1 => Ok(User::from_entry(entries.remove(0))),
            count => Err(LdapClientError::AmbiguousLookup { filter, count }),
        }
    }

    /// User provisioning is not implemented; callers get a typed error
    /// instead of a silent no-op.
    pub async fn create_user(&self, _user: &User) -> Result<User> {
        Err(LdapClientError::NotSupported(
            "user creation is not implemented".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn from_entry_maps_naming_attributes() {
        let mut attrs: HashMap<String, Vec<String>> = HashMap::new();
        attrs.insert("cn".into(), vec!["Alice Example".into()]);
        attrs.insert("sAMAccountName".into(), vec!["alice".into()]);
        attrs.insert("userPrincipalName".into(), vec!["alice@example.com".into()]);
        attrs.insert("displayName".into(), vec!["Alice Example".into()]);
        attrs.insert("givenName".into(), vec!["Alice".into()]);
        attrs.insert("sn".into(), vec!["Example".into()]);
        attrs.insert("mail".into(), vec!["alice@example.com".into()]);
        attrs.insert(
            "memberOf".into(),
            vec!["CN=engineers,OU=Groups,DC=example,DC=com".into()],
        );
        let entry = SearchEntry {
            dn: "CN=Alice Example,OU=Users,DC=example,DC=com".into(),
            attrs,
            bin_attrs: HashMap::new(),
        };

        let user = User::from_entry(entry);
        assert_eq!(user.dn, "CN=Alice Example,OU=Users,DC=example,DC=com");
        assert_eq!(user.sam_account_name, "alice");
        assert_eq!(user.user_principal_name, "alice@example.com");
        assert_eq!(user.given_name, "Alice");
        assert_eq!(user.surname, "Example");
        assert_eq!(user.member_of.len(), 1);
    }
}
