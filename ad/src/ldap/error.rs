use thiserror::Error;

/// LDAP result code for noSuchObject
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code for noSuchAttribute, returned when deleting a value that
/// is not present (e.g. removing a member that was already removed)
pub const RC_NO_SUCH_ATTRIBUTE: u32 = 16;

#[derive(Debug, Error)]
pub enum LdapClientError {
    #[error("Invalid LDAP server URL: {0}")]
    InvalidServerUrl(String),

    #[error("Failed to connect to LDAP server: {0}")]
    Dial(#[source] ldap3::LdapError),

    #[error("LDAP bind failed (result code {rc}): {text}")]
    Bind { rc: u32, text: String },

    #[error("Not connected to LDAP server")]
    NotConnected,

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Lookup matched {count} entries for {filter}, expected exactly one")]
    AmbiguousLookup { filter: String, count: usize },

    #[error("LDAP {op} rejected for {dn} (result code {rc}): {text}")]
    Rejected {
        op: &'static str,
        dn: String,
        rc: u32,
        text: String,
    },

    #[error("LDAP {op} failed for {dn}: {source}")]
    Operation {
        op: &'static str,
        dn: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl LdapClientError {
    /// Classifies an ldap3 error for an operation against a specific DN.
    /// noSuchObject becomes a typed NotFound so callers can distinguish
    /// "gone" from real failures without matching on message text.
    pub fn from_op(op: &'static str, dn: &str, err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } if result.rc == RC_NO_SUCH_OBJECT => {
                LdapClientError::NotFound(dn.to_string())
            }
            ldap3::LdapError::LdapResult { result } => LdapClientError::Rejected {
                op,
                dn: dn.to_string(),
                rc: result.rc,
                text: result.text,
            },
            other => LdapClientError::Operation {
                op,
                dn: dn.to_string(),
                source: other,
            },
        }
    }

    /// True when the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, LdapClientError::NotFound(_))
    }

    /// True when a value-removal failed only because the value was already
    /// absent. Covers both a missing object and a missing attribute value.
    pub fn is_benign_absent(&self) -> bool {
        match self {
            LdapClientError::NotFound(_) => true,
            LdapClientError::Rejected { rc, .. } => *rc == RC_NO_SUCH_ATTRIBUTE,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LdapClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ldap3::LdapResult;

    fn server_result(rc: u32) -> ldap3::LdapError {
        ldap3::LdapError::LdapResult {
            result: LdapResult {
                rc,
                matched: String::new(),
                text: "server says no".to_string(),
                refs: vec![],
                ctrls: vec![],
            },
        }
    }

    #[test]
    fn no_such_object_becomes_not_found() {
        let err = LdapClientError::from_op("delete", "CN=g,DC=x", server_result(RC_NO_SUCH_OBJECT));
        assert!(err.is_not_found());
        assert!(err.is_benign_absent());
    }

    #[test]
    fn no_such_attribute_is_benign_for_value_removal() {
        let err = LdapClientError::from_op("modify", "CN=g,DC=x", server_result(RC_NO_SUCH_ATTRIBUTE));
        assert!(!err.is_not_found());
        assert!(err.is_benign_absent());
    }

    #[test]
    fn other_result_codes_are_rejections() {
        let err = LdapClientError::from_op("add", "CN=g,DC=x", server_result(50));
        assert!(matches!(err, LdapClientError::Rejected { rc: 50, .. }));
        assert!(!err.is_not_found());
        assert!(!err.is_benign_absent());
    }
}
