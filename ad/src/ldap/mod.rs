//! LDAP client for Active Directory group and user management

mod attrs;
pub mod client;
pub mod error;
pub mod escape;
pub mod group;
pub mod user;

pub use client::{LdapClient, LdapConfig};
pub use error::LdapClientError;
pub use group::{Group, NewGroup, GROUP_TYPE_GLOBAL_SECURITY};
pub use user::User;
