pub mod group;
pub mod group_membership;

pub use group::GroupResource;
pub use group_membership::GroupMembershipResource;
