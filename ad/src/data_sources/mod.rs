pub mod group;
pub mod groups;
pub mod user;

pub use group::GroupDataSource;
pub use groups::GroupsDataSource;
pub use user::UserDataSource;
