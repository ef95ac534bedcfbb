use serde::{Deserialize, Serialize};

use bookstore_resources::resource_store::{require_non_empty, Resource, StoreError};

use crate::api::{Permission, Role, UserId, UserView};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// User as persisted by the users store. Only ever leaves the service as a [`UserView`]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// argon2 PHC string
    pub password_hash: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Resource for UserRecord {
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "User";
    const UNIQUE_FIELDS: &'static [&'static str] = &["username"];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: UserId) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        require_non_empty("username", &self.username)?;
        require_non_empty("passwordHash", &self.password_hash)
    }
}

impl From<UserRecord> for UserView {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            role: record.role,
            permissions: record.permissions,
        }
    }
}
