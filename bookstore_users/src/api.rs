use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Apiv2Schema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Unknown,
}

impl Default for Role {
    fn default() -> Self {
        Role::Unknown
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Apiv2Schema)]
/// Tag of a single authorizable action
pub enum Permission {
    ViewAuthor,
    PostAuthor,
    UpdateAuthor,
    DeleteAuthor,
    ViewBook,
    PostBook,
    UpdateBook,
    DeleteBook,
    ViewCategory,
    PostCategory,
    UpdateCategory,
    DeleteCategory,
    ViewUser,
    DeleteUser,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::ViewAuthor,
        Permission::PostAuthor,
        Permission::UpdateAuthor,
        Permission::DeleteAuthor,
        Permission::ViewBook,
        Permission::PostBook,
        Permission::UpdateBook,
        Permission::DeleteBook,
        Permission::ViewCategory,
        Permission::PostCategory,
        Permission::UpdateCategory,
        Permission::DeleteCategory,
        Permission::ViewUser,
        Permission::DeleteUser,
    ];
}

impl Role {
    /// Permissions granted on signup when the request does not list any
    pub fn default_permissions(self) -> Vec<Permission> {
        match self {
            Role::Admin => Permission::ALL.to_vec(),
            Role::User => vec![
                Permission::ViewAuthor,
                Permission::ViewBook,
                Permission::ViewCategory,
            ],
            Role::Unknown => vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Apiv2Schema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    /// Falls back to the role defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Apiv2Schema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Apiv2Schema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Apiv2Schema)]
/// User as seen from outside of the users service, without credentials
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}
