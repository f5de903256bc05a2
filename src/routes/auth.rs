use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::services::store::UserProfile;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_PICTURE_HEADER: &str = "x-user-picture";

/// Caller identity as forwarded by the identity provider in front of the service.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl CurrentUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            subject: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let id = header(USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser {
            id,
            email: header(USER_EMAIL_HEADER),
            name: header(USER_NAME_HEADER),
            picture: header(USER_PICTURE_HEADER),
        })
    }
}
