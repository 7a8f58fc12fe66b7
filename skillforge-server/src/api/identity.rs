//! Caller identity extraction
//!
//! Identity arrives as trusted headers set by the authenticating front
//! door (`x-learner-id`, `x-learner-role`). This module only parses and
//! enforces them; it never authenticates.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use skillforge_common::{Error, Role};
use uuid::Uuid;

use super::ApiError;

pub use skillforge_common::types::{LEARNER_ID_HEADER, LEARNER_ROLE_HEADER};

/// Authenticated caller, extracted from trusted identity headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub learner_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Rejects non-admin callers with a 403-class error
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden("admin role required".to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let learner_id = parts
            .headers
            .get(LEARNER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(Error::Unauthorized)?;

        let role = parts
            .headers
            .get(LEARNER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .ok_or(Error::Unauthorized)?;

        Ok(Identity { learner_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(id: Option<&str>, role: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/test");
        if let Some(id) = id {
            builder = builder.header(LEARNER_ID_HEADER, id);
        }
        if let Some(role) = role {
            builder = builder.header(LEARNER_ROLE_HEADER, role);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn extracts_valid_identity() {
        let id = Uuid::new_v4();
        let mut parts = parts_with(Some(&id.to_string()), Some("STUDENT"));
        let identity = Identity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.learner_id, id);
        assert_eq!(identity.role, Role::Student);
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn missing_headers_are_unauthorized() {
        let mut parts = parts_with(None, None);
        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError(Error::Unauthorized))));
    }

    #[tokio::test]
    async fn malformed_id_is_unauthorized() {
        let mut parts = parts_with(Some("not-a-uuid"), Some("STUDENT"));
        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError(Error::Unauthorized))));
    }

    #[tokio::test]
    async fn unknown_role_is_unauthorized() {
        let id = Uuid::new_v4().to_string();
        let mut parts = parts_with(Some(&id), Some("WIZARD"));
        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError(Error::Unauthorized))));
    }

    #[tokio::test]
    async fn require_admin_gates_students() {
        let student = Identity {
            learner_id: Uuid::new_v4(),
            role: Role::Student,
        };
        let admin = Identity {
            learner_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(matches!(
            student.require_admin(),
            Err(Error::Forbidden(_))
        ));
        assert!(admin.require_admin().is_ok());
    }
}
