//! Session identity.
//!
//! The identity provider itself is an external collaborator; the core
//! only needs the current user's id. An absent id means no authenticated
//! actor, and every coordinator operation aborts on it.

use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The acting user's id, or `Unauthenticated`.
    pub fn current_user(&self) -> ServiceResult<Uuid> {
        self.user_id.ok_or(ServiceError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_has_no_actor() {
        assert!(matches!(
            Session::anonymous().current_user(),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[test]
    fn authenticated_session_returns_user() {
        let id = Uuid::new_v4();
        assert_eq!(Session::authenticated(id).current_user().unwrap(), id);
    }
}
