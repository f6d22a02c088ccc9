use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Role, User},
};

/// The authenticated actor making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The write filter a conditional store update must honor for this principal
    pub fn write_scope(&self) -> WriteScope {
        if self.is_admin() {
            WriteScope::Any
        } else {
            WriteScope::OwnedBy(self.id)
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// Ownership filter applied inside a single conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// Admin: any document matches
    Any,
    /// Only documents whose owner field equals this id match
    OwnedBy(Uuid),
}

impl WriteScope {
    pub fn permits(&self, owner_id: Uuid) -> bool {
        match self {
            WriteScope::Any => true,
            WriteScope::OwnedBy(id) => *id == owner_id,
        }
    }

    /// Owner id for SQL binding; `None` means unrestricted
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            WriteScope::Any => None,
            WriteScope::OwnedBy(id) => Some(*id),
        }
    }
}

/// True iff the principal is an admin or owns the resource
pub fn can_mutate(principal: &Principal, owner_id: Uuid) -> bool {
    principal.is_admin() || principal.id == owner_id
}

pub fn ensure_can_mutate(principal: &Principal, owner_id: Uuid, what: &str) -> AppResult<()> {
    if can_mutate(principal, owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the owner or an admin may modify this {}",
            what
        )))
    }
}

pub fn ensure_admin(principal: &Principal) -> AppResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

/// Classifies a conditional write that matched nothing.
///
/// `current` is a fresh read of the target (no write happens here): absent means the
/// document does not exist, present means the scope filter rejected the principal.
pub fn classify_write_miss<T>(current: Option<T>, what: &str, id: Uuid) -> AppError {
    match current {
        None => AppError::not_found(what, id),
        Some(_) => AppError::Forbidden(format!(
            "Only the owner or an admin may modify this {}",
            what.to_lowercase()
        )),
    }
}
