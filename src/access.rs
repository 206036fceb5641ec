//! Who may do what inside a workspace.
//!
//! A caller's [`Role`] is `Owner` when they own the workspace, otherwise whatever their
//! membership row says. Roles map onto a fixed permission set, and the workspace's
//! [`Visibility`] decides whether anyone without a role may look at it.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    mods::{Visibility, Workspace},
    users::User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
    Delete,
    ManageCollaborators,
    ManageSettings,
}

impl Role {
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Owner => &[View, Edit, Delete, ManageCollaborators, ManageSettings],
            Role::Admin => &[View, Edit, ManageCollaborators],
            Role::Editor => &[View, Edit],
            Role::Viewer => &[View],
        }
    }

    pub fn can(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Roles that may be granted through membership.
    pub fn is_assignable(self) -> bool {
        self != Role::Owner
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role {other}")),
        }
    }
}

/// Parses a role a collaborator may be given (`admin`, `editor` or `viewer`).
pub fn parse_member_role(raw: &str) -> Option<Role> {
    raw.parse::<Role>().ok().filter(|role| role.is_assignable())
}

pub async fn membership_role<'e>(
    executor: impl SqliteExecutor<'e>,
    mod_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<Role>> {
    let row: Option<(Role,)> = sqlx::query_as("SELECT role FROM mod_users WHERE mod_id=? AND user_id=?")
        .bind(mod_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(role,)| role))
}

pub async fn role_of(db_pool: &SqlitePool, workspace: &Workspace, user_id: Uuid) -> AppResult<Option<Role>> {
    if workspace.owner_id == user_id {
        return Ok(Some(Role::Owner));
    }
    membership_role(db_pool, workspace.id, user_id).await
}

/// A caller's standing in one workspace.
#[derive(Debug, Clone, Copy)]
pub struct Access {
    pub user_id: Option<Uuid>,
    pub role: Option<Role>,
    pub visibility: Visibility,
}

impl Access {
    pub async fn resolve(db_pool: &SqlitePool, workspace: &Workspace, user: Option<&User>) -> AppResult<Self> {
        let role = match user {
            Some(user) => role_of(db_pool, workspace, user.id).await?,
            None => None,
        };
        Ok(Self {
            user_id: user.map(|user| user.id),
            role,
            visibility: workspace.visibility,
        })
    }

    pub fn can_view(&self) -> bool {
        self.visibility == Visibility::Public || self.role.is_some()
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.is_some_and(|role| role.can(permission))
    }

    pub fn ensure_view(&self) -> AppResult<()> {
        if self.can_view() { Ok(()) } else { Err(AppError::Forbidden) }
    }

    pub fn ensure(&self, permission: Permission) -> AppResult<()> {
        if self.can(permission) { Ok(()) } else { Err(AppError::Forbidden) }
    }
}

/// Party to a collaborator change: who they are and what role they hold (if any).
#[derive(Debug, Clone, Copy)]
pub struct Party {
    pub user_id: Uuid,
    pub role: Option<Role>,
}

/// Whether `actor` may remove `target` from the workspace.
/// The owner can never be removed, not even by themselves.
pub fn check_removal(actor: Party, target: Party) -> AppResult<()> {
    if target.role == Some(Role::Owner) {
        return Err(AppError::Forbidden);
    }
    if actor.user_id == target.user_id {
        return Ok(());
    }
    let Some(actor_role) = actor.role.filter(|role| role.can(Permission::ManageCollaborators)) else {
        return Err(AppError::Forbidden);
    };
    match target.role {
        Some(Role::Admin) if actor_role != Role::Owner => Err(AppError::Forbidden),
        _ => Ok(()),
    }
}

/// Whether `actor` may set `target`'s role to `new_role`.
pub fn check_role_change(actor: Party, target: Party, new_role: Role) -> AppResult<()> {
    let Some(actor_role) = actor.role.filter(|role| role.can(Permission::ManageCollaborators)) else {
        return Err(AppError::Forbidden);
    };
    if !new_role.is_assignable() || target.role == Some(Role::Owner) {
        return Err(AppError::Forbidden);
    }
    if actor_role != Role::Owner && (new_role == Role::Admin || target.role == Some(Role::Admin)) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Permission::*;

    const ALL: [Permission; 5] = [View, Edit, Delete, ManageCollaborators, ManageSettings];

    fn allowed(role: Role) -> Vec<Permission> {
        ALL.into_iter().filter(|p| role.can(*p)).collect()
    }

    #[test]
    fn permission_table() {
        assert_eq!(allowed(Role::Owner), ALL.to_vec());
        assert_eq!(allowed(Role::Admin), vec![View, Edit, ManageCollaborators]);
        assert_eq!(allowed(Role::Editor), vec![View, Edit]);
        assert_eq!(allowed(Role::Viewer), vec![View]);
    }

    fn access(role: Option<Role>, visibility: Visibility) -> Access {
        Access { user_id: None, role, visibility }
    }

    #[test]
    fn visibility_gate() {
        assert!(access(None, Visibility::Public).can_view());
        assert!(!access(None, Visibility::Private).can_view());
        assert!(!access(None, Visibility::Unlisted).can_view());
        assert!(access(Some(Role::Viewer), Visibility::Private).can_view());
        assert!(access(Some(Role::Owner), Visibility::Unlisted).can_view());
        assert!(!access(None, Visibility::Public).can(Edit));
    }

    #[test]
    fn member_roles_exclude_owner() {
        assert_eq!(parse_member_role("editor"), Some(Role::Editor));
        assert_eq!(parse_member_role("owner"), None);
        assert_eq!(parse_member_role("superuser"), None);
    }

    fn party(role: Option<Role>) -> Party {
        Party { user_id: Uuid::now_v7(), role }
    }

    #[test]
    fn anyone_may_leave() {
        let viewer = party(Some(Role::Viewer));
        assert!(check_removal(viewer, viewer).is_ok());

        let owner = party(Some(Role::Owner));
        assert!(matches!(check_removal(owner, owner), Err(AppError::Forbidden)));
    }

    #[test]
    fn removal_needs_manage_collaborators() {
        let target = party(Some(Role::Viewer));
        assert!(check_removal(party(Some(Role::Editor)), target).is_err());
        assert!(check_removal(party(None), target).is_err());
        assert!(check_removal(party(Some(Role::Admin)), target).is_ok());
        assert!(check_removal(party(Some(Role::Owner)), target).is_ok());
    }

    #[test]
    fn only_owner_removes_admins() {
        let admin = party(Some(Role::Admin));
        assert!(check_removal(party(Some(Role::Admin)), admin).is_err());
        assert!(check_removal(party(Some(Role::Owner)), admin).is_ok());
        assert!(check_removal(party(Some(Role::Admin)), party(Some(Role::Owner))).is_err());
    }

    #[test]
    fn only_owner_promotes_to_admin() {
        let editor = party(Some(Role::Editor));
        assert!(check_role_change(party(Some(Role::Admin)), editor, Role::Admin).is_err());
        assert!(check_role_change(party(Some(Role::Admin)), editor, Role::Viewer).is_ok());
        assert!(check_role_change(party(Some(Role::Owner)), editor, Role::Admin).is_ok());
        assert!(check_role_change(party(Some(Role::Admin)), party(Some(Role::Admin)), Role::Viewer).is_err());
        assert!(check_role_change(party(Some(Role::Editor)), party(Some(Role::Viewer)), Role::Editor).is_err());
        assert!(check_role_change(party(Some(Role::Owner)), editor, Role::Owner).is_err());
    }
}
