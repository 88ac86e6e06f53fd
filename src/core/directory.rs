//! Users and roles - the admin directory.
//!
//! Roles are named permission sets; user profiles point at one role by id. The
//! reference is resolved at read time, and a profile whose role was deleted
//! resolves to no role at all. Every write publishes a [`DirectoryChange`] so
//! that [`LiveDirectory`] views stay current without re-reading the tables.

use crate::{
    core::{
        access::Permission,
        live::{ChangeHub, Subscription},
    },
    entities::{Role, RoleColumn, User, UserColumn, role, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, info, instrument};

/// A role with its permissions decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Role id
    pub id: String,
    /// Display name
    pub name: String,
    /// Granted permissions
    pub permissions: Vec<Permission>,
}

impl TryFrom<role::Model> for RoleRecord {
    type Error = Error;

    fn try_from(model: role::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            name: model.name,
            permissions: serde_json::from_value(model.permissions)?,
        })
    }
}

/// A stored user row, role not yet resolved
pub type UserRecord = crate::entities::UserModel;

/// A user with the role reference resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity provider's user id
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Stored role reference
    pub role_id: Option<String>,
    /// `None` when the user has no role or the role no longer exists
    pub role: Option<RoleRecord>,
}

impl UserProfile {
    /// Attaches the user's role from `roles`, if it exists.
    #[must_use]
    pub fn resolve(user: UserRecord, roles: &HashMap<&str, &RoleRecord>) -> Self {
        let role = user
            .role_id
            .as_deref()
            .and_then(|id| roles.get(id))
            .map(|r| (*r).clone());
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role_id: user.role_id,
            role,
        }
    }
}

/// One write to the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryChange {
    RoleSaved(RoleRecord),
    RoleDeleted(String),
    UserSaved(UserRecord),
    UserDeleted(String),
}

/// Hub the directory publishes its changes on
pub type DirectoryHub = ChangeHub<DirectoryChange>;

/// Role form payload; a missing id creates a new role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleInput {
    /// Existing role to overwrite
    #[serde(default)]
    pub id: Option<String>,
    /// Display name, required
    pub name: String,
    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// User form payload; `id` is the identity provider's user id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInput {
    /// Identity provider's user id
    pub id: String,
    /// Display name, required
    pub name: String,
    /// Contact email, required
    pub email: String,
    /// Role to assign; must exist
    #[serde(default)]
    pub role_id: Option<String>,
}

/// All roles, ordered by name.
pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<RoleRecord>> {
    Role::find()
        .order_by_asc(RoleColumn::Name)
        .all(db)
        .await?
        .into_iter()
        .map(RoleRecord::try_from)
        .collect()
}

/// All user rows, ordered by name.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<UserRecord>> {
    User::find()
        .order_by_asc(UserColumn::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates or replaces a role and announces the change.
#[instrument(skip(db, hub, input))]
pub async fn save_role(
    db: &DatabaseConnection,
    hub: &DirectoryHub,
    input: RoleInput,
) -> Result<RoleRecord> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("role name must not be empty"));
    }

    let mut permissions = input.permissions;
    permissions.sort();
    permissions.dedup();

    let record = RoleRecord {
        id: input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: name.to_string(),
        permissions,
    };

    let model = role::ActiveModel {
        id: Set(record.id.clone()),
        name: Set(record.name.clone()),
        permissions: Set(serde_json::to_value(&record.permissions)?),
    };
    let _ordered = hub.lock_writes().await;
    Role::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(RoleColumn::Id)
                .update_columns([RoleColumn::Name, RoleColumn::Permissions])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!(role_id = %record.id, "Role saved");
    hub.publish(DirectoryChange::RoleSaved(record.clone()));
    Ok(record)
}

/// Deletes a role. Users that referenced it keep the dangling id.
pub async fn delete_role(db: &DatabaseConnection, hub: &DirectoryHub, role_id: &str) -> Result<()> {
    let _ordered = hub.lock_writes().await;
    let result = Role::delete_by_id(role_id.to_string()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("role", role_id));
    }

    info!(role_id, "Role deleted");
    hub.publish(DirectoryChange::RoleDeleted(role_id.to_string()));
    Ok(())
}

/// Creates or replaces a user profile and announces the change.
///
/// The referenced role must exist when the profile is saved.
#[instrument(skip(db, hub, input), fields(user_id = %input.id))]
pub async fn save_user(
    db: &DatabaseConnection,
    hub: &DirectoryHub,
    input: UserInput,
) -> Result<UserRecord> {
    let id = input.id.trim();
    let name = input.name.trim();
    let email = input.email.trim();
    if id.is_empty() {
        return Err(Error::validation("user id must not be empty"));
    }
    if name.is_empty() {
        return Err(Error::validation("user name must not be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation(format!("invalid e-mail address: {email}")));
    }

    let role_id = input.role_id.filter(|r| !r.trim().is_empty());
    // Held from the role check on; role deletes wait until this user is stored
    let _ordered = hub.lock_writes().await;
    if let Some(role_id) = &role_id {
        Role::find_by_id(role_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("role", role_id.clone()))?;
    }

    let record = UserRecord {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role_id,
    };
    let model = user::ActiveModel {
        id: Set(record.id.clone()),
        name: Set(record.name.clone()),
        email: Set(record.email.clone()),
        role_id: Set(record.role_id.clone()),
    };
    User::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(UserColumn::Id)
                .update_columns([UserColumn::Name, UserColumn::Email, UserColumn::RoleId])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!("User saved");
    hub.publish(DirectoryChange::UserSaved(record.clone()));
    Ok(record)
}

/// Deletes a user profile.
pub async fn delete_user(db: &DatabaseConnection, hub: &DirectoryHub, user_id: &str) -> Result<()> {
    let _ordered = hub.lock_writes().await;
    let result = User::delete_by_id(user_id.to_string()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("user", user_id));
    }

    info!(user_id, "User deleted");
    hub.publish(DirectoryChange::UserDeleted(user_id.to_string()));
    Ok(())
}

/// Loads one user's profile with the role resolved; `None` for unknown users.
pub async fn load_profile(db: &DatabaseConnection, user_id: &str) -> Result<Option<UserProfile>> {
    let Some(user) = User::find_by_id(user_id.to_string()).one(db).await? else {
        return Ok(None);
    };

    let role = match &user.role_id {
        Some(role_id) => Role::find_by_id(role_id.clone())
            .one(db)
            .await?
            .map(RoleRecord::try_from)
            .transpose()?,
        None => None,
    };

    let roles: HashMap<&str, &RoleRecord> =
        role.iter().map(|r| (r.id.as_str(), r)).collect();
    Ok(Some(UserProfile::resolve(user, &roles)))
}

/// In-memory copy of the users and roles tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectorySnapshot {
    /// Roles ordered by name
    pub roles: Vec<RoleRecord>,
    /// Users ordered by name
    pub users: Vec<UserRecord>,
}

impl DirectorySnapshot {
    /// Reads both tables.
    pub async fn load(db: &DatabaseConnection) -> Result<Self> {
        Ok(Self {
            roles: list_roles(db).await?,
            users: list_users(db).await?,
        })
    }

    /// Applies one change. Applying a change twice has no further effect.
    pub fn apply(&mut self, change: DirectoryChange) {
        match change {
            DirectoryChange::RoleSaved(role) => {
                if let Some(existing) = self.roles.iter_mut().find(|r| r.id == role.id) {
                    *existing = role;
                } else {
                    self.roles.push(role);
                }
            }
            DirectoryChange::RoleDeleted(id) => self.roles.retain(|r| r.id != id),
            DirectoryChange::UserSaved(user) => {
                if let Some(existing) = self.users.iter_mut().find(|u| u.id == user.id) {
                    *existing = user;
                } else {
                    self.users.push(user);
                }
            }
            DirectoryChange::UserDeleted(id) => self.users.retain(|u| u.id != id),
        }
    }

    /// Every user with the role reference resolved.
    #[must_use]
    pub fn profiles(&self) -> Vec<UserProfile> {
        let roles: HashMap<&str, &RoleRecord> =
            self.roles.iter().map(|r| (r.id.as_str(), r)).collect();
        self.users
            .iter()
            .cloned()
            .map(|u| UserProfile::resolve(u, &roles))
            .collect()
    }
}

/// A directory view kept current by the change hub until stopped or dropped
pub struct LiveDirectory {
    snapshot: Arc<RwLock<DirectorySnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl LiveDirectory {
    /// Subscribes to `hub`, loads the current tables and starts applying changes.
    ///
    /// The subscription is taken before the load so no change can fall between
    /// the two; changes already reflected in the load are re-applied harmlessly.
    pub async fn start(db: &DatabaseConnection, hub: &DirectoryHub) -> Result<Self> {
        let subscription = hub.subscribe();
        let snapshot = Arc::new(RwLock::new(DirectorySnapshot::load(db).await?));
        let task = tokio::spawn(apply_changes(subscription, Arc::clone(&snapshot)));
        debug!("Live directory view started");

        Ok(Self {
            snapshot,
            task: Some(task),
        })
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.snapshot.read().await.clone()
    }

    /// Users of the current snapshot with their roles resolved.
    pub async fn profiles(&self) -> Vec<UserProfile> {
        self.snapshot.read().await.profiles()
    }

    /// Cancels the subscription and waits until it is released.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("Live directory view stopped");
    }
}

impl Drop for LiveDirectory {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn apply_changes(
    mut subscription: Subscription<DirectoryChange>,
    snapshot: Arc<RwLock<DirectorySnapshot>>,
) {
    while let Some(change) = subscription.next().await {
        snapshot.write().await.apply(change);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use std::time::Duration;

    fn role_input(name: &str, permissions: &[Permission]) -> RoleInput {
        RoleInput {
            id: None,
            name: name.to_string(),
            permissions: permissions.to_vec(),
        }
    }

    fn user_input(id: &str, role_id: Option<&str>) -> UserInput {
        UserInput {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.org"),
            role_id: role_id.map(ToString::to_string),
        }
    }

    async fn eventually<F: Fn(&DirectorySnapshot) -> bool>(view: &LiveDirectory, check: F) -> bool {
        for _ in 0..100 {
            if check(&view.snapshot().await) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_save_role_validates_and_dedups() -> Result<()> {
        let db = setup_test_db().await?;
        let hub = DirectoryHub::new();

        assert!(matches!(
            save_role(&db, &hub, role_input("  ", &[])).await,
            Err(Error::Validation { .. })
        ));

        let role = save_role(
            &db,
            &hub,
            role_input("Secretaria", &[Permission::Users, Permission::General, Permission::Users]),
        )
        .await?;
        assert_eq!(role.permissions, vec![Permission::General, Permission::Users]);

        let roles = list_roles(&db).await?;
        assert_eq!(roles, vec![role]);
        Ok(())
    }

    #[tokio::test]
    async fn test_dangling_role_resolves_to_none() -> Result<()> {
        let db = setup_test_db().await?;
        let hub = DirectoryHub::new();

        let role = save_role(&db, &hub, role_input("Gestor", &[Permission::General])).await?;
        save_user(&db, &hub, user_input("u1", Some(&role.id))).await?;

        let profile = load_profile(&db, "u1").await?.unwrap();
        assert_eq!(profile.role.as_ref().unwrap().name, "Gestor");

        delete_role(&db, &hub, &role.id).await?;
        let profile = load_profile(&db, "u1").await?.unwrap();
        assert_eq!(profile.role_id.as_deref(), Some(role.id.as_str()));
        assert!(profile.role.is_none());

        assert!(load_profile(&db, "nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_user_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let hub = DirectoryHub::new();

        let mut bad_email = user_input("u1", None);
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            save_user(&db, &hub, bad_email).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            save_user(&db, &hub, user_input("u1", Some("missing-role"))).await,
            Err(Error::NotFound { entity: "role", .. })
        ));
        assert!(matches!(
            delete_user(&db, &hub, "u1").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_snapshot_apply_is_idempotent() {
        let mut snapshot = DirectorySnapshot::default();
        let role = RoleRecord {
            id: "r1".to_string(),
            name: "Gestor".to_string(),
            permissions: vec![Permission::General],
        };
        snapshot.apply(DirectoryChange::RoleSaved(role.clone()));
        snapshot.apply(DirectoryChange::RoleSaved(role));
        assert_eq!(snapshot.roles.len(), 1);

        let user = UserRecord {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.org".to_string(),
            role_id: Some("r1".to_string()),
        };
        snapshot.apply(DirectoryChange::UserSaved(user));
        assert_eq!(snapshot.profiles()[0].role.as_ref().unwrap().id, "r1");

        snapshot.apply(DirectoryChange::RoleDeleted("r1".to_string()));
        assert!(snapshot.profiles()[0].role.is_none());

        snapshot.apply(DirectoryChange::UserDeleted("u1".to_string()));
        assert!(snapshot.users.is_empty());
    }

    #[tokio::test]
    async fn test_live_directory_follows_writes_and_tears_down() -> Result<()> {
        let db = setup_test_db().await?;
        let hub = DirectoryHub::new();
        let existing = save_role(&db, &hub, role_input("Leitura", &[Permission::General])).await?;

        let view = LiveDirectory::start(&db, &hub).await?;
        assert_eq!(view.snapshot().await.roles, vec![existing]);
        assert_eq!(hub.subscriber_count(), 1);

        let admin = save_role(&db, &hub, role_input("Admin", &[Permission::Users])).await?;
        save_user(&db, &hub, user_input("u9", Some(&admin.id))).await?;
        assert!(eventually(&view, |s| s.users.len() == 1 && s.roles.len() == 2).await);

        let profiles = view.profiles().await;
        assert_eq!(profiles[0].role.as_ref().unwrap().name, "Admin");

        delete_user(&db, &hub, "u9").await?;
        assert!(eventually(&view, |s| s.users.is_empty()).await);

        view.stop().await;
        assert_eq!(hub.subscriber_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_saves_reach_the_view_in_commit_order() -> Result<()> {
        let db = setup_test_db().await?;
        let hub = DirectoryHub::new();
        let view = LiveDirectory::start(&db, &hub).await?;

        let named = |name: &str| RoleInput {
            id: Some("r1".to_string()),
            name: name.to_string(),
            permissions: vec![Permission::General],
        };
        let (a, b, c, d) = tokio::join!(
            save_role(&db, &hub, named("Alfa")),
            save_role(&db, &hub, named("Beta")),
            save_role(&db, &hub, named("Gama")),
            save_role(&db, &hub, named("Delta")),
        );
        for saved in [a, b, c, d] {
            saved?;
        }

        let stored = list_roles(&db).await?;
        assert_eq!(stored.len(), 1);
        let committed = stored[0].name.clone();
        assert!(eventually(&view, |s| s.roles.len() == 1 && s.roles[0].name == committed).await);

        // Nothing further is queued that could overwrite the committed name
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(view.snapshot().await.roles[0].name, committed);

        view.stop().await;
        Ok(())
    }
}
