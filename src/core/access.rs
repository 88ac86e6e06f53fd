//! Access control - section permissions and the page guard.
//!
//! A page declares the one permission it needs. [`authorize`] decides, from the
//! signed-in user's resolved profile, whether the page runs or the user is sent
//! to the default admin page with a denial notice. [`AccessGate`] wraps that
//! decision in the loading → authorized | unauthorized lifecycle of a page view.

use crate::{
    core::{census::Section, directory::UserProfile},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Named permission a role can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    General,
    Infrastructure,
    Professionals,
    Technology,
    Cultural,
    Maintenance,
    Users,
}

impl Permission {
    /// Every permission a role can hold
    pub const ALL: [Self; 7] = [
        Self::General,
        Self::Infrastructure,
        Self::Professionals,
        Self::Technology,
        Self::Cultural,
        Self::Maintenance,
        Self::Users,
    ];

    /// Stored and serialized name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Infrastructure => "infrastructure",
            Self::Professionals => "professionals",
            Self::Technology => "technology",
            Self::Cultural => "cultural",
            Self::Maintenance => "maintenance",
            Self::Users => "users",
        }
    }

    /// Permission that guards edits to a submission section.
    #[must_use]
    pub const fn for_section(section: Section) -> Self {
        match section {
            Section::General => Self::General,
            Section::Infrastructure => Self::Infrastructure,
            Section::Technology => Self::Technology,
            Section::Cultural => Self::Cultural,
            Section::Maintenance => Self::Maintenance,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown permission: {s}")))
    }
}

/// Outcome of the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Run the page
    Allow,
    /// Show `notice` and send the user to `to`
    Redirect { to: String, notice: String },
}

/// Decides whether a user may open a page that needs `required`.
///
/// No profile, a profile without a role, or a role lacking the permission all
/// redirect. This never fails.
#[must_use]
pub fn authorize(
    profile: Option<&UserProfile>,
    required: Permission,
    redirect_to: &str,
) -> AccessDecision {
    let granted = profile
        .and_then(|p| p.role.as_ref())
        .is_some_and(|role| role.permissions.contains(&required));

    if granted {
        AccessDecision::Allow
    } else {
        AccessDecision::Redirect {
            to: redirect_to.to_string(),
            notice: format!("You do not have permission to access the {required} section."),
        }
    }
}

/// Where a guarded page view is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Profile resolution still in flight; nothing protected is shown
    Loading,
    /// The page may render for this profile
    Authorized(UserProfile),
    /// Terminal for this view: show the notice, then redirect
    Unauthorized { redirect_to: String, notice: String },
}

/// Guard for one page view.
///
/// The decision is made once, when profile data arrives, and is only revisited
/// when a different profile is supplied.
#[derive(Debug, Clone)]
pub struct AccessGate {
    required: Permission,
    redirect_to: String,
    state: GateState,
    evaluated_for: Option<Option<UserProfile>>,
}

impl AccessGate {
    /// A gate for a page that needs `required`, redirecting to `redirect_to`.
    #[must_use]
    pub fn new(required: Permission, redirect_to: impl Into<String>) -> Self {
        Self {
            required,
            redirect_to: redirect_to.into(),
            state: GateState::Loading,
            evaluated_for: None,
        }
    }

    /// Current decision
    #[must_use]
    pub const fn state(&self) -> &GateState {
        &self.state
    }

    /// Permission this gate checks
    #[must_use]
    pub const fn required(&self) -> Permission {
        self.required
    }

    /// Feeds the resolved profile (`None` when signed out or unknown) into the gate.
    pub fn resolve(&mut self, profile: Option<UserProfile>) -> &GateState {
        if self.evaluated_for.as_ref() == Some(&profile) {
            return &self.state;
        }

        self.state = match authorize(profile.as_ref(), self.required, &self.redirect_to) {
            AccessDecision::Allow => match profile.clone() {
                Some(p) => GateState::Authorized(p),
                None => GateState::Loading,
            },
            AccessDecision::Redirect { to, notice } => GateState::Unauthorized {
                redirect_to: to,
                notice,
            },
        };
        self.evaluated_for = Some(profile);
        &self.state
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::directory::RoleRecord;

    fn profile_with(permissions: &[Permission]) -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.org".to_string(),
            role_id: Some("r1".to_string()),
            role: Some(RoleRecord {
                id: "r1".to_string(),
                name: "Secretaria".to_string(),
                permissions: permissions.to_vec(),
            }),
        }
    }

    #[test]
    fn test_authorize() {
        let editor = profile_with(&[Permission::General, Permission::Technology]);
        assert_eq!(
            authorize(Some(&editor), Permission::Technology, "/admin"),
            AccessDecision::Allow
        );
        assert!(matches!(
            authorize(Some(&editor), Permission::Users, "/admin"),
            AccessDecision::Redirect { ref to, .. } if to == "/admin"
        ));
        assert!(matches!(
            authorize(None, Permission::General, "/admin"),
            AccessDecision::Redirect { .. }
        ));

        let mut dangling = editor;
        dangling.role = None;
        assert!(matches!(
            authorize(Some(&dangling), Permission::General, "/admin"),
            AccessDecision::Redirect { .. }
        ));
    }

    #[test]
    fn test_gate_starts_loading_and_decides_once() {
        let mut gate = AccessGate::new(Permission::Users, "/admin");
        assert_eq!(gate.state(), &GateState::Loading);

        let admin = profile_with(&[Permission::Users]);
        assert!(matches!(
            gate.resolve(Some(admin.clone())),
            GateState::Authorized(_)
        ));
        // Same profile again: no re-evaluation, same state
        assert!(matches!(gate.resolve(Some(admin)), GateState::Authorized(_)));

        // A different profile is a profile change
        let viewer = profile_with(&[Permission::General]);
        assert!(matches!(
            gate.resolve(Some(viewer)),
            GateState::Unauthorized { .. }
        ));
    }

    #[test]
    fn test_gate_signed_out_is_unauthorized() {
        let mut gate = AccessGate::new(Permission::General, "/admin/inicio");
        match gate.resolve(None) {
            GateState::Unauthorized {
                redirect_to,
                notice,
            } => {
                assert_eq!(redirect_to, "/admin/inicio");
                assert!(notice.contains("general"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!("users".parse::<Permission>().unwrap(), Permission::Users);
        assert!("admin".parse::<Permission>().is_err());
        assert_eq!(
            Permission::for_section(Section::Cultural),
            Permission::Cultural
        );
    }
}
