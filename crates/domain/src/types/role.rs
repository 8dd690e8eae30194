//! User roles
//!
//! The role set is closed. Anything the identity provider or the profile
//! table reports outside of it collapses to the least-privileged role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MentorHubError;

/// Role of an authenticated user
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Mentor,
    #[default]
    Mentee,
    DeptLead,
}

impl Role {
    /// Every role, most privileged first
    pub const ALL: [Self; 5] =
        [Self::SuperAdmin, Self::Admin, Self::DeptLead, Self::Mentor, Self::Mentee];

    /// Parse a role name as it appears in claims or profile rows.
    ///
    /// Matching ignores case, surrounding whitespace, and treats `-` and
    /// spaces as `_`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "super_admin" | "superadmin" => Some(Self::SuperAdmin),
            "admin" => Some(Self::Admin),
            "mentor" => Some(Self::Mentor),
            "mentee" => Some(Self::Mentee),
            "dept_lead" | "department_lead" => Some(Self::DeptLead),
            _ => None,
        }
    }

    /// Resolve an optional claim, defaulting to the least-privileged role
    #[must_use]
    pub fn from_claim(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_else(Self::least_privileged)
    }

    #[must_use]
    pub const fn least_privileged() -> Self {
        Self::Mentee
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Mentor => "mentor",
            Self::Mentee => "mentee",
            Self::DeptLead => "dept_lead",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Administrator",
            Self::Admin => "Administrator",
            Self::Mentor => "Mentor",
            Self::Mentee => "Mentee",
            Self::DeptLead => "Department Lead",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MentorHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| MentorHubError::InvalidInput(format!("unknown role: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_loosely() {
        assert_eq!(Role::parse("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse(" Super-Admin "), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("DEPT_LEAD"), Some(Role::DeptLead));
        assert_eq!(Role::parse("mentor"), Some(Role::Mentor));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn missing_or_unknown_claim_is_mentee() {
        assert_eq!(Role::from_claim(None), Role::Mentee);
        assert_eq!(Role::from_claim(Some("root")), Role::Mentee);
        assert_eq!(Role::from_claim(Some("admin")), Role::Admin);
        assert_eq!(Role::default(), Role::least_privileged());
    }

    #[test]
    fn as_str_roundtrips_through_parse() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Role::DeptLead).unwrap(), "\"dept_lead\"");
        let role: Role = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(role, Role::SuperAdmin);
    }

    #[test]
    fn from_str_reports_unknown_role() {
        assert!(matches!("nobody".parse::<Role>(), Err(MentorHubError::InvalidInput(_))));
    }
}
