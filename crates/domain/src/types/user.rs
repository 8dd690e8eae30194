//! User identity types
//!
//! `UserClaims` arrive with the token response, `UserProfile` comes from the
//! profile table, and `AuthUser` is what the rest of the application reads.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// User claims embedded in the identity provider's token response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Raw role string; absent on the local-auth path until the profile
    /// lookup completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, alias = "externalId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl UserClaims {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            role: None,
            department: None,
            external_id: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Row of the profile table in the embedded database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// The realized, authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub external_id: Option<String>,
}

impl AuthUser {
    /// Derive a user from session claims
    ///
    /// A missing or unknown role claim yields `Role::Mentee`.
    #[must_use]
    pub fn from_claims(claims: &UserClaims) -> Self {
        Self {
            id: claims.id.clone(),
            email: claims.email.clone(),
            display_name: display_name_for(claims.full_name.as_deref(), &claims.email),
            role: Role::from_claim(claims.role.as_deref()),
            department: claims.department.clone(),
            external_id: claims.external_id.clone(),
        }
    }

    /// Overlay a fetched profile onto the claim-derived user
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        self.role = Role::from_claim(profile.role.as_deref());
        if let Some(name) = profile.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.display_name = name.to_string();
        }
        if profile.department.is_some() {
            self.department.clone_from(&profile.department);
        }
        if profile.external_id.is_some() {
            self.external_id.clone_from(&profile.external_id);
        }
    }
}

fn display_name_for(full_name: Option<&str>, email: &str) -> String {
    match full_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => email.split('@').next().unwrap_or(email).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_uses_full_name_and_role() {
        let claims = UserClaims::new("u1", "grace@example.com")
            .with_full_name("Grace H")
            .with_role("mentor");
        let user = AuthUser::from_claims(&claims);
        assert_eq!(user.display_name, "Grace H");
        assert_eq!(user.role, Role::Mentor);
    }

    #[test]
    fn from_claims_falls_back_to_email_local_part_and_mentee() {
        let user = AuthUser::from_claims(&UserClaims::new("u2", "linus@example.com"));
        assert_eq!(user.display_name, "linus");
        assert_eq!(user.role, Role::Mentee);
    }

    #[test]
    fn apply_profile_overrides_role_and_department() {
        let mut user = AuthUser::from_claims(&UserClaims::new("u3", "ken@example.com"));
        let profile = UserProfile {
            id: "u3".into(),
            email: "ken@example.com".into(),
            full_name: Some("Ken T".into()),
            role: Some("dept_lead".into()),
            department: Some("Engineering".into()),
            external_id: Some("dir-42".into()),
        };
        user.apply_profile(&profile);
        assert_eq!(user.role, Role::DeptLead);
        assert_eq!(user.display_name, "Ken T");
        assert_eq!(user.department.as_deref(), Some("Engineering"));
        assert_eq!(user.external_id.as_deref(), Some("dir-42"));
    }

    #[test]
    fn claims_accept_camel_case_external_id() {
        let claims: UserClaims = serde_json::from_str(
            r#"{"id":"u4","email":"a@b.c","full_name":"A","role":"admin","externalId":"x9"}"#,
        )
        .unwrap();
        assert_eq!(claims.external_id.as_deref(), Some("x9"));
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }
}
