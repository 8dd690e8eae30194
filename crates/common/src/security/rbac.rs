//! Role-based permission and route gating
//!
//! Both tables are static. A role's permissions are a flat list of action
//! names; a route lists the roles allowed to open it.
//!
//! # Route matching
//!
//! 1. The path is normalized: query string, fragment and trailing `/` are
//!    dropped.
//! 2. An exact entry wins.
//! 3. Otherwise the first pattern with the same number of segments whose
//!    literal segments all match is used. A segment starting with `:` matches
//!    any value.
//! 4. A path matching no entry is open to every signed-in role.
//!
//! The last rule means a new sensitive page is public to all roles until it
//! is added to the route table.

use mentorhub_domain::Role;

/// Role → permitted actions
pub type PermissionTable = &'static [(Role, &'static [&'static str])];

/// Route pattern → roles allowed to open it
pub type RouteTable = &'static [(&'static str, &'static [Role])];

const PARAM_PREFIX: char = ':';

const MENTEE: &[&str] = &[
    "view_dashboard",
    "view_own_profile",
    "edit_own_profile",
    "view_sessions",
    "book_sessions",
    "give_feedback",
    "view_resources",
];

const MENTOR: &[&str] = &[
    "view_dashboard",
    "view_own_profile",
    "edit_own_profile",
    "view_sessions",
    "manage_sessions",
    "create_session_notes",
    "view_assigned_mentees",
    "view_student_details",
    "give_feedback",
    "view_resources",
    "use_ai_analysis",
];

const DEPT_LEAD: &[&str] = &[
    "view_dashboard",
    "view_own_profile",
    "edit_own_profile",
    "view_sessions",
    "view_department",
    "view_all_mentees",
    "view_student_details",
    "view_reports",
    "export_reports",
    "manage_assignments",
    "view_resources",
    "use_ai_analysis",
];

const ADMIN: &[&str] = &[
    "view_dashboard",
    "view_own_profile",
    "edit_own_profile",
    "view_sessions",
    "manage_sessions",
    "create_session_notes",
    "view_assigned_mentees",
    "view_all_mentees",
    "view_student_details",
    "view_department",
    "view_reports",
    "export_reports",
    "manage_users",
    "manage_assignments",
    "manage_departments",
    "send_notifications",
    "run_sync",
    "use_ai_analysis",
    "view_resources",
    "manage_resources",
];

const SUPER_ADMIN: &[&str] = &[
    "view_dashboard",
    "view_own_profile",
    "edit_own_profile",
    "view_sessions",
    "manage_sessions",
    "create_session_notes",
    "view_assigned_mentees",
    "view_all_mentees",
    "view_student_details",
    "view_department",
    "view_reports",
    "export_reports",
    "manage_users",
    "manage_assignments",
    "manage_departments",
    "send_notifications",
    "run_sync",
    "use_ai_analysis",
    "view_resources",
    "manage_resources",
    "manage_roles",
    "manage_settings",
    "view_audit_log",
    "manage_integrations",
];

/// Default role → permission table
pub const ROLE_PERMISSIONS: PermissionTable = &[
    (Role::SuperAdmin, SUPER_ADMIN),
    (Role::Admin, ADMIN),
    (Role::DeptLead, DEPT_LEAD),
    (Role::Mentor, MENTOR),
    (Role::Mentee, MENTEE),
];

const ADMINS: &[Role] = &[Role::SuperAdmin, Role::Admin];
const MANAGERS: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::DeptLead];
const STAFF: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::DeptLead, Role::Mentor];
const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];
const NOTE_TAKERS: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Mentor];
const EVERYONE: &[Role] = &Role::ALL;

/// Default route table
pub const ROUTE_ACCESS: RouteTable = &[
    ("/dashboard", EVERYONE),
    ("/profile", EVERYONE),
    ("/admin", ADMINS),
    ("/admin/users", ADMINS),
    ("/admin/sync", ADMINS),
    ("/admin/roles", SUPER_ADMIN_ONLY),
    ("/admin/settings", SUPER_ADMIN_ONLY),
    ("/admin/audit", SUPER_ADMIN_ONLY),
    ("/reports", MANAGERS),
    ("/department", MANAGERS),
    ("/mentors", MANAGERS),
    ("/students", STAFF),
    ("/student/:id", STAFF),
    ("/mentor/:id", STAFF),
    ("/ai-analysis", STAFF),
    ("/sessions/:id/notes", NOTE_TAKERS),
];

/// Answers "may this role do X / open Y" from static tables
#[derive(Debug, Clone, Copy)]
pub struct PermissionEvaluator {
    permissions: PermissionTable,
    routes: RouteTable,
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::new(ROLE_PERMISSIONS, ROUTE_ACCESS)
    }
}

impl PermissionEvaluator {
    #[must_use]
    pub const fn new(permissions: PermissionTable, routes: RouteTable) -> Self {
        Self { permissions, routes }
    }

    /// Every permission granted to `role`; empty for a role missing from the
    /// table
    #[must_use]
    pub fn permissions_for(&self, role: Role) -> &'static [&'static str] {
        self.permissions
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, perms)| *perms)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_permission(&self, role: Role, permission: &str) -> bool {
        self.permissions_for(role).contains(&permission)
    }

    /// [`Self::has_permission`] for a role name; unknown roles hold nothing
    #[must_use]
    pub fn has_permission_str(&self, role: &str, permission: &str) -> bool {
        Role::parse(role).is_some_and(|role| self.has_permission(role, permission))
    }

    /// The roles listed for `path`, or `None` when no entry matches
    #[must_use]
    pub fn allowed_roles(&self, path: &str) -> Option<&'static [Role]> {
        let path = normalize(path);
        if let Some((_, roles)) = self.routes.iter().find(|(pattern, _)| *pattern == path) {
            return Some(*roles);
        }

        let segments: Vec<&str> = split(path).collect();
        self.routes
            .iter()
            .filter(|(pattern, _)| pattern.contains(PARAM_PREFIX))
            .find(|(pattern, _)| matches_pattern(pattern, &segments))
            .map(|(_, roles)| *roles)
    }

    /// Whether `role` may open `path`
    ///
    /// Paths with no matching entry are allowed.
    #[must_use]
    pub fn can_access_route(&self, role: Role, path: &str) -> bool {
        self.allowed_roles(path).map_or(true, |roles| roles.contains(&role))
    }

    /// [`Self::can_access_route`] for a role name
    ///
    /// An unknown role is refused on every listed route and, like any
    /// other role, allowed on unlisted ones.
    #[must_use]
    pub fn can_access_route_str(&self, role: &str, path: &str) -> bool {
        match (self.allowed_roles(path), Role::parse(role)) {
            (None, _) => true,
            (Some(roles), Some(role)) => roles.contains(&role),
            (Some(_), None) => false,
        }
    }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn matches_pattern(pattern: &str, segments: &[&str]) -> bool {
    let pattern: Vec<&str> = split(pattern).collect();
    pattern.len() == segments.len()
        && pattern
            .iter()
            .zip(segments)
            .all(|(expected, actual)| expected.starts_with(PARAM_PREFIX) || expected == actual)
}
