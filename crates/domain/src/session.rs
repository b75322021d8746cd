//! Authenticated identity and permission checks.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fundline_core::{AppError, AppResult, BearerToken, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::RecordId;
use crate::resource::Resource;

/// Verb part of a `"<action>:<scope>"` permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionAction {
    /// List and view.
    Read,
    /// Create, update and delete.
    Write,
    /// Operational control such as starting agents.
    Admin,
}

impl PermissionAction {
    /// Returns the wire prefix.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

/// Permission granted by the backend, e.g. `write:cases` or `admin:agents`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    action: PermissionAction,
    scope: String,
}

impl Permission {
    /// Creates a permission for a scope such as `cases`.
    #[must_use]
    pub fn new(action: PermissionAction, scope: impl Into<String>) -> Self {
        Self {
            action,
            scope: scope.into(),
        }
    }

    /// Read permission for a resource family.
    #[must_use]
    pub fn read(resource: Resource) -> Self {
        Self::new(PermissionAction::Read, scope_for(resource))
    }

    /// Write permission for a resource family.
    #[must_use]
    pub fn write(resource: Resource) -> Self {
        Self::new(PermissionAction::Write, scope_for(resource))
    }

    /// Admin permission for a resource family.
    #[must_use]
    pub fn admin(resource: Resource) -> Self {
        Self::new(PermissionAction::Admin, scope_for(resource))
    }

    /// Returns the verb.
    #[must_use]
    pub fn action(&self) -> PermissionAction {
        self.action
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.scope.as_str()
    }

    fn implies(&self, required: &Permission) -> bool {
        if self.scope != required.scope && self.scope != "*" {
            return false;
        }

        match self.action {
            PermissionAction::Admin => true,
            PermissionAction::Write => required.action != PermissionAction::Admin,
            PermissionAction::Read => required.action == PermissionAction::Read,
        }
    }
}

fn scope_for(resource: Resource) -> &'static str {
    match resource {
        Resource::Cases | Resource::CaseStats => "cases",
        Resource::Plaintiffs => "plaintiffs",
        Resource::LawFirms => "law_firms",
        Resource::Documents => "documents",
        Resource::Communications | Resource::Templates => "communications",
        Resource::Agents => "agents",
        Resource::Reports | Resource::DashboardStats | Resource::Activity => "reports",
        Resource::Settings => "settings",
        Resource::Health | Resource::Session => "session",
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.action.as_str(), self.scope)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (action, scope) = value.trim().split_once(':').ok_or_else(|| {
            AppError::Validation(format!("permission '{value}' must look like 'action:scope'"))
        })?;

        let action = match action {
            "read" => PermissionAction::Read,
            "write" => PermissionAction::Write,
            "admin" => PermissionAction::Admin,
            other => {
                return Err(AppError::Validation(format!(
                    "unknown permission action '{other}'"
                )));
            }
        };

        let scope = NonEmptyString::new(scope)?;
        Ok(Self::new(action, scope))
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.to_string()
    }
}

/// Role claim of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full access.
    Admin,
    /// Access limited to granted permissions.
    User,
    /// Any other backend role.
    Other(String),
}

impl Role {
    /// Parses a backend role claim; unknown roles are preserved.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "user" | "" => Self::User,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(value) => value.as_str(),
        }
    }
}

/// Identity of the signed-in user. Owned by the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    email: String,
    name: Option<String>,
    role: Role,
    permissions: Vec<Permission>,
    law_firm_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserPayload {
    #[serde(alias = "id")]
    user_id: Option<RecordId>,
    email: String,
    name: Option<String>,
    role: String,
    permissions: Vec<String>,
    law_firm_id: Option<String>,
}

impl Session {
    /// Creates a session from already-validated parts.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: None,
            role,
            permissions,
            law_firm_id: None,
        }
    }

    /// Decodes the user object from `/auth/login` or `/auth/me`.
    ///
    /// Accepts both the bare user object and the `{ "user": {...} }` envelope.
    /// Unrecognised permission strings are dropped.
    pub fn from_user_value(value: &Value) -> AppResult<Self> {
        let user = value
            .as_object()
            .and_then(|object| object.get("user"))
            .unwrap_or(value);

        let payload: UserPayload = serde_json::from_value(user.clone()).map_err(|error| {
            AppError::Internal(format!("failed to decode user identity: {error}"))
        })?;

        let email = NonEmptyString::new(payload.email).map_err(|_| {
            AppError::Internal("user identity is missing an email address".to_owned())
        })?;
        let user_id = payload
            .user_id
            .map_or_else(|| email.as_str().to_owned(), |id| id.to_string());

        Ok(Self {
            user_id,
            email: email.into(),
            name: payload.name,
            role: Role::parse(payload.role.as_str()),
            permissions: payload
                .permissions
                .iter()
                .filter_map(|value| value.parse().ok())
                .collect(),
            law_firm_id: payload.law_firm_id,
        })
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the login email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.email.as_str())
    }

    /// Returns the role claim.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_slice()
    }

    /// Returns the law firm the user belongs to, if any.
    #[must_use]
    pub fn law_firm_id(&self) -> Option<&str> {
        self.law_firm_id.as_deref()
    }

    /// Returns whether the user may perform `required`.
    ///
    /// Admins may do everything; otherwise a granted permission on the same
    /// scope with an equal or stronger verb is needed.
    #[must_use]
    pub fn can(&self, required: &Permission) -> bool {
        self.role == Role::Admin
            || self
                .permissions
                .iter()
                .any(|granted| granted.implies(required))
    }
}

/// Session store lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No credentials.
    #[default]
    Unauthenticated,
    /// Stored credentials are being verified.
    Loading,
    /// Identity confirmed by the backend.
    Authenticated(Session),
}

impl AuthState {
    /// Returns the session when authenticated.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unauthenticated | Self::Loading => None,
        }
    }

    /// Returns a short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Loading => "loading",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plaintext password, only ever sent over the wire.
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer credential.
    pub access_token: BearerToken,
    /// Optional refresh credential.
    #[serde(default)]
    pub refresh_token: Option<BearerToken>,
    /// Token scheme, normally `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// User identity payload.
    pub user: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Permission, PermissionAction, Role, Session};
    use crate::resource::Resource;

    #[test]
    fn permission_round_trips_wire_value() {
        let parsed = "write:cases".parse::<Permission>();
        assert!(parsed.is_ok());
        let parsed = parsed.unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed.action(), PermissionAction::Write);
        assert_eq!(parsed.to_string(), "write:cases");
        assert_eq!(parsed, Permission::write(Resource::Cases));
    }

    #[test]
    fn malformed_permission_is_rejected() {
        assert!("cases".parse::<Permission>().is_err());
        assert!("delete:cases".parse::<Permission>().is_err());
        assert!("read:".parse::<Permission>().is_err());
    }

    #[test]
    fn decodes_login_user_with_permissions() {
        let session = Session::from_user_value(&json!({
            "user_id": "regular-user-id",
            "email": "user@example.com",
            "name": "Regular User",
            "role": "user",
            "permissions": ["read:cases", "read:documents", "bogus"],
        }));
        assert!(session.is_ok());
        let session = session.unwrap_or_else(|_| unreachable!());

        assert_eq!(session.user_id(), "regular-user-id");
        assert_eq!(session.permissions().len(), 2);
        assert!(session.can(&Permission::read(Resource::Cases)));
        assert!(!session.can(&Permission::write(Resource::Cases)));
    }

    #[test]
    fn decodes_me_envelope_with_numeric_id() {
        let session = Session::from_user_value(&json!({
            "user": {"id": 1, "email": "admin@example.com", "role": "admin"},
            "authenticated": true
        }));
        assert!(session.is_ok());
        let session = session.unwrap_or_else(|_| unreachable!());
        assert_eq!(session.user_id(), "1");
        assert_eq!(session.role(), &Role::Admin);
        assert!(session.can(&Permission::admin(Resource::Agents)));
    }

    #[test]
    fn write_implies_read_but_not_admin() {
        let session = Session::new(
            "u",
            "u@example.com",
            Role::User,
            vec![Permission::write(Resource::Agents)],
        );
        assert!(session.can(&Permission::read(Resource::Agents)));
        assert!(!session.can(&Permission::admin(Resource::Agents)));
    }

    #[test]
    fn identity_without_email_is_rejected() {
        assert!(Session::from_user_value(&json!({"id": 7})).is_err());
    }
}
