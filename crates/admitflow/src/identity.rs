use std::fmt;
use std::str::FromStr;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Header carrying the authenticated subject id, set by the auth layer.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated subject role, set by the auth layer.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Identifier wrapper for portal user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for institutions and companies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(pub String);

/// Portal roles recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Institution,
    Company,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Institution => "institution",
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // "institute" survives in legacy account documents.
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "institution" | "institute" => Ok(Role::Institution),
            "company" => Ok(Role::Company),
            "admin" => Ok(Role::Admin),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

/// Caller identity threaded explicitly through every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub actor: UserId,
    pub role: Role,
}

impl ActorContext {
    pub fn new(actor: UserId, role: Role) -> Self {
        Self { actor, role }
    }

    /// Build the context from the trusted identity headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, IdentityError> {
        let actor = header_value(headers, ACTOR_ID_HEADER)?;
        if actor.trim().is_empty() {
            return Err(IdentityError::MissingHeader(ACTOR_ID_HEADER));
        }
        let role = header_value(headers, ACTOR_ROLE_HEADER)?.parse::<Role>()?;

        Ok(Self {
            actor: UserId(actor.to_string()),
            role,
        })
    }

    /// True when the actor id doubles as the given organization id.
    ///
    /// Institution and company operators sign in with their organization's
    /// account, so tenancy checks compare the two directly.
    pub fn is_org(&self, organization: &OrgId) -> bool {
        self.actor.0 == organization.0
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, IdentityError> {
    let value = headers
        .get(name)
        .ok_or(IdentityError::MissingHeader(name))?;
    value
        .to_str()
        .map_err(|_| IdentityError::MalformedHeader(name))
}

/// Failures resolving the caller identity from a request.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing required header {0}")]
    MissingHeader(&'static str),
    #[error("header {0} is not valid UTF-8")]
    MalformedHeader(&'static str),
    #[error("unrecognized actor role '{0}'")]
    UnknownRole(String),
}
