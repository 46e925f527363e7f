use strum_macros::IntoStaticStr;

use crate::config::schema::{str_to_hex_hash, AccessSettings, HttpFrontend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Writer,
    Reader,
}

impl Principal {
    /// Identity recorded against mutations
    pub fn user_name(&self) -> Option<String> {
        match self {
            Principal::Anonymous => None,
            Principal::Writer => Some("writer".to_string()),
            Principal::Reader => Some("reader".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// Rendered as the error code of a 401 response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access is open to everyone, don't pass a token")]
    TokenNotNeeded,
    #[error("Invalid token")]
    WrongPassword,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub read: AccessSettings,
    pub write: AccessSettings,
}

impl AccessPolicy {
    pub fn from_config(config: &HttpFrontend) -> Self {
        Self {
            read: config.read_access.clone(),
            write: config.write_access.clone(),
        }
    }

    pub fn free_for_all() -> Self {
        Self {
            read: AccessSettings::Any,
            write: AccessSettings::Any,
        }
    }

    pub fn with_read_password(self, password: &str) -> Self {
        Self {
            read: AccessSettings::Password {
                sha256_hash: str_to_hex_hash(password),
            },
            ..self
        }
    }

    pub fn with_write_disabled(self) -> Self {
        Self {
            write: AccessSettings::Off,
            ..self
        }
    }

    pub fn with_write_password(self, password: &str) -> Self {
        Self {
            write: AccessSettings::Password {
                sha256_hash: str_to_hex_hash(password),
            },
            ..self
        }
    }
}

pub fn token_to_principal(
    token: Option<String>,
    policy: &AccessPolicy,
) -> Result<Principal, AuthError> {
    match (token, &policy.write, &policy.read) {
        // Nothing is open to anonymous users
        (
            None,
            AccessSettings::Off | AccessSettings::Password { .. },
            AccessSettings::Off | AccessSettings::Password { .. },
        ) => Err(AuthError::Unauthorized),
        (None, _, _) => Ok(Principal::Anonymous),
        // No password configured anywhere, so a token can't mean anything
        (
            Some(_),
            AccessSettings::Any | AccessSettings::Off,
            AccessSettings::Any | AccessSettings::Off,
        ) => Err(AuthError::TokenNotNeeded),

        (Some(t), AccessSettings::Password { sha256_hash }, _)
            if str_to_hex_hash(&t) == sha256_hash.as_str() =>
        {
            Ok(Principal::Writer)
        }
        (Some(t), _, AccessSettings::Password { sha256_hash })
            if str_to_hex_hash(&t) == sha256_hash.as_str() =>
        {
            Ok(Principal::Reader)
        }
        (Some(_), _, _) => Err(AuthError::WrongPassword),
    }
}

pub fn can_perform_action(
    principal: &Principal,
    action: Action,
    policy: &AccessPolicy,
) -> bool {
    matches!(
        (principal, action, &policy.read, &policy.write),
        // Writer/Reader are only ever issued against a password
        (Principal::Writer, _, _, _)
            | (Principal::Reader, Action::Read, _, _)
            | (_, Action::Read, AccessSettings::Any, _)
            | (_, Action::Write, _, AccessSettings::Any)
    )
}

pub struct UserContext {
    pub principal: Principal,
    pub policy: AccessPolicy,
}

impl UserContext {
    pub fn can_perform_action(&self, action: Action) -> bool {
        can_perform_action(&self.principal, action, &self.policy)
    }
}
