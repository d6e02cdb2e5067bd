//! Identity
//!
//! Carts belong either to an authenticated user or to an anonymous session.
//! The session identifier is generated lazily on first anonymous access and
//! then kept on the [`SessionContext`] for the rest of the session.

use std::fmt;

use jiff::Timestamp;
use mockall::automock;
use rand::{Rng, distributions::Alphanumeric};

/// Length of the random part of a generated session identifier.
pub const SESSION_TOKEN_LENGTH: usize = 64;

/// Authenticated user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anonymous session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing session identifier, for example one read back from a session store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier: random alphanumerics, `_`, then the unix timestamp.
    #[must_use]
    pub fn generate() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LENGTH)
            .map(char::from)
            .collect();

        Self(format!("{token}_{}", Timestamp::now().as_second()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a cart, or a line item inside it, belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Authenticated user
    User(UserId),

    /// Anonymous session
    Session(SessionId),
}

impl Owner {
    /// The user id, when the owner is authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Owner::User(user) => Some(*user),
            Owner::Session(_) => None,
        }
    }

    /// The session id, when the owner is anonymous.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Owner::User(_) => None,
            Owner::Session(session) => Some(session),
        }
    }
}

/// Per-session state passed explicitly into cart operations.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session_id: Option<SessionId>,
}

impl SessionContext {
    /// A fresh session with no identifier yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session whose identifier was persisted earlier.
    #[must_use]
    pub fn resume(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
        }
    }

    /// Returns the session identifier, generating it on first access.
    pub fn session_id(&mut self) -> &SessionId {
        self.session_id.get_or_insert_with(SessionId::generate)
    }

    /// Returns the session identifier without generating one.
    pub fn existing_session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }
}

/// Resolves the currently authenticated user.
#[automock]
pub trait IdentityResolver {
    /// The authenticated user for the given auth provider, or `None` for guests.
    fn current_user(&self, provider: &str) -> Option<UserId>;
}

/// Resolver for hosts without authentication; everyone is a guest.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestResolver;

impl IdentityResolver for GuestResolver {
    fn current_user(&self, _provider: &str) -> Option<UserId> {
        None
    }
}

/// Resolve the owner of the current request.
///
/// Authenticated users own their cart by user id; guests own it by session id,
/// which is generated on the spot if the session has none yet.
pub fn resolve_owner(
    resolver: &dyn IdentityResolver,
    provider: &str,
    session: &mut SessionContext,
) -> Owner {
    match resolver.current_user(provider) {
        Some(user) => Owner::User(user),
        None => Owner::Session(session.session_id().clone()),
    }
}
