use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    error::{CirculationError, CirculationResult},
    ids::UserId,
};

/// Borrowing role attached to every registered user.
///
/// The role selects the eligibility rule consulted before lending and gates
/// the administrative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    /// Manages the catalog and the roster; does not borrow.
    Librarian,
}

impl Role {
    /// Patron-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Faculty => "Faculty",
            Self::Librarian => "Librarian",
        }
    }
}

/// A registered patron or staff member and their account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Stored login credential. Checked by plain equality; this is not a
    /// security boundary.
    pub credential: String,
    pub role: Role,
    pub account: Account,
}

impl User {
    /// A new user with an empty account.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, credential: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            credential: credential.into(),
            role,
            account: Account::default(),
        }
    }

    /// Whether the supplied credential matches the stored one.
    #[must_use]
    pub fn verify_credential(&self, supplied: &str) -> bool {
        self.credential == supplied
    }
}

/// All registered users, keyed by id.
#[derive(Debug, Default)]
pub struct Roster {
    users: BTreeMap<UserId, User>,
}

impl Roster {
    /// An empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user.
    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Unregister a user, returning the record if it existed. Guards against
    /// removing users with active bookings live in the lending engine.
    pub fn remove_user(&mut self, id: &UserId) -> Option<User> {
        self.users.remove(id)
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] for an unknown id.
    pub fn get(&self, id: &UserId) -> CirculationResult<&User> {
        self.users
            .get(id)
            .ok_or_else(|| CirculationError::UserNotFound(id.clone()))
    }

    /// Look up a user for mutation.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] for an unknown id.
    pub fn get_mut(&mut self, id: &UserId) -> CirculationResult<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| CirculationError::UserNotFound(id.clone()))
    }

    /// Non-failing lookup, for resolving reservation-queue entries that may
    /// have gone stale.
    #[must_use]
    pub fn lookup(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// All users in id order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Whether any registered user carries the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.users.values().any(|u| u.role == role)
    }
}
