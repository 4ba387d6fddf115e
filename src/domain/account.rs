//! Accounts and roles.

use rust_decimal::Decimal;

/// What an authenticated identity is allowed to do. Administrators set
/// prices and never trade; participants trade and never set prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Participant,
    Administrator,
}

impl Role {
    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "participant",
            Role::Administrator => "administrator",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "participant" => Some(Role::Participant),
            "administrator" => Some(Role::Administrator),
            _ => None,
        }
    }
}

/// A registered account. Cash is only ever mutated by the trade engine;
/// accounts are never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub cash: Decimal,
    pub role: Role,
}
