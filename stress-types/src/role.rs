//! Client role identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RoleError;

/// Prefix every client role must carry.
pub const CLIENT_PREFIX: &str = "client.";

/// Role used when a workload names no clients.
pub const DEFAULT_ROLE: &str = "client.0";

/// Environment variable that exposes the client id to the remote process.
pub const CLIENT_ID_ENV: &str = "CEPH_CLIENT_ID";

/// A logical client identity such as `client.0`.
///
/// The id is the part after [`CLIENT_PREFIX`]. It is passed to the remote
/// process as `CEPH_CLIENT_ID=<id>`, so it is restricted to characters that
/// survive an unquoted shell assignment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientRole {
    role: String,
}

impl ClientRole {
    /// Parse a role string.
    pub fn parse(role: &str) -> Result<Self, RoleError> {
        let id = role
            .strip_prefix(CLIENT_PREFIX)
            .ok_or_else(|| RoleError::MissingPrefix(role.to_string()))?;

        if id.is_empty() {
            return Err(RoleError::EmptyId(role.to_string()));
        }

        if !id.chars().all(is_id_char) {
            return Err(RoleError::InvalidId {
                role: role.to_string(),
                id: id.to_string(),
            });
        }

        Ok(Self {
            role: role.to_string(),
        })
    }

    /// The full role string, e.g. `client.0`.
    pub fn as_str(&self) -> &str {
        &self.role
    }

    /// The client id, e.g. `0` for `client.0`.
    pub fn id(&self) -> &str {
        &self.role[CLIENT_PREFIX.len()..]
    }

    /// The `CEPH_CLIENT_ID` assignment for this role.
    pub fn env(&self) -> (String, String) {
        (CLIENT_ID_ENV.to_string(), self.id().to_string())
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

impl Default for ClientRole {
    fn default() -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
        }
    }
}

impl FromStr for ClientRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClientRole {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClientRole> for String {
    fn from(role: ClientRole) -> Self {
        role.role
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.role)
    }
}

impl fmt::Debug for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientRole({})", self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_role() {
        let role = ClientRole::parse("client.0").unwrap();
        assert_eq!(role.as_str(), "client.0");
        assert_eq!(role.id(), "0");
        assert_eq!(role.env(), ("CEPH_CLIENT_ID".to_string(), "0".to_string()));
    }

    #[test]
    fn parse_multi_digit_role() {
        let role: ClientRole = "client.12".parse().unwrap();
        assert_eq!(role.id(), "12");
    }

    #[test]
    fn reject_other_daemon_roles() {
        assert_eq!(
            ClientRole::parse("osd.0"),
            Err(RoleError::MissingPrefix("osd.0".into()))
        );
        assert!(matches!(
            ClientRole::parse("Client.0"),
            Err(RoleError::MissingPrefix(_))
        ));
    }

    #[test]
    fn reject_empty_id() {
        assert_eq!(
            ClientRole::parse("client."),
            Err(RoleError::EmptyId("client.".into()))
        );
    }

    #[test]
    fn reject_shell_unsafe_id() {
        for bad in ["client.0 1", "client.$(id)", "client.a=b", "client.0;ls"] {
            assert!(
                matches!(ClientRole::parse(bad), Err(RoleError::InvalidId { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn default_is_client_zero() {
        assert_eq!(ClientRole::default().as_str(), DEFAULT_ROLE);
    }

    #[test]
    fn serde_uses_plain_string() {
        let role = ClientRole::parse("client.3").unwrap();
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"client.3\"");

        let back: ClientRole = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);

        let bad: Result<ClientRole, _> = serde_json::from_str("\"mon.a\"");
        assert!(bad.is_err());
    }
}
