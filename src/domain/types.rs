//! Shared identifiers and enumerations used across the domain.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a page record.
    PageId
);
string_id!(
    /// Identifier of a folder record.
    FolderId
);
string_id!(
    /// Identifier of a user identity.
    UserId
);

/// Permission tiers, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::Owner, Rank::Admin, Rank::Editor, Rank::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Owner => "owner",
            Rank::Admin => "admin",
            Rank::Editor => "editor",
            Rank::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which parts of a page a revert restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertMode {
    Content,
    Data,
    Both,
}

impl RevertMode {
    pub fn restores_content(self) -> bool {
        matches!(self, RevertMode::Content | RevertMode::Both)
    }

    pub fn restores_data(self) -> bool {
        matches!(self, RevertMode::Data | RevertMode::Both)
    }
}

impl TryFrom<&str> for RevertMode {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "content" => Ok(RevertMode::Content),
            "data" => Ok(RevertMode::Data),
            "both" => Ok(RevertMode::Both),
            _ => Err(()),
        }
    }
}
