use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Set of capabilities granted to a subject, carried in the `perm` claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const NONE: Self = Self(0);
    pub const READ_POSTS: Self = Self(1 << 0);
    pub const WRITE_POSTS: Self = Self(1 << 1);
    pub const READ_COMMENTS: Self = Self(1 << 2);
    pub const WRITE_COMMENTS: Self = Self(1 << 3);
    pub const MODERATE_ALL_COMMENTS: Self = Self(1 << 4);
    pub const READ_PROFILES: Self = Self(1 << 5);
    pub const WRITE_PROFILES: Self = Self(1 << 6);

    /// Anonymous readers.
    pub const VISITOR: Self =
        Self(Self::READ_POSTS.0 | Self::READ_COMMENTS.0 | Self::READ_PROFILES.0);
    /// Registered users.
    pub const DEFAULT: Self = Self(Self::VISITOR.0 | Self::WRITE_COMMENTS.0);
    pub const PUBLISHER: Self = Self(Self::DEFAULT.0 | Self::WRITE_POSTS.0);
    pub const MODERATOR: Self = Self(Self::DEFAULT.0 | Self::MODERATE_ALL_COMMENTS.0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is granted.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for Permission {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Permission {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
