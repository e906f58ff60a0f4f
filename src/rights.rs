//! Rights and the bitmask they are packed into
//!
//! Each right occupies one stable bit position; persisted masks depend on
//! those positions never changing. `ALL` is a sentinel bit that satisfies any
//! containment test but is never part of the displayable set.

use crate::error::{AclError, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single grantable right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Right {
    View,
    Create,
    Edit,
    Delete,
    Undelete,
    Operator,
    Master,
    Owner,
    /// Sentinel meaning "every right granted"; never displayed individually
    All,
}

impl Right {
    /// Displayable rights in declaration order. Excludes [`Right::All`].
    ///
    /// Consumers rely on this order for stable display output, so it is part
    /// of the public contract.
    pub const DISPLAY: [Right; 8] = [
        Right::View,
        Right::Create,
        Right::Edit,
        Right::Delete,
        Right::Undelete,
        Right::Operator,
        Right::Master,
        Right::Owner,
    ];

    /// The bit this right occupies in a mask
    pub fn mask(self) -> RightMask {
        match self {
            Right::View => RightMask::VIEW,
            Right::Create => RightMask::CREATE,
            Right::Edit => RightMask::EDIT,
            Right::Delete => RightMask::DELETE,
            Right::Undelete => RightMask::UNDELETE,
            Right::Operator => RightMask::OPERATOR,
            Right::Master => RightMask::MASTER,
            Right::Owner => RightMask::OWNER,
            Right::All => RightMask::ALL,
        }
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Right::View => "VIEW",
            Right::Create => "CREATE",
            Right::Edit => "EDIT",
            Right::Delete => "DELETE",
            Right::Undelete => "UNDELETE",
            Right::Operator => "OPERATOR",
            Right::Master => "MASTER",
            Right::Owner => "OWNER",
            Right::All => "ALL",
        }
    }

    /// Parse a canonical right name
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownRight`] for any name outside the fixed
    /// enumeration.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "VIEW" => Ok(Right::View),
            "CREATE" => Ok(Right::Create),
            "EDIT" => Ok(Right::Edit),
            "DELETE" => Ok(Right::Delete),
            "UNDELETE" => Ok(Right::Undelete),
            "OPERATOR" => Ok(Right::Operator),
            "MASTER" => Ok(Right::Master),
            "OWNER" => Ok(Right::Owner),
            "ALL" => Ok(Right::All),
            other => Err(AclError::UnknownRight(other.to_string())),
        }
    }

    /// Administrative rights that imply this right when present in a mask
    ///
    /// OWNER implies MASTER, MASTER implies OPERATOR, and OPERATOR implies
    /// the five object-level rights. Consulted by the operator-precedence
    /// rule.
    pub fn dominators(self) -> RightMask {
        match self {
            Right::View
            | Right::Create
            | Right::Edit
            | Right::Delete
            | Right::Undelete => RightMask::OPERATOR | RightMask::MASTER | RightMask::OWNER,
            Right::Operator => RightMask::MASTER | RightMask::OWNER,
            Right::Master => RightMask::OWNER,
            Right::Owner | Right::All => RightMask::empty(),
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Right {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self> {
        Right::from_name(s)
    }
}

bitflags! {
    /// Bitmask over [`Right`] bit positions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RightMask: u32 {
        const VIEW = 1 << 0;
        const CREATE = 1 << 1;
        const EDIT = 1 << 2;
        const DELETE = 1 << 3;
        const UNDELETE = 1 << 4;
        const OPERATOR = 1 << 5;
        const MASTER = 1 << 6;
        const OWNER = 1 << 7;

        /// Sentinel granting every displayable right
        const ALL = 1 << 8;
    }
}

impl RightMask {
    /// Build a mask from right names
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownRight`] if any name is not in the fixed
    /// enumeration.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mask = RightMask::empty();
        for name in names {
            mask |= Right::from_name(name.as_ref())?.mask();
        }
        Ok(mask)
    }

    /// Displayable rights present in this mask, in declaration order
    ///
    /// A mask carrying the ALL bit yields the full display set.
    pub fn rights(self) -> Vec<Right> {
        if self.contains(RightMask::ALL) {
            return Right::DISPLAY.to_vec();
        }
        Right::DISPLAY
            .into_iter()
            .filter(|right| self.intersects(right.mask()))
            .collect()
    }

    /// Names of the displayable rights present, in declaration order
    pub fn to_names(self) -> Vec<&'static str> {
        self.rights().into_iter().map(Right::name).collect()
    }

    /// True iff this mask grants the given right, either through the right's
    /// own bit or through the ALL sentinel
    pub fn grants(self, right: Right) -> bool {
        self.contains(RightMask::ALL) || self.intersects(right.mask())
    }
}

impl fmt::Display for RightMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_names().join("|"))
    }
}
