//! Permission model: 9-bit modes and the access evaluator.
//!
//! A [`Mode`] is the owner/group/other × read/write/execute bit grid,
//! displayed and stored as the familiar `rwxr-xr-x` string. The evaluator
//! picks the effective class for an acting identity and checks single
//! bits; the superuser bypasses every check.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::FsError;

/// Name of the superuser account. Bypasses all permission checks.
pub const SUPERUSER: &str = "root";

// =============================================================================
// Bits and classes
// =============================================================================

/// A single permission bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Perm {
    Read,
    Write,
    Execute,
}

impl Perm {
    fn index(self) -> usize {
        match self {
            Perm::Read => 0,
            Perm::Write => 1,
            Perm::Execute => 2,
        }
    }
}

/// Which mode triplet applies to an acting identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessClass {
    Owner,
    Group,
    Other,
}

impl AccessClass {
    fn offset(self) -> usize {
        match self {
            AccessClass::Owner => 0,
            AccessClass::Group => 3,
            AccessClass::Other => 6,
        }
    }
}

// =============================================================================
// Mode
// =============================================================================

/// 9-bit permission grid. Bit `i` corresponds to position `i` in the
/// `rwxrwxrwx` rendering.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Mode(u16);

const MODE_CHARS: [char; 9] = ['r', 'w', 'x', 'r', 'w', 'x', 'r', 'w', 'x'];

impl Mode {
    /// Default mode for newly created files (`rw-r--r--`).
    pub fn file_default() -> Self {
        Mode::from_display("rw-r--r--")
    }

    /// Default mode for newly created directories (`rwxr-xr-x`).
    pub fn dir_default() -> Self {
        Mode::from_display("rwxr-xr-x")
    }

    /// Parse a display string leniently: missing positions read as `-`,
    /// anything but the expected `r`/`w`/`x` at a position reads as `-`.
    pub fn from_display(s: &str) -> Self {
        let mut bits = 0u16;
        for (i, c) in s.chars().take(9).enumerate() {
            if c == MODE_CHARS[i] {
                bits |= 1 << i;
            }
        }
        Mode(bits)
    }

    /// Parse a numeric mode like `755`. Each digit 0-7 decomposes as
    /// 4=read, 2=write, 1=execute; digits 8 and 9 grant nothing.
    pub fn from_numeric(s: &str) -> Option<Self> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut bits = 0u16;
        for (class, b) in s.bytes().enumerate() {
            let digit = b - b'0';
            if digit > 7 {
                continue;
            }
            if digit & 4 != 0 {
                bits |= 1 << (class * 3);
            }
            if digit & 2 != 0 {
                bits |= 1 << (class * 3 + 1);
            }
            if digit & 1 != 0 {
                bits |= 1 << (class * 3 + 2);
            }
        }
        Some(Mode(bits))
    }

    /// Apply a symbolic expression like `g-rw` or `u=r,g=r,o=r`.
    ///
    /// The whole expression is validated before anything is applied: one
    /// malformed clause rejects the request and leaves the mode untouched.
    pub fn apply_symbolic(self, expr: &str) -> Result<Self, FsError> {
        let clauses: Vec<SymbolicClause> = expr
            .split(',')
            .map(SymbolicClause::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| FsError::InvalidArgument(format!("invalid mode: '{}'", expr)))?;

        let mut bits = self.0;
        for clause in &clauses {
            for &class in &clause.classes {
                let offset = class.offset();
                match clause.op {
                    b'=' => {
                        bits &= !(0b111 << offset);
                        bits |= clause.rights << offset;
                    }
                    b'+' => bits |= clause.rights << offset,
                    _ => bits &= !(clause.rights << offset),
                }
            }
        }
        Ok(Mode(bits))
    }

    /// Whether the given class holds the given bit.
    pub fn allows(self, class: AccessClass, perm: Perm) -> bool {
        self.0 & (1 << (class.offset() + perm.index())) != 0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &c) in MODE_CHARS.iter().enumerate() {
            f.write_str(if self.0 & (1 << i) != 0 {
                match c {
                    'r' => "r",
                    'w' => "w",
                    _ => "x",
                }
            } else {
                "-"
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mode({})", self)
    }
}

impl From<String> for Mode {
    fn from(s: String) -> Self {
        Mode::from_display(&s)
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

/// One parsed clause of a symbolic mode expression: `[ugoa]*[+-=][rwx]+`.
struct SymbolicClause {
    classes: Vec<AccessClass>,
    op: u8,
    /// Rights as a 3-bit triplet (r=bit0, w=bit1, x=bit2).
    rights: u16,
}

impl SymbolicClause {
    fn parse(clause: &str) -> Option<Self> {
        let bytes = clause.as_bytes();
        let op_pos = bytes.iter().position(|b| matches!(b, b'+' | b'-' | b'='))?;
        let (who, rest) = (&bytes[..op_pos], &bytes[op_pos + 1..]);
        if rest.is_empty() {
            return None;
        }

        let mut rights = 0u16;
        for &b in rest {
            match b {
                b'r' => rights |= 0b001,
                b'w' => rights |= 0b010,
                b'x' => rights |= 0b100,
                _ => return None,
            }
        }

        // `a` or an empty who-list addresses all three classes.
        let mut classes = Vec::new();
        if who.is_empty() || who.contains(&b'a') {
            classes.extend([AccessClass::Owner, AccessClass::Group, AccessClass::Other]);
        } else {
            for &b in who {
                let class = match b {
                    b'u' => AccessClass::Owner,
                    b'g' => AccessClass::Group,
                    b'o' => AccessClass::Other,
                    _ => return None,
                };
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }

        Some(SymbolicClause {
            classes,
            op: bytes[op_pos],
            rights,
        })
    }
}

// =============================================================================
// Identity and evaluation
// =============================================================================

/// The acting identity: a username plus every group it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub groups: BTreeSet<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, groups: impl IntoIterator<Item = String>) -> Self {
        Self {
            username: username.into(),
            groups: groups.into_iter().collect(),
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.username == SUPERUSER
    }
}

/// Which mode triplet applies to `identity` against a node owned by
/// `owner`/`group`.
pub fn effective_class(owner: &str, group: &str, identity: &Identity) -> AccessClass {
    if identity.is_superuser() || owner == identity.username {
        AccessClass::Owner
    } else if identity.groups.contains(group) {
        AccessClass::Group
    } else {
        AccessClass::Other
    }
}

/// Whether `identity` holds `perm` on a node. The superuser always does.
pub fn has_permission(mode: Mode, owner: &str, group: &str, identity: &Identity, perm: Perm) -> bool {
    if identity.is_superuser() {
        return true;
    }
    mode.allows(effective_class(owner, group, identity), perm)
}
