//! Error type shared by the resolver, the protection step, and the invoker.

use std::fmt;
use std::io;

use crate::protect::ProtectionState;

/// Everything that can go wrong before control is transferred.
///
/// Two kinds: usage errors (malformed input, rejected before any OS call)
/// and protection errors (the OS refused or failed the transition, with the
/// cause code it reported). Whatever happens once control is inside the
/// invoked blob is not modeled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The code blob's start address is null.
    NullBlob,
    /// The code blob has zero length.
    EmptyBlob,
    /// The page size is zero or not a power of two.
    BadPageSize { size: usize },
    /// A token or guard was requested for a state without execute permission.
    NonExecutableTarget { state: ProtectionState },
    /// The blob's byte range is not contained in the protected region.
    EntryOutsideRegion { entry: usize, base: usize, len: usize },
    /// The operating system refused or failed the permission transition.
    Protection {
        base: usize,
        len: usize,
        state: ProtectionState,
        /// Raw OS cause code (`errno` on unix, `GetLastError` on windows).
        code: i32,
    },
}

impl Error {
    /// True for malformed-input errors. These are fatal to the single call
    /// and are never worth retrying.
    #[inline]
    pub fn is_usage(&self) -> bool {
        !self.is_protection()
    }

    /// True if the operating system rejected the permission transition.
    ///
    /// Not worth retrying either: an identical request against an unchanged
    /// region fails identically.
    #[inline]
    pub fn is_protection(&self) -> bool {
        matches!(self, Error::Protection { .. })
    }

    /// The OS-supplied cause code, if this is a protection error.
    #[inline]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::Protection { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NullBlob => write!(f, "code blob address is null"),
            Error::EmptyBlob => write!(f, "code blob length is zero"),
            Error::BadPageSize { size } => {
                write!(f, "page size {:#x} is not a positive power of two", size)
            }
            Error::NonExecutableTarget { state } => {
                write!(f, "target state {:?} does not grant execute permission", state)
            }
            Error::EntryOutsideRegion { entry, base, len } => write!(
                f,
                "entry point {:#x} lies outside protected region {:#x}..{:#x}",
                entry,
                base,
                base + len
            ),
            Error::Protection {
                base,
                len,
                state,
                code,
            } => write!(
                f,
                "permission transition to {:?} failed for region {:#x}+{:#x}: {}",
                state,
                base,
                len,
                io::Error::from_raw_os_error(*code)
            ),
        }
    }
}

impl std::error::Error for Error {}
