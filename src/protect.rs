//! Permission transitions: the one place this crate talks to the OS.
//!
//! A transition asks the platform to change the access rights of a resolved
//! [`MemoryRegion`] (`mprotect` on unix, `VirtualProtect` on windows). It is
//! the only fallible step in the pipeline, and failure is final: the OS
//! reports a cause code, nothing is rolled back, and an identical retry
//! against an unchanged region would fail identically.
//!
//! No current protection state is cached here. Every request is absolute and
//! judged against the OS's own record; requesting the state a region is
//! already in succeeds again.

use crate::error::Error;
use crate::region::MemoryRegion;

// =============================================================================
// Protection State
// =============================================================================

/// Access-right combinations a region may be transitioned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    /// Readable and writable, not executable. The state for code emission
    /// and patching.
    Writable,
    /// Readable and executable, not writable.
    ExecutableReadable,
    /// Executable only.
    ExecutableOnly,
}

impl ProtectionState {
    /// Whether this state permits instruction fetch.
    #[inline]
    pub fn is_executable(self) -> bool {
        !matches!(self, ProtectionState::Writable)
    }
}

// =============================================================================
// Platform-specific permission change
// =============================================================================

#[cfg(unix)]
mod platform {
    use super::ProtectionState;

    fn prot_flags(state: ProtectionState) -> libc::c_int {
        match state {
            ProtectionState::Writable => libc::PROT_READ | libc::PROT_WRITE,
            ProtectionState::ExecutableReadable => libc::PROT_READ | libc::PROT_EXEC,
            ProtectionState::ExecutableOnly => libc::PROT_EXEC,
        }
    }

    /// Change page protections for `[base, base + len)`.
    ///
    /// On failure returns the `errno` the kernel set.
    pub unsafe fn protect(base: *mut u8, len: usize, state: ProtectionState) -> Result<(), i32> {
        let rc = unsafe { libc::mprotect(base as *mut libc::c_void, len, prot_flags(state)) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::ProtectionState;
    use windows_sys::Win32::System::Memory::{
        VirtualProtect, PAGE_EXECUTE, PAGE_EXECUTE_READ, PAGE_READWRITE,
    };

    fn prot_flags(state: ProtectionState) -> u32 {
        match state {
            ProtectionState::Writable => PAGE_READWRITE,
            ProtectionState::ExecutableReadable => PAGE_EXECUTE_READ,
            ProtectionState::ExecutableOnly => PAGE_EXECUTE,
        }
    }

    /// Change page protections for `[base, base + len)`.
    ///
    /// On failure returns the `GetLastError` code.
    pub unsafe fn protect(base: *mut u8, len: usize, state: ProtectionState) -> Result<(), i32> {
        let mut old_protect = 0;
        let ok = unsafe {
            VirtualProtect(base as *mut _, len, prot_flags(state), &mut old_protect)
        };
        if ok != 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
        }
    }
}

// =============================================================================
// Transition
// =============================================================================

/// Request the OS change `region` to `state`.
///
/// This mutates page-table state shared with every other thread in the
/// process and is not undone on failure or after use; restoring previous
/// permissions is the caller's decision. Concurrent transitions against
/// overlapping regions are not ordered by this crate; serialize externally.
///
/// # Safety
/// The caller must be entitled to change protections on every page of
/// `region`: the pages are mapped, owned by the caller for this purpose, and
/// nothing else in the process relies on their current permissions.
pub unsafe fn transition(region: MemoryRegion, state: ProtectionState) -> Result<(), Error> {
    let result = unsafe { platform::protect(region.base() as *mut u8, region.len(), state) };
    result.map_err(|code| Error::Protection {
        base: region.base(),
        len: region.len(),
        state,
        code,
    })
}

/// A proof that a transition to an executable state succeeded for a region.
///
/// Minted only by [`make_executable`]; not cloneable; consumed by
/// [`crate::invoke::enter`]. Holding one guarantees the ordering
/// resolve -> protect -> enter was respected for that exact region.
#[derive(Debug)]
pub struct ExecToken {
    region: MemoryRegion,
}

impl ExecToken {
    /// The region this token covers.
    #[inline]
    pub fn region(&self) -> MemoryRegion {
        self.region
    }
}

/// Transition `region` to an executable `state` and mint the token proving
/// it. Requesting [`ProtectionState::Writable`] is a usage error.
///
/// # Safety
/// Same contract as [`transition`].
pub unsafe fn make_executable(
    region: MemoryRegion,
    state: ProtectionState,
) -> Result<ExecToken, Error> {
    if !state.is_executable() {
        return Err(Error::NonExecutableTarget { state });
    }
    unsafe { transition(region, state)? };
    Ok(ExecToken { region })
}

// =============================================================================
// Tests
// =============================================================================
