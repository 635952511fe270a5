//! Executable memory region management for in-process code generators.
//!
//! This crate is the primitive underneath a JIT backend, a dynamic patcher,
//! or a plugin loader: take machine code that already sits in caller-owned
//! memory, make the pages it lives on executable, and transfer control into
//! it. Three steps, in strict order:
//! - Resolve: compute the page-aligned [`MemoryRegion`] enclosing a
//!   [`CodeBlob`] (pure arithmetic, see [`region`])
//! - Protect: ask the operating system to change that region to an
//!   executable [`ProtectionState`] (the only fallible step, see [`protect`])
//! - Enter: call the blob's first byte as a zero-argument procedure
//!   (see [`invoke`])
//!
//! A successful protection step mints an [`ExecToken`] for the exact region
//! it covered; [`invoke::enter`] consumes the token, so control can only be
//! transferred into a region that was actually made executable. For
//! patch-heavy callers, [`ExecGuard`] scopes the executable state and
//! reverts the region to writable on drop.
//!
//! The crate never allocates or frees pages. The blob's backing storage is
//! owned by the caller and must stay valid (not freed or reused) for as long
//! as the region remains executable.
//!
//! # Safety
//!
//! The only safety contract here is memory-protection correctness. The bytes
//! themselves are opaque: once control enters the blob, it runs with the
//! full privileges of the host process and may never return. Verifying that
//! the bytes are valid instructions is the caller's responsibility.
//!
//! # Concurrency
//!
//! Page protections are process-wide state shared with every thread. This
//! crate holds no state of its own and takes no internal locks, so
//! concurrent transitions against overlapping or adjacent regions race with
//! undefined ordering. Callers that need concurrent use must serialize
//! transition calls externally, per page or globally.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod guard;
pub mod invoke;
pub mod protect;
pub mod region;

pub use error::Error;
pub use guard::ExecGuard;
pub use invoke::enter;
pub use protect::{make_executable, transition, ExecToken, ProtectionState};
pub use region::{CodeBlob, MemoryRegion, PageSize};

/// Run the full pipeline: resolve the blob's region, make it executable,
/// and transfer control to the blob's first byte.
///
/// Any failure short-circuits before the control transfer; `Ok(())` means
/// the blob was entered and returned normally.
///
/// # Safety
/// Same contract as [`protect::make_executable`] and [`invoke::enter`]: the
/// blob must be mapped, contain valid machine code ending in a return, and
/// the caller must be entitled to change protections on every page of its
/// enclosing region.
pub unsafe fn execute(
    blob: &CodeBlob,
    page: PageSize,
    state: ProtectionState,
) -> Result<(), Error> {
    let region = MemoryRegion::enclosing(blob, page);
    let token = unsafe { protect::make_executable(region, state)? };
    unsafe { invoke::enter(token, blob) }
}
