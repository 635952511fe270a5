//! Control transfer into a protected region.
//!
//! The invoker treats the blob's first byte as the entry point of a
//! zero-argument, no-return-value procedure and calls it with the platform's
//! standard C calling convention. It validates nothing about the bytes; its
//! whole contract is "jump there, and if control comes back, resume the
//! caller".

use std::mem;

use crate::error::Error;
use crate::protect::ExecToken;
use crate::region::{CodeBlob, MemoryRegion};

/// Entry signature: zero arguments, no return value.
type Entry = unsafe extern "C" fn();

pub(crate) unsafe fn enter_checked(region: MemoryRegion, blob: &CodeBlob) -> Result<(), Error> {
    if !region.contains(blob) {
        return Err(Error::EntryOutsideRegion {
            entry: blob.start(),
            base: region.base(),
            len: region.len(),
        });
    }
    let entry: Entry = unsafe { mem::transmute::<*const u8, Entry>(blob.addr()) };
    unsafe { entry() };
    Ok(())
}

/// Transfer control to the blob's first byte, consuming the token that
/// proves its region was made executable.
///
/// The blob must lie inside the token's region; a mismatch is a usage error
/// reported before any control transfer. `Ok(())` means the blob was entered
/// and returned normally; every `Err` means it was never entered. There is
/// no supervision once control is inside: the blob may run forever,
/// terminate the process, or trash the caller's state.
///
/// # Safety
/// The blob must contain valid machine code for the host architecture that
/// either never returns or returns via the platform's ordinary return
/// sequence with the stack balanced. The blob's backing storage must still
/// be mapped and executable, which the token attests for the moment it was
/// minted; the caller must not have changed protections since.
pub unsafe fn enter(token: ExecToken, blob: &CodeBlob) -> Result<(), Error> {
    unsafe { enter_checked(token.region(), blob) }
}
