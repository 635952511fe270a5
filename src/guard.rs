//! Scoped executable mappings.
//!
//! [`ExecGuard`] holds a region in an executable state for the guard's
//! lifetime and reverts it to writable on drop. Useful for patch cycles
//! where code is rewritten between runs; the one-shot token in
//! [`crate::protect`] covers the fire-and-forget case.

use crate::error::Error;
use crate::invoke::enter_checked;
use crate::protect::{self, ProtectionState};
use crate::region::{CodeBlob, MemoryRegion};

/// A region held executable until the guard is dropped.
///
/// Unlike [`crate::protect::ExecToken`] this is reusable: any number of
/// blobs inside the region may be entered while the guard lives.
#[derive(Debug)]
pub struct ExecGuard {
    region: MemoryRegion,
}

impl ExecGuard {
    /// Transition `region` to an executable `state` and hold it there.
    /// Requesting [`ProtectionState::Writable`] is a usage error.
    ///
    /// # Safety
    /// Same contract as [`crate::protect::transition`].
    pub unsafe fn acquire(region: MemoryRegion, state: ProtectionState) -> Result<Self, Error> {
        if !state.is_executable() {
            return Err(Error::NonExecutableTarget { state });
        }
        unsafe { protect::transition(region, state)? };
        Ok(ExecGuard { region })
    }

    /// The region this guard holds executable.
    #[inline]
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    /// Transfer control to a blob inside the guarded region.
    ///
    /// # Safety
    /// Same contract as [`crate::invoke::enter`].
    pub unsafe fn enter(&self, blob: &CodeBlob) -> Result<(), Error> {
        unsafe { enter_checked(self.region, blob) }
    }
}

impl Drop for ExecGuard {
    fn drop(&mut self) {
        // Drop has no error channel; a failed revert leaves the region
        // executable, which the caller can still fix by hand.
        let _ = unsafe { protect::transition(self.region, ProtectionState::Writable) };
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::region::PageSize;
    use std::ptr;

    struct PageBuf {
        ptr: *mut u8,
        len: usize,
    }

    impl PageBuf {
        fn new(len: usize) -> PageBuf {
            let ptr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            assert_ne!(ptr, libc::MAP_FAILED, "mmap failed");
            PageBuf {
                ptr: ptr as *mut u8,
                len,
            }
        }
    }

    impl Drop for PageBuf {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr as *mut _, self.len);
            }
        }
    }

    #[test]
    fn test_acquire_rejects_writable_target() {
        let page = PageSize::host().unwrap();
        let buf = PageBuf::new(page.get());
        let blob = CodeBlob::new(buf.ptr, 1).unwrap();
        let region = MemoryRegion::enclosing(&blob, page);

        let err = unsafe { ExecGuard::acquire(region, ProtectionState::Writable) }.unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_guard_reverts_on_drop() {
        let page = PageSize::host().unwrap();
        let buf = PageBuf::new(page.get());
        let blob = CodeBlob::new(buf.ptr, 1).unwrap();
        let region = MemoryRegion::enclosing(&blob, page);

        {
            let guard =
                unsafe { ExecGuard::acquire(region, ProtectionState::ExecutableReadable) }
                    .unwrap();
            assert_eq!(guard.region(), region);
        }
        // Reverted to writable: storing through the pointer must not fault.
        unsafe { buf.ptr.write(0x90) };
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_guard_allows_repeated_entry() {
        let page = PageSize::host().unwrap();
        let buf = PageBuf::new(page.get());
        unsafe { buf.ptr.write(0xC3) }; // ret

        let blob = CodeBlob::new(buf.ptr, 1).unwrap();
        let region = MemoryRegion::enclosing(&blob, page);
        let guard =
            unsafe { ExecGuard::acquire(region, ProtectionState::ExecutableReadable) }.unwrap();

        unsafe { guard.enter(&blob) }.expect("first entry");
        unsafe { guard.enter(&blob) }.expect("second entry");
    }

    #[test]
    fn test_guard_rejects_blob_outside_region() {
        let page = PageSize::host().unwrap();
        let buf = PageBuf::new(page.get());
        let other = PageBuf::new(page.get());

        let blob = CodeBlob::new(buf.ptr, 1).unwrap();
        let region = MemoryRegion::enclosing(&blob, page);
        let guard =
            unsafe { ExecGuard::acquire(region, ProtectionState::ExecutableReadable) }.unwrap();

        let stray = CodeBlob::new(other.ptr, 1).unwrap();
        let err = unsafe { guard.enter(&stray) }.unwrap_err();
        assert!(matches!(err, Error::EntryOutsideRegion { .. }));
    }
}
