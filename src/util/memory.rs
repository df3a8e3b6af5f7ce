//! Anonymous-mapping helpers for the heap. Every collector variant obtains
//! its backing memory through `mmap_anon`/`munmap`/`madvise_dont_need`
//! rather than the global Rust allocator.

use super::address::Address;
use std::io::Result;

/// Map `size` bytes of zeroed, anonymous, private memory with
/// `PROT_READ|PROT_WRITE`. `size` should already be page-aligned; the OS
/// will round up otherwise.
pub fn mmap_anon(size: usize) -> Result<Address> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(Address::from_mut_ptr(ptr))
    }
}

/// Unmap a region previously obtained from `mmap_anon`.
pub fn munmap(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(&|| unsafe { libc::munmap(start.to_mut_ptr(), size) }, 0)
}

/// Advise the kernel that this range is no longer needed, without
/// unmapping it, so the virtual range can be reused by a later cycle at
/// the cost of the kernel zero-filling it again on next touch. Used to
/// release a mutator's mark buffer.
pub fn madvise_dont_need(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(
        &|| unsafe { libc::madvise(start.to_mut_ptr(), size, libc::MADV_DONTNEED) },
        0,
    )
}

/// The system page size, used to round heap and mark-buffer requests up
/// to a whole number of pages.
pub fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
