//! Raw buffers handed across the boundary.
//!
//! Every buffer returned by this library is owned by the caller and must be
//! released with [`mpcb_cmem_free`] or [`mpcb_cmems_free`], which zero the
//! memory first. Buffers passed in are only borrowed for the call.

use mpc_bridge_core::{BufferArray, Error, Result};
use std::alloc::{self, Layout};
use std::os::raw::c_int;
use std::ptr;
use zeroize::Zeroize;

/// Byte buffer: `data` is null exactly when `size` is 0
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CMem {
    pub data: *mut u8,
    pub size: c_int,
}

impl CMem {
    pub const EMPTY: CMem = CMem {
        data: ptr::null_mut(),
        size: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.data.is_null() || self.size <= 0
    }
}

/// Packed array of buffers: one contiguous `data` region and `count` sizes
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CMems {
    pub count: c_int,
    pub data: *mut u8,
    pub sizes: *mut c_int,
}

impl CMems {
    pub const EMPTY: CMems = CMems {
        count: 0,
        data: ptr::null_mut(),
        sizes: ptr::null_mut(),
    };
}

/// Source of boundary allocations
pub trait Allocator: Sync {
    /// `size` bytes, or null on failure. `size` is never 0.
    fn alloc(&self, size: usize) -> *mut u8;

    /// Release memory obtained from [`Allocator::alloc`] with the same size
    ///
    /// # Safety
    /// `ptr` must come from `self.alloc(size)` and not have been released.
    unsafe fn release(&self, ptr: *mut u8, size: usize);
}

/// Process heap
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn alloc(&self, size: usize) -> *mut u8 {
        match Layout::array::<u8>(size) {
            // SAFETY: size is non-zero
            Ok(layout) => unsafe { alloc::alloc(layout) },
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn release(&self, ptr: *mut u8, size: usize) {
        if let Ok(layout) = Layout::array::<u8>(size) {
            alloc::dealloc(ptr, layout);
        }
    }
}

pub fn system() -> &'static dyn Allocator {
    &SystemAllocator
}

/// Allocator behind every buffer that crosses the boundary
#[cfg(not(test))]
pub(crate) fn boundary() -> &'static dyn Allocator {
    system()
}

#[cfg(test)]
pub(crate) fn boundary() -> &'static dyn Allocator {
    testing::installed().unwrap_or_else(system)
}

/// Copy `bytes` into a fresh buffer. Allocation failure yields
/// [`CMem::EMPTY`], which callers detect against a non-empty input.
pub fn alloc_and_copy(allocator: &dyn Allocator, bytes: &[u8]) -> CMem {
    if bytes.is_empty() {
        return CMem::EMPTY;
    }
    let Ok(size) = c_int::try_from(bytes.len()) else {
        return CMem::EMPTY;
    };
    let data = allocator.alloc(bytes.len());
    if data.is_null() {
        return CMem::EMPTY;
    }
    // SAFETY: data holds bytes.len() writable bytes
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len()) };
    CMem { data, size }
}

/// Copy a packed array. An array with no elements yields [`CMems::EMPTY`].
pub fn alloc_and_copy_vector(allocator: &dyn Allocator, array: &BufferArray) -> Result<CMems> {
    if array.is_empty() {
        return Ok(CMems::EMPTY);
    }
    let count = c_int::try_from(array.len())
        .map_err(|_| Error::BadArgument("too many buffers".into()))?;
    let sizes: Vec<c_int> = array
        .lengths()
        .iter()
        .map(|len| c_int::try_from(*len))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::BadArgument("buffer too large".into()))?;

    let data = alloc_and_copy(allocator, array.data());
    if data.is_empty() && !array.data().is_empty() {
        return Err(Error::AllocationFailed);
    }
    let size_bytes: Vec<u8> = sizes.iter().flat_map(|s| s.to_ne_bytes()).collect();
    let sizes_mem = alloc_and_copy(allocator, &size_bytes);
    if sizes_mem.is_empty() {
        // SAFETY: data was allocated above by the same allocator
        unsafe { free_with(allocator, data) };
        return Err(Error::AllocationFailed);
    }
    Ok(CMems {
        count,
        data: data.data,
        sizes: sizes_mem.data.cast(),
    })
}

/// Zero and release a buffer
///
/// # Safety
/// `mem` must have been produced by `allocator` and not released yet.
pub(crate) unsafe fn free_with(allocator: &dyn Allocator, mem: CMem) {
    if mem.is_empty() {
        return;
    }
    let size = mem.size as usize;
    std::slice::from_raw_parts_mut(mem.data, size).zeroize();
    allocator.release(mem.data, size);
}

/// Zero and release a packed array
///
/// # Safety
/// `mems` must have been produced by `allocator` and not released yet.
pub(crate) unsafe fn free_array_with(allocator: &dyn Allocator, mems: CMems) {
    if mems.count <= 0 || mems.sizes.is_null() {
        return;
    }
    let count = mems.count as usize;
    let sizes = std::slice::from_raw_parts(mems.sizes, count);
    let total: usize = sizes.iter().map(|s| (*s).max(0) as usize).sum();
    free_with(
        allocator,
        CMem {
            data: mems.data,
            size: total as c_int,
        },
    );
    free_with(
        allocator,
        CMem {
            data: mems.sizes.cast(),
            size: (count * std::mem::size_of::<c_int>()) as c_int,
        },
    );
}

/// Borrow the bytes of a caller buffer
///
/// # Safety
/// A non-null `mem.data` must point at `mem.size` readable bytes.
pub(crate) unsafe fn borrow<'a>(mem: CMem) -> Result<&'a [u8]> {
    if mem.size < 0 {
        return Err(Error::BadArgument(format!("negative buffer size {}", mem.size)));
    }
    if mem.data.is_null() {
        if mem.size != 0 {
            return Err(Error::BadArgument("null buffer with non-zero size".into()));
        }
        return Ok(&[]);
    }
    Ok(std::slice::from_raw_parts(mem.data, mem.size as usize))
}

/// Borrow every element of a caller array
///
/// # Safety
/// `mems` must describe `count` sizes and a data region of their total length.
pub(crate) unsafe fn borrow_array<'a>(mems: CMems) -> Result<Vec<&'a [u8]>> {
    if mems.count < 0 {
        return Err(Error::BadArgument(format!("negative buffer count {}", mems.count)));
    }
    if mems.count == 0 {
        return Ok(Vec::new());
    }
    if mems.sizes.is_null() {
        return Err(Error::BadArgument("null size array".into()));
    }
    let sizes = std::slice::from_raw_parts(mems.sizes, mems.count as usize);
    let mut offset = 0usize;
    let mut out = Vec::with_capacity(sizes.len());
    for size in sizes {
        let size = usize::try_from(*size)
            .map_err(|_| Error::BadArgument(format!("negative element size {size}")))?;
        if size > 0 && mems.data.is_null() {
            return Err(Error::BadArgument("null data with non-zero sizes".into()));
        }
        out.push(if size == 0 {
            &[][..]
        } else {
            std::slice::from_raw_parts(mems.data.add(offset), size)
        });
        offset += size;
    }
    Ok(out)
}

/// Outputs of one call, released together unless committed.
///
/// Buffers are staged here and reach the caller's out-parameters only in
/// [`Outputs::commit`], so a failed call never leaves a pointer behind. Any
/// failure drops the guard, which zeroes and frees everything staged so far
/// through the same path as [`mpcb_cmem_free`].
pub(crate) struct Outputs<'a> {
    allocator: &'a dyn Allocator,
    mems: Vec<(*mut CMem, CMem)>,
    arrays: Vec<(*mut CMems, CMems)>,
}

impl<'a> Outputs<'a> {
    pub(crate) fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            mems: Vec::new(),
            arrays: Vec::new(),
        }
    }

    /// Stage a copy of `bytes` for `out`
    pub(crate) fn mem(&mut self, out: *mut CMem, bytes: &[u8]) -> Result<()> {
        let mem = alloc_and_copy(self.allocator, bytes);
        if mem.is_empty() && !bytes.is_empty() {
            return Err(Error::AllocationFailed);
        }
        self.mems.push((out, mem));
        Ok(())
    }

    /// Stage a copy of `array` for `out`
    pub(crate) fn array(&mut self, out: *mut CMems, array: &BufferArray) -> Result<()> {
        let mems = alloc_and_copy_vector(self.allocator, array)?;
        self.arrays.push((out, mems));
        Ok(())
    }

    /// Write every staged output and hand its ownership to the caller
    ///
    /// # Safety
    /// Every non-null `out` passed to [`Outputs::mem`] or [`Outputs::array`]
    /// must still be writable.
    pub(crate) unsafe fn commit(mut self) {
        for (out, mem) in self.mems.drain(..) {
            if !out.is_null() {
                out.write(mem);
            }
        }
        for (out, mems) in self.arrays.drain(..) {
            if !out.is_null() {
                out.write(mems);
            }
        }
    }
}

impl Drop for Outputs<'_> {
    fn drop(&mut self) {
        for (_, mem) in self.mems.drain(..) {
            // SAFETY: allocated by this guard and never handed out
            unsafe { free_with(self.allocator, mem) };
        }
        for (_, mems) in self.arrays.drain(..) {
            // SAFETY: as above
            unsafe { free_array_with(self.allocator, mems) };
        }
    }
}

/// Copy `size` bytes into a library-owned buffer, for transport callbacks
/// that return received messages.
///
/// # Safety
/// `data` must point at `size` readable bytes, or be null with `size` 0.
#[no_mangle]
pub unsafe extern "C" fn mpcb_cmem_new(data: *const u8, size: c_int) -> CMem {
    match borrow(CMem {
        data: data.cast_mut(),
        size,
    }) {
        Ok(bytes) => alloc_and_copy(boundary(), bytes),
        Err(_) => CMem::EMPTY,
    }
}

/// Copy a packed array into library-owned memory, for `receive_all` callbacks
///
/// # Safety
/// `sizes` must hold `count` entries and `data` their total length.
#[no_mangle]
pub unsafe extern "C" fn mpcb_cmems_new(
    count: c_int,
    data: *const u8,
    sizes: *const c_int,
) -> CMems {
    let borrowed = borrow_array(CMems {
        count,
        data: data.cast_mut(),
        sizes: sizes.cast_mut(),
    });
    let Ok(items) = borrowed else {
        return CMems::EMPTY;
    };
    // An all-empty array packs to count 0, the same as no elements
    let array = BufferArray::pack(items);
    alloc_and_copy_vector(boundary(), &array).unwrap_or(CMems::EMPTY)
}

/// Zero and release a buffer returned by this library. Empty buffers are ignored.
///
/// # Safety
/// `mem` must come from this library and not have been released yet.
#[no_mangle]
pub unsafe extern "C" fn mpcb_cmem_free(mem: CMem) {
    free_with(boundary(), mem);
}

/// Zero and release an array returned by this library
///
/// # Safety
/// `mems` must come from this library and not have been released yet.
#[no_mangle]
pub unsafe extern "C" fn mpcb_cmems_free(mems: CMems) {
    free_array_with(boundary(), mems);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::sync::Mutex;

    thread_local! {
        static INSTALLED: Cell<Option<&'static dyn Allocator>> = const { Cell::new(None) };
    }

    pub(super) fn installed() -> Option<&'static dyn Allocator> {
        INSTALLED.with(Cell::get)
    }

    /// Route this thread's boundary allocations through `allocator` while `f` runs
    pub(crate) fn with_allocator<T>(allocator: &'static dyn Allocator, f: impl FnOnce() -> T) -> T {
        struct Reset;
        impl Drop for Reset {
            fn drop(&mut self) {
                INSTALLED.with(|slot| slot.set(None));
            }
        }
        INSTALLED.with(|slot| slot.set(Some(allocator)));
        let _reset = Reset;
        f()
    }

    /// A counting allocator that lives for the rest of the test binary
    pub(crate) fn leaked(fail_at: Option<usize>) -> &'static CountingAllocator {
        Box::leak(Box::new(CountingAllocator::new(fail_at)))
    }

    /// Counts live allocations, checks zeroing on release and fails the
    /// `fail_at`-th allocation.
    pub(crate) struct CountingAllocator {
        fail_at: Option<usize>,
        state: Mutex<State>,
    }

    #[derive(Default)]
    struct State {
        calls: usize,
        live: HashMap<usize, usize>,
        zeroed_on_release: bool,
    }

    impl CountingAllocator {
        pub(crate) fn new(fail_at: Option<usize>) -> Self {
            Self {
                fail_at,
                state: Mutex::new(State {
                    zeroed_on_release: true,
                    ..State::default()
                }),
            }
        }

        pub(crate) fn live(&self) -> usize {
            self.state.lock().unwrap().live.len()
        }

        pub(crate) fn all_zeroed(&self) -> bool {
            self.state.lock().unwrap().zeroed_on_release
        }
    }

    impl Allocator for CountingAllocator {
        fn alloc(&self, size: usize) -> *mut u8 {
            let mut state = self.state.lock().unwrap();
            let call = state.calls;
            state.calls += 1;
            if self.fail_at == Some(call) {
                return ptr::null_mut();
            }
            let ptr = SystemAllocator.alloc(size);
            state.live.insert(ptr as usize, size);
            ptr
        }

        unsafe fn release(&self, ptr: *mut u8, size: usize) {
            let mut state = self.state.lock().unwrap();
            let bytes = std::slice::from_raw_parts(ptr, size);
            if bytes.iter().any(|b| *b != 0) {
                state.zeroed_on_release = false;
            }
            assert_eq!(state.live.remove(&(ptr as usize)), Some(size));
            SystemAllocator.release(ptr, size);
        }
    }
}
