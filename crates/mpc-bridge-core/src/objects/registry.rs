//! Slot arena for handing objects across the boundary.
//!
//! A [`Handle`] is an index plus a generation counter. Freeing a slot bumps
//! its generation, so a stale handle (use after free, double free) is
//! rejected instead of reaching another object. Handles are typed per object
//! kind; raw value 0 is the null handle.

use crate::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

/// Typed reference into a [`Registry`]
pub struct Handle<T> {
    raw: u64,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle
    pub const NULL: Self = Self {
        raw: 0,
        _kind: PhantomData,
    };

    fn new(index: u32, generation: u32) -> Self {
        Self {
            raw: (u64::from(generation) << 32) | u64::from(index + 1),
            _kind: PhantomData,
        }
    }

    /// Rebuild from a raw value received across the boundary
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    pub fn to_raw(self) -> u64 {
        self.raw
    }

    pub fn is_null(self) -> bool {
        self.raw == 0
    }

    fn index(self) -> Option<usize> {
        let slot = (self.raw & 0xffff_ffff) as usize;
        slot.checked_sub(1)
    }

    fn generation(self) -> u32 {
        (self.raw >> 32) as u32
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.raw)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

/// Arena of shared, immutable objects of one kind
pub struct Registry<T> {
    name: &'static str,
    inner: Mutex<Slots<T>>,
}

impl<T> Registry<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Slots {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` and hand out a fresh handle
    pub fn insert(&self, value: T) -> Handle<T> {
        let mut inner = self.lock();
        inner.live += 1;
        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.value = Some(Arc::new(value));
            return Handle::new(index, slot.generation);
        }
        let index = inner.slots.len() as u32;
        inner.slots.push(Slot {
            generation: 0,
            value: Some(Arc::new(value)),
        });
        Handle::new(index, 0)
    }

    fn stale(&self, handle: Handle<T>) -> Error {
        Error::BadArgument(format!("stale or invalid {} handle {handle:?}", self.name))
    }

    /// Shared reference to a live object
    pub fn get(&self, handle: Handle<T>) -> Result<Arc<T>> {
        if handle.is_null() {
            return Err(Error::BadArgument(format!("null {} handle", self.name)));
        }
        let inner = self.lock();
        handle
            .index()
            .and_then(|i| inner.slots.get(i))
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.clone())
            .ok_or_else(|| self.stale(handle))
    }

    /// Release an object. A null handle is a no-op; a stale one is an error.
    pub fn remove(&self, handle: Handle<T>) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        let mut inner = self.lock();
        let index = handle.index().ok_or_else(|| self.stale(handle))?;
        let slot = match inner.slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation() && slot.value.is_some() => slot,
            _ => return Err(self.stale(handle)),
        };
        slot.value = None;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(index as u32);
        inner.live -= 1;
        Ok(())
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.lock().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
