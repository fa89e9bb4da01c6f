use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A stable reference to a slot in a [`Pool`](crate::Pool) of `T`.
///
/// Handles are plain indices tagged with the generation of the slot they
/// were handed out for: copying one never keeps the object alive, and a
/// handle to a released slot stays dead after the slot is reused.
/// Reachability is decided only by what the root provider reports.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// A handle to the first generation of slot `index`.
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self::new(index, 0)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
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
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "Handle({})", self.index)
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}
