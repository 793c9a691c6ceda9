//=========================================================================
// Reference-Counted Handles
//=========================================================================
//
// Shared ownership for objects that own GPU resources.
//
//   Ref<T>      owning handle, +1 on clone, -1 on drop
//   WeakRef<T>  non-owning handle, promoted with upgrade()
//
// Destruction is synchronous: the object is dropped on the thread and at
// the point where the last Ref goes away. Queued commands capture Refs to
// keep their targets alive until the command's payload is consumed.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

//=== RefCounted ==========================================================

/// Marker trait for objects managed through [`Ref`] / [`WeakRef`].
///
/// Automatically implemented for all types that are Send + Sync + 'static,
/// which is what a queued command needs to carry a handle to the render
/// thread.
pub trait RefCounted: Send + Sync + 'static {}

// Blanket implementation
impl<T: ?Sized + Send + Sync + 'static> RefCounted for T {}

//=== Ref =================================================================

/// Owning handle to a reference-counted object.
///
/// Cloning increments the count and dropping decrements it; when the count
/// reaches zero the object is dropped immediately. Moving a `Ref` moves
/// ownership without touching the count. A nullable handle is an
/// `Option<Ref<T>>`, and `Option::take` is the move-out-and-null operation.
///
/// Like `Arc`, queries are associated functions (`Ref::ref_count(&r)`) so
/// they never shadow methods of `T` reached through `Deref`.
pub struct Ref<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: RefCounted> Ref<T> {
    /// Takes ownership of `value`; the new handle is the only owner.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl<T: ?Sized> Ref<T> {
    /// Adopts an existing `Arc` without changing its count.
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// Number of live owning handles to the object.
    pub fn ref_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Creates a non-owning handle. The count is unchanged.
    pub fn downgrade(this: &Self) -> WeakRef<T> {
        WeakRef {
            inner: Arc::downgrade(&this.inner),
        }
    }

    /// Returns true if both handles point to the same object.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Points `this` at `source`'s object.
    ///
    /// The source's count is incremented before the previous target's is
    /// decremented, so self-assignment never destroys the object.
    pub fn assign(this: &mut Self, source: &Self) {
        let incoming = Arc::clone(&source.inner);
        let _previous = std::mem::replace(&mut this.inner, incoming);
    }
}

impl<T: ?Sized> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Ref<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> AsRef<T> for Ref<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("ref_count", &Arc::strong_count(&self.inner))
            .field("value", &&*self.inner)
            .finish()
    }
}

//=== WeakRef =============================================================

/// Non-owning handle to a reference-counted object.
///
/// Holding a `WeakRef` does not keep the object alive. Promotion through
/// [`WeakRef::upgrade`] checks liveness and yields `None` once the last
/// owning handle is gone.
pub struct WeakRef<T: ?Sized> {
    inner: Weak<T>,
}

impl<T> WeakRef<T> {
    /// A handle that points at nothing and never upgrades.
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }
}

impl<T: ?Sized> WeakRef<T> {
    /// Promotes to an owning handle (+1), or `None` if the object is gone.
    pub fn upgrade(&self) -> Option<Ref<T>> {
        self.inner.upgrade().map(Ref::from_arc)
    }

    /// Number of live owning handles; 0 once the object is destroyed.
    pub fn ref_count(&self) -> usize {
        self.inner.strong_count()
    }

    /// Returns true while at least one owning handle exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T: ?Sized> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> Default for WeakRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("ref_count", &self.inner.strong_count())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts its own destructions.
    struct Tracked {
        id: u32,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(id: u32) -> (Tracked, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            Tracked {
                id,
                drops: Arc::clone(&drops),
            },
            drops,
        )
    }

    #[test]
    fn ref_count_follows_handles() {
        let (object, drops) = tracked(1);

        let original = Ref::new(object);
        assert_eq!(Ref::ref_count(&original), 1);

        let copy = original.clone();
        assert_eq!(Ref::ref_count(&original), 2);

        drop(copy);
        assert_eq!(Ref::ref_count(&original), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        let observer = Ref::downgrade(&original);
        drop(original);

        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(observer.ref_count(), 0);
        assert!(observer.upgrade().is_none());
    }

    #[test]
    fn deref_reaches_the_object() {
        let (object, _drops) = tracked(7);
        let handle = Ref::new(object);
        assert_eq!(handle.id, 7);
    }

    #[test]
    fn move_leaves_source_empty_without_count_traffic() {
        let (object, drops) = tracked(1);
        let mut slot = Some(Ref::new(object));

        let moved = slot.take().unwrap();
        assert!(slot.is_none());
        assert_eq!(Ref::ref_count(&moved), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reset_through_option_destroys_last_owner() {
        let (object, drops) = tracked(1);
        let mut slot = Some(Ref::new(object));
        assert!(slot.is_some());
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        slot = None;
        assert!(slot.is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn assign_releases_previous_target() {
        let (first, first_drops) = tracked(1);
        let (second, second_drops) = tracked(2);

        let mut handle = Ref::new(first);
        let other = Ref::new(second);

        Ref::assign(&mut handle, &other);

        assert_eq!(first_drops.load(Ordering::SeqCst), 1);
        assert_eq!(second_drops.load(Ordering::SeqCst), 0);
        assert_eq!(handle.id, 2);
        assert_eq!(Ref::ref_count(&other), 2);
        assert!(Ref::ptr_eq(&handle, &other));
    }

    #[test]
    fn self_assign_keeps_object_alive() {
        let (object, drops) = tracked(1);
        let mut handle = Ref::new(object);
        let alias = handle.clone();

        Ref::assign(&mut handle, &alias);

        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(Ref::ref_count(&handle), 2);
    }

    #[test]
    fn weak_handle_does_not_change_count() {
        let (object, _drops) = tracked(1);
        let owner = Ref::new(object);

        let weak = Ref::downgrade(&owner);
        let weak_copy = weak.clone();
        assert_eq!(Ref::ref_count(&owner), 1);
        assert_eq!(weak_copy.ref_count(), 1);

        let promoted = weak.upgrade().unwrap();
        assert_eq!(Ref::ref_count(&owner), 2);

        drop(promoted);
        assert_eq!(Ref::ref_count(&owner), 1);
    }

    #[test]
    fn promoted_handle_keeps_object_alive() {
        let (object, drops) = tracked(1);
        let owner = Ref::new(object);
        let weak = Ref::downgrade(&owner);

        let promoted = weak.upgrade().unwrap();
        drop(owner);

        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert!(weak.is_alive());

        drop(promoted);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!weak.is_alive());
    }

    #[test]
    fn empty_weak_never_upgrades() {
        let weak: WeakRef<u32> = WeakRef::default();
        assert_eq!(weak.ref_count(), 0);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn trait_objects_can_be_shared() {
        let shared: Arc<dyn Fn() -> u32 + Send + Sync> = Arc::new(|| 5);
        let handle = Ref::from_arc(shared);
        let copy = handle.clone();
        assert_eq!((*copy)(), 5);
        assert_eq!(Ref::ref_count(&handle), 2);
    }
}
