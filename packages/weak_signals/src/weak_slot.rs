use std::any::type_name;
use std::fmt;
use std::mem;
use std::ptr;
use std::rc::{Rc, Weak};

use crate::{LinkKey, Observe};

/// A non-owning reference that empties itself when its target goes away.
///
/// The slot registers itself with the [`Observable`][crate::Observable] state of its target. It
/// becomes empty when:
///
/// * the target is dropped,
/// * the target releases all its observers via [`Observe::release_observers()`],
/// * the slot is [reset][Self::reset] or dropped.
///
/// Unlike a plain [`Weak`], the target always knows how many slots observe it and can empty all
/// of them at once, without waiting for its own destruction.
///
/// Slots are single-threaded. Cloning a slot registers a new, independent observation of the
/// same target.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use weak_signals::{Observable, Observe, WeakSlot};
///
/// #[derive(Default)]
/// struct Sensor {
///     observable: Observable,
/// }
///
/// impl Observe for Sensor {
///     fn observable(&self) -> &Observable {
///         &self.observable
///     }
/// }
///
/// let sensor = Rc::new(Sensor::default());
/// let slot = WeakSlot::new(&sensor);
/// assert!(slot.is_set());
///
/// sensor.release_observers();
/// assert!(!slot.is_set());
/// assert!(slot.get().is_none());
/// ```
pub struct WeakSlot<T: ?Sized + Observe> {
    link: Option<Link<T>>,
}

struct Link<T: ?Sized> {
    target: Weak<T>,
    key: LinkKey,
}

impl<T: ?Sized + Observe> WeakSlot<T> {
    /// Creates a slot that observes `target`.
    ///
    /// If this is the first observer of the target, the target is notified via
    /// [`Observe::observation_changed()`].
    #[must_use]
    pub fn new(target: &Rc<T>) -> Self {
        let (key, first) = target.observable().register();

        let slot = Self {
            link: Some(Link {
                target: Rc::downgrade(target),
                key,
            }),
        };

        if first {
            target.observation_changed();
        }

        slot
    }

    /// Creates a slot that observes nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { link: None }
    }

    /// Makes the slot observe `target` instead of whatever it observed before.
    ///
    /// The new observation is registered before the old one is released, so a target that is
    /// observed before and after the reset never sees its observer count drop to zero.
    pub fn reset(&mut self, target: Option<&Rc<T>>) {
        let mut replacement = target.map_or_else(Self::empty, Self::new);
        self.swap(&mut replacement);

        // `replacement` now holds the previous observation and releases it when dropped.
    }

    /// Exchanges the targets of two slots.
    ///
    /// Neither target is notified, as the number of observers of each target is unchanged.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.link, &mut other.link);
    }

    /// Returns the target if the slot is set.
    ///
    /// The returned [`Rc`] keeps the target alive for as long as the caller holds it.
    #[must_use]
    #[inline]
    pub fn get(&self) -> Option<Rc<T>> {
        let link = self.link.as_ref()?;
        let target = link.target.upgrade()?;

        target
            .observable()
            .is_registered(link.key)
            .then_some(target)
    }

    /// Calls `f` with the target if the slot is set.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.get().map(|target| f(&target))
    }

    /// Whether the slot currently observes a live target.
    #[must_use]
    #[inline]
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Whether the slot currently observes the object at the address of `target`.
    ///
    /// Only the address is compared, so a slot observing an object through a trait object
    /// matches a reference to the concrete object and vice versa.
    #[must_use]
    pub fn is_observing<U: ?Sized>(&self, target: &U) -> bool {
        self.get()
            .is_some_and(|observed| ptr::addr_eq(Rc::as_ptr(&observed), target))
    }

    /// Converts the slot into a slot for a different view of the same target, typically a
    /// trait object implemented by the target.
    ///
    /// The registration is transferred as-is; the target is not notified.
    ///
    /// # Panics
    ///
    /// Panics if `convert` returns a reference to a different object.
    ///
    /// # Example
    ///
    /// ```
    /// use std::rc::{Rc, Weak};
    ///
    /// use weak_signals::{Observable, Observe, WeakSlot};
    ///
    /// trait Named: Observe {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// #[derive(Default)]
    /// struct Port {
    ///     observable: Observable,
    /// }
    ///
    /// impl Observe for Port {
    ///     fn observable(&self) -> &Observable {
    ///         &self.observable
    ///     }
    /// }
    ///
    /// impl Named for Port {
    ///     fn name(&self) -> &str {
    ///         "port"
    ///     }
    /// }
    ///
    /// let port = Rc::new(Port::default());
    /// let slot: WeakSlot<dyn Named> = WeakSlot::new(&port).convert(|weak| weak as Weak<dyn Named>);
    ///
    /// assert_eq!(slot.with(|named| named.name().to_string()).as_deref(), Some("port"));
    /// ```
    #[must_use]
    pub fn convert<U: ?Sized + Observe>(
        mut self,
        convert: impl FnOnce(Weak<T>) -> Weak<U>,
    ) -> WeakSlot<U> {
        let link = self.link.take().map(|Link { target, key }| {
            let address = Weak::as_ptr(&target);
            let target = convert(target);

            assert!(
                ptr::addr_eq(address, Weak::as_ptr(&target)),
                "WeakSlot can only be converted to another view of the same target"
            );

            Link { target, key }
        });

        WeakSlot { link }
    }

    /// Forgets the current target, notifying it if this was its last observer.
    fn release(&mut self) {
        // The link is taken first so the target never sees this slot while being notified.
        let Some(link) = self.link.take() else {
            return;
        };

        // A target that can no longer be upgraded is being dropped or is gone.
        let Some(target) = link.target.upgrade() else {
            return;
        };

        if target.observable().unregister(link.key) {
            target.observation_changed();
        }
    }
}

impl<T: ?Sized + Observe> Drop for WeakSlot<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: ?Sized + Observe> Default for WeakSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + Observe> Clone for WeakSlot<T> {
    fn clone(&self) -> Self {
        self.get()
            .map_or_else(Self::empty, |target| Self::new(&target))
    }
}

impl<T: ?Sized + Observe> From<&Rc<T>> for WeakSlot<T> {
    fn from(target: &Rc<T>) -> Self {
        Self::new(target)
    }
}

impl<T, U> PartialEq<WeakSlot<U>> for WeakSlot<T>
where
    T: ?Sized + Observe,
    U: ?Sized + Observe,
{
    /// Two slots are equal if they observe the same object or are both empty.
    fn eq(&self, other: &WeakSlot<U>) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => ptr::addr_eq(Rc::as_ptr(&a), Rc::as_ptr(&b)),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized + Observe> Eq for WeakSlot<T> {}

impl<T: ?Sized + Observe> fmt::Debug for WeakSlot<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_set", &self.is_set())
            .finish_non_exhaustive()
    }
}
