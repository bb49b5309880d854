use std::cell::RefCell;
use std::marker::PhantomData;

use crate::{LinkChain, LinkKey};

/// Tracks the [`WeakSlot`][crate::WeakSlot]s that observe the object embedding it.
///
/// Any type can become observable by embedding an `Observable` field and implementing
/// [`Observe`] to expose it. The observer chain belongs to the identity of the object, not to
/// its value: cloning an `Observable` yields a new, unobserved instance and the existing slots
/// keep observing the original.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use weak_signals::{Observable, Observe, WeakSlot};
///
/// #[derive(Clone, Default)]
/// struct Document {
///     observable: Observable,
/// }
///
/// impl Observe for Document {
///     fn observable(&self) -> &Observable {
///         &self.observable
///     }
/// }
///
/// let document = Rc::new(Document::default());
/// let slot = WeakSlot::new(&document);
/// assert!(document.is_observed());
///
/// // The copy starts with no observers.
/// let copy = Rc::new((*document).clone());
/// assert!(!copy.is_observed());
///
/// drop(document);
/// assert!(!slot.is_set());
/// ```
#[derive(Debug, Default)]
pub struct Observable {
    observers: RefCell<LinkChain<()>>,

    _single_threaded: PhantomData<*const ()>,
}

impl Observable {
    /// Creates an observable state with no observers.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one slot observes this instance.
    #[must_use]
    #[inline]
    pub fn is_observed(&self) -> bool {
        !self.observers.borrow().is_empty()
    }

    /// The number of slots observing this instance.
    #[must_use]
    #[inline]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Registers a new observer, returning its key and whether it is the first observer.
    pub(crate) fn register(&self) -> (LinkKey, bool) {
        let mut observers = self.observers.borrow_mut();
        let first = observers.is_empty();

        (observers.insert_at_head(()), first)
    }

    /// Unregisters an observer, returning whether it was the last one.
    ///
    /// Unregistering a key that is no longer registered does nothing and returns `false`.
    pub(crate) fn unregister(&self, key: LinkKey) -> bool {
        let mut observers = self.observers.borrow_mut();

        observers.unlink(key).is_some() && observers.is_empty()
    }

    pub(crate) fn is_registered(&self, key: LinkKey) -> bool {
        self.observers.borrow().is_linked(key)
    }

    /// Unregisters every observer, returning whether there were any.
    pub(crate) fn release_all(&self) -> bool {
        self.observers.borrow_mut().clear() > 0
    }
}

impl Clone for Observable {
    /// Observation belongs to the identity of an object, so the clone starts unobserved.
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Exposes the [`Observable`] state of an object, making it a valid [`WeakSlot`] target.
///
/// [`WeakSlot`]: crate::WeakSlot
pub trait Observe {
    /// The observer tracking state embedded in this object.
    fn observable(&self) -> &Observable;

    /// Called when the object gains its first observer or loses its last one.
    ///
    /// Intermediate changes in the number of observers are not reported. The hook is not called
    /// for observers released while the object is being dropped.
    ///
    /// Implementations must not panic, as the hook is called while dropping slots.
    fn observation_changed(&self) {}

    /// Whether at least one slot observes this object.
    fn is_observed(&self) -> bool {
        self.observable().is_observed()
    }

    /// Empties every slot that observes this object.
    ///
    /// Calls [`observation_changed()`][Self::observation_changed] once at the end if there were
    /// any observers.
    fn release_observers(&self) {
        if self.observable().release_all() {
            self.observation_changed();
        }
    }
}
