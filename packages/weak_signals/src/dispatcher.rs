use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::signal::Outgoing;
use crate::{
    DispatcherBuilder, Observable, Observe, PackedSignal, SignalError, SignalResult, Transmitter,
    WeakSlot,
};

/// Broadcasts signals to every attached listener of type `L`.
///
/// Listeners are attached as [transmitters][Transmitter] and are observed weakly: the dispatcher
/// never keeps a listener alive, and a listener that is dropped is skipped from then on.
///
/// Broadcasting is reentrant. While a signal is being sent, listeners may attach or detach
/// listeners, reset the dispatcher, start new broadcasts on it or drop it altogether (via a
/// [`DispatcherRef`] obtained from [`handle()`][Self::handle]):
///
/// * listeners attached during a broadcast receive the signal later in the same broadcast,
/// * listeners detached before being reached do not receive it,
/// * if the dispatcher is dropped, the broadcast stops and reports `Ok(false)`.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use weak_signals::{Dispatcher, Observable, Observe, SignalResult, Transmitter};
///
/// trait Doorbell {
///     fn ring(&self, times: u32) -> SignalResult;
/// }
///
/// #[derive(Default)]
/// struct Butler {
///     observable: Observable,
///     rings: Cell<u32>,
/// }
///
/// impl Doorbell for Butler {
///     fn ring(&self, times: u32) -> SignalResult {
///         self.rings.set(self.rings.get() + times);
///         Ok(())
///     }
/// }
///
/// impl Observe for Butler {
///     fn observable(&self) -> &Observable {
///         &self.observable
///     }
/// }
///
/// impl Transmitter<dyn Doorbell> for Butler {
///     fn receiver(&self) -> Option<&(dyn Doorbell + 'static)> {
///         Some(self)
///     }
/// }
///
/// let dispatcher = Dispatcher::<dyn Doorbell>::new();
/// let butler = Rc::new(Butler::default());
///
/// dispatcher.attach(&butler);
/// assert!(dispatcher.send(|listener| listener.ring(2)).unwrap());
/// assert_eq!(butler.rings.get(), 2);
///
/// drop(butler);
/// assert!(dispatcher.is_empty());
/// ```
pub struct Dispatcher<L: ?Sized + 'static> {
    core: Rc<DispatchCore<L>>,
}

impl<L: ?Sized + 'static> Dispatcher<L> {
    /// Creates a dispatcher with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a dispatcher with custom settings.
    pub fn builder() -> DispatcherBuilder<L> {
        DispatcherBuilder::new()
    }

    pub(crate) fn from_builder(name: Option<&'static str>, capacity: usize) -> Self {
        Self {
            core: Rc::new(DispatchCore::new(name, capacity)),
        }
    }

    /// The name given to the dispatcher via [`DispatcherBuilder::name()`], if any.
    #[must_use]
    #[inline]
    pub fn name(&self) -> Option<&'static str> {
        self.core.name
    }

    /// The number of attachments the dispatcher can hold without reallocating.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.transmitters.borrow().capacity()
    }

    /// Returns a non-owning handle to the dispatcher.
    ///
    /// The handle offers the same operations as the dispatcher itself and is what listeners use
    /// to operate on the dispatcher from inside a broadcast, including dropping it.
    #[must_use]
    #[inline]
    pub fn handle(&self) -> DispatcherRef<L> {
        DispatcherRef {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Attaches a transmitter, which receives every signal sent from now on.
    ///
    /// Attaching the same transmitter twice creates two independent attachments and the
    /// transmitter receives each signal twice.
    #[inline]
    pub fn attach<T>(&self, transmitter: &Rc<T>)
    where
        T: Transmitter<L> + 'static,
    {
        let transmitter: Rc<dyn Transmitter<L>> = Rc::<T>::clone(transmitter);
        self.core.attach(&transmitter);
    }

    /// Detaches a transmitter.
    ///
    /// If the transmitter is attached more than once, only the most recent attachment is removed.
    /// Detaching a transmitter that is not attached does nothing.
    #[inline]
    pub fn detach<T: ?Sized>(&self, transmitter: &Rc<T>) {
        self.core.detach(&**transmitter);
    }

    /// Detaches all transmitters.
    #[inline]
    pub fn reset(&self) {
        self.core.reset();
    }

    /// Whether no live transmitter is attached.
    ///
    /// Listeners that were dropped keep their entries until the next send, detach or reset
    /// sweeps them, so the cost grows with those entries in the meantime.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Whether a broadcast is currently in progress.
    #[must_use]
    #[inline]
    pub fn is_sending(&self) -> bool {
        self.core.is_observed()
    }

    /// Sends a signal to every attached transmitter, in attachment order.
    ///
    /// Transmitters with a receiver get `signal` called with their receiver. Transmitters without
    /// one get the signal packed into a [`PackedSignal`] via [`Transmitter::transmit()`]; the
    /// signal is packed at most once per broadcast.
    ///
    /// Returns `Ok(true)` if the dispatcher is still alive when the broadcast completes and
    /// `Ok(false)` if a listener dropped it, which ends the broadcast immediately.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a listener. Listeners after the failing one do not
    /// receive the signal.
    pub fn send<F>(&self, signal: F) -> Result<bool, SignalError>
    where
        F: Fn(&L) -> SignalResult + 'static,
    {
        self.core.send(signal)
    }

    /// Sends a packed signal to every attached transmitter via [`Transmitter::transmit()`].
    ///
    /// Sending an empty packed signal does nothing and returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a listener. Listeners after the failing one do not
    /// receive the signal.
    #[inline]
    pub fn send_packed(&self, signal: &PackedSignal<L>) -> Result<bool, SignalError> {
        self.core.send_packed(signal)
    }
}

impl<L: ?Sized + 'static> Default for Dispatcher<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized + 'static> Clone for Dispatcher<L> {
    /// Creates an independent dispatcher with the same live attachments.
    fn clone(&self) -> Self {
        let targets: Vec<_> = self
            .core
            .transmitters
            .borrow()
            .iter()
            .filter_map(WeakSlot::get)
            .collect();

        let clone = Self::from_builder(self.core.name, targets.len());

        for target in &targets {
            clone.core.attach(target);
        }

        clone
    }
}

impl<L: ?Sized + 'static> Drop for Dispatcher<L> {
    fn drop(&mut self) {
        self.core.close();
    }
}

impl<L: ?Sized + 'static> fmt::Debug for Dispatcher<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .finish()
    }
}

/// A non-owning handle to a [`Dispatcher`].
///
/// Once the dispatcher is dropped, sending through the handle returns `Ok(false)` and every
/// other operation does nothing.
pub struct DispatcherRef<L: ?Sized + 'static> {
    core: Weak<DispatchCore<L>>,
}

impl<L: ?Sized + 'static> DispatcherRef<L> {
    /// Whether the dispatcher has not been dropped yet.
    #[must_use]
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.core().is_some()
    }

    /// Attaches a transmitter. See [`Dispatcher::attach()`].
    pub fn attach<T>(&self, transmitter: &Rc<T>)
    where
        T: Transmitter<L> + 'static,
    {
        if let Some(core) = self.core() {
            let transmitter: Rc<dyn Transmitter<L>> = Rc::<T>::clone(transmitter);
            core.attach(&transmitter);
        }
    }

    /// Detaches a transmitter. See [`Dispatcher::detach()`].
    #[inline]
    pub fn detach<T: ?Sized>(&self, transmitter: &Rc<T>) {
        if let Some(core) = self.core() {
            core.detach(&**transmitter);
        }
    }

    /// Detaches all transmitters. See [`Dispatcher::reset()`].
    #[inline]
    pub fn reset(&self) {
        if let Some(core) = self.core() {
            core.reset();
        }
    }

    /// Whether no live transmitter is attached. A dropped dispatcher is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core().is_none_or(|core| core.is_empty())
    }

    /// Whether a broadcast is currently in progress.
    #[must_use]
    #[inline]
    pub fn is_sending(&self) -> bool {
        self.core().is_some_and(|core| core.is_observed())
    }

    /// Sends a signal. See [`Dispatcher::send()`].
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a listener.
    pub fn send<F>(&self, signal: F) -> Result<bool, SignalError>
    where
        F: Fn(&L) -> SignalResult + 'static,
    {
        match self.core() {
            Some(core) => core.send(signal),
            None => Ok(false),
        }
    }

    /// Sends a packed signal. See [`Dispatcher::send_packed()`].
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a listener.
    pub fn send_packed(&self, signal: &PackedSignal<L>) -> Result<bool, SignalError> {
        match self.core() {
            Some(core) => core.send_packed(signal),
            None => Ok(false),
        }
    }

    fn core(&self) -> Option<Rc<DispatchCore<L>>> {
        self.core.upgrade().filter(|core| !core.closed.get())
    }
}

impl<L: ?Sized + 'static> Clone for DispatcherRef<L> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<L: ?Sized + 'static> fmt::Debug for DispatcherRef<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// The shared state of a dispatcher.
///
/// Every operation that runs listener code holds a self-guard: a [`WeakSlot`] observing the core.
/// Closing the core releases all its observers, which empties the guards of in-flight broadcasts.
/// When the last guard goes away, the core is no longer observed and detached slots are removed.
struct DispatchCore<L: ?Sized + 'static> {
    observable: Observable,

    // Detached slots stay in place as empty slots while any guard exists, so that
    // in-flight broadcasts can keep iterating by index.
    transmitters: RefCell<Vec<WeakSlot<dyn Transmitter<L>>>>,

    closed: Cell<bool>,
    name: Option<&'static str>,
}

impl<L: ?Sized + 'static> DispatchCore<L> {
    fn new(name: Option<&'static str>, capacity: usize) -> Self {
        Self {
            observable: Observable::new(),
            transmitters: RefCell::new(Vec::with_capacity(capacity)),
            closed: Cell::new(false),
            name,
        }
    }

    fn attach(&self, transmitter: &Rc<dyn Transmitter<L>>) {
        if self.closed.get() {
            trace!(dispatcher = ?self.name, "ignoring attach on closed dispatcher");
            return;
        }

        // Registering may notify the transmitter, so this happens before borrowing.
        let slot = WeakSlot::new(transmitter);
        self.transmitters.borrow_mut().push(slot);
    }

    fn detach<T: ?Sized>(self: &Rc<Self>, transmitter: &T) {
        let _guard = WeakSlot::new(self);

        let removed = self
            .transmitters
            .borrow_mut()
            .iter_mut()
            .rev()
            .find(|slot| slot.is_observing(transmitter))
            .map(mem::take);

        // Releasing may notify the transmitter, so this happens after the borrow ends.
        drop(removed);
    }

    fn reset(self: &Rc<Self>) {
        let _guard = WeakSlot::new(self);

        let removed: Vec<_> = self
            .transmitters
            .borrow_mut()
            .iter_mut()
            .map(mem::take)
            .collect();

        drop(removed);
    }

    // Walks tombstones too; those left by dropped listeners stay until the next compaction.
    fn is_empty(&self) -> bool {
        !self.transmitters.borrow().iter().any(WeakSlot::is_set)
    }

    fn send<F>(self: &Rc<Self>, signal: F) -> Result<bool, SignalError>
    where
        F: Fn(&L) -> SignalResult + 'static,
    {
        let mut outgoing = Outgoing::new(signal);

        self.broadcast(|transmitter| match transmitter.receiver() {
            Some(receiver) => outgoing.call(receiver),
            None => transmitter.transmit(outgoing.packed()),
        })
    }

    fn send_packed(self: &Rc<Self>, signal: &PackedSignal<L>) -> Result<bool, SignalError> {
        if signal.is_empty() {
            return Ok(true);
        }

        self.broadcast(|transmitter| transmitter.transmit(signal))
    }

    fn broadcast(
        self: &Rc<Self>,
        mut deliver: impl FnMut(&dyn Transmitter<L>) -> SignalResult,
    ) -> Result<bool, SignalError> {
        if self.closed.get() {
            trace!(dispatcher = ?self.name, "ignoring send on closed dispatcher");
            return Ok(false);
        }

        let guard = WeakSlot::new(self);

        // The sequence may grow while listeners run, so the length is checked on every step.
        for index in 0_usize.. {
            let next = match self.transmitters.borrow().get(index) {
                Some(slot) => slot.get(),
                None => break,
            };

            let Some(transmitter) = next else {
                continue;
            };

            deliver(&*transmitter)?;

            if !guard.is_set() {
                debug!(
                    dispatcher = ?self.name,
                    delivered = index.wrapping_add(1),
                    "dispatcher closed during broadcast"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }

        debug!(
            dispatcher = ?self.name,
            sending = self.is_observed(),
            "closing dispatcher"
        );

        // Empties the guards of in-flight broadcasts, so they stop after the current listener.
        self.release_observers();

        let released = mem::take(&mut *self.transmitters.borrow_mut());
        drop(released);
    }

    /// Removes detached slots. Dropping them runs no listener code, as they observe nothing.
    fn compact(&self) {
        let mut transmitters = self.transmitters.borrow_mut();

        let before = transmitters.len();
        transmitters.retain(WeakSlot::is_set);

        trace!(
            dispatcher = ?self.name,
            removed = before.wrapping_sub(transmitters.len()),
            "compacted attachments"
        );
    }
}

impl<L: ?Sized + 'static> Observe for DispatchCore<L> {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn observation_changed(&self) {
        if !self.is_observed() {
            self.compact();
        }
    }
}

impl<L: ?Sized + 'static> fmt::Debug for DispatchCore<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("attachments", &self.transmitters.borrow().len())
            .field("closed", &self.closed.get())
            .field("sending", &self.is_observed())
            .finish_non_exhaustive()
    }
}
