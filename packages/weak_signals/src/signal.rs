use std::any::type_name;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::{Observe, SignalResult};

/// A signal packaged with its arguments, ready to be delivered to any listener of type `L`.
///
/// Packed signals are cheap to clone: all clones share the same packaged call. They are used
/// to deliver signals to [transmitters][Transmitter] that have no listener of their own and
/// instead forward, filter or queue the signal.
///
/// A packed signal can also be empty, in which case delivering it does nothing.
///
/// # Example
///
/// ```
/// use weak_signals::{PackedSignal, SignalResult};
///
/// trait Thermostat {
///     fn set_target(&self, celsius: i32) -> SignalResult;
/// }
///
/// let signal = PackedSignal::<dyn Thermostat>::new(|thermostat| thermostat.set_target(21));
/// assert!(!signal.is_empty());
/// ```
pub struct PackedSignal<L: ?Sized> {
    call: Option<Rc<dyn Fn(&L) -> SignalResult>>,
}

impl<L: ?Sized> PackedSignal<L> {
    /// Packages `call` for later delivery.
    #[must_use]
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&L) -> SignalResult + 'static,
    {
        Self {
            call: Some(Rc::new(call)),
        }
    }

    /// Creates a packed signal that carries nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { call: None }
    }

    /// Whether the packed signal carries nothing.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.call.is_none()
    }

    /// Delivers the signal to `listener`.
    ///
    /// Delivering an empty packed signal does nothing.
    ///
    /// # Errors
    ///
    /// Returns whatever error the listener reports.
    #[inline]
    pub fn call(&self, listener: &L) -> SignalResult {
        match &self.call {
            Some(call) => call(listener),
            None => Ok(()),
        }
    }

    /// Whether two packed signals share the same packaged call.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.call, &other.call) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<L: ?Sized> Clone for PackedSignal<L> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
        }
    }
}

impl<L: ?Sized> Default for PackedSignal<L> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<L: ?Sized> fmt::Debug for PackedSignal<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

/// Something that can be attached to a [`Dispatcher`][crate::Dispatcher] to receive its signals.
///
/// A transmitter either exposes a listener via [`receiver()`][Self::receiver], in which case the
/// dispatcher calls the listener directly, or exposes no listener and receives every signal
/// packed via [`transmit()`][Self::transmit], where it can forward, filter or queue it.
///
/// Transmitters are observable: the dispatcher observes each attached transmitter through a
/// [`WeakSlot`][crate::WeakSlot], so dropping a transmitter detaches it everywhere and
/// [`Observe::release_observers()`] detaches it from every dispatcher at once.
pub trait Transmitter<L: ?Sized>: Observe {
    /// The listener that receives signals directly, if any.
    fn receiver(&self) -> Option<&L>;

    /// Delivers a packed signal.
    ///
    /// The default implementation delivers it to [`receiver()`][Self::receiver] and drops the
    /// signal if there is no receiver.
    ///
    /// # Errors
    ///
    /// Returns whatever error the listener reports.
    fn transmit(&self, signal: &PackedSignal<L>) -> SignalResult {
        match self.receiver() {
            Some(receiver) => signal.call(receiver),
            None => {
                trace!(
                    transmitter = type_name::<Self>(),
                    "dropping packed signal for transmitter without receiver"
                );
                Ok(())
            }
        }
    }
}

/// The signal of one broadcast, packed on first demand.
///
/// Direct deliveries use the signal as given. The first transmitter without a receiver causes
/// the signal to be packed; every later delivery of the same broadcast shares that one package.
pub(crate) struct Outgoing<F, L: ?Sized> {
    direct: Option<F>,
    packed: Option<PackedSignal<L>>,
}

impl<F, L> Outgoing<F, L>
where
    F: Fn(&L) -> SignalResult + 'static,
    L: ?Sized,
{
    pub(crate) fn new(signal: F) -> Self {
        Self {
            direct: Some(signal),
            packed: None,
        }
    }

    pub(crate) fn call(&self, listener: &L) -> SignalResult {
        if let Some(direct) = &self.direct {
            return direct(listener);
        }

        match &self.packed {
            Some(packed) => packed.call(listener),
            None => Ok(()),
        }
    }

    pub(crate) fn packed(&mut self) -> &PackedSignal<L> {
        let direct = &mut self.direct;

        self.packed.get_or_insert_with(|| {
            trace!("packing signal for forwarding");
            direct
                .take()
                .map_or_else(PackedSignal::empty, PackedSignal::new)
        })
    }
}
