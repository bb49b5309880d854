//! Transmitters that pass packed signals on to a downstream [`Dispatcher`].
//!
//! A relay has no receiver of its own, so a dispatcher it is attached to always hands it the
//! packed signal. The relay then re-broadcasts the signal to the listeners attached to its
//! downstream dispatcher, possibly after filtering or queueing it.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;

use tracing::trace;

use crate::{Dispatcher, Observable, Observe, PackedSignal, SignalError, SignalResult, Transmitter};

/// Re-broadcasts every signal it receives to its downstream dispatcher.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use weak_signals::{Dispatcher, ProxyReceiver, SignalResult};
///
/// trait Ticks {
///     fn tick(&self) -> SignalResult;
/// }
///
/// let upstream = Dispatcher::<dyn Ticks>::new();
/// let proxy = Rc::new(ProxyReceiver::<dyn Ticks>::new());
///
/// upstream.attach(&proxy);
///
/// // Listeners attached to `proxy.downstream()` now receive every signal sent upstream.
/// assert!(upstream.send(|listener| listener.tick()).unwrap());
/// ```
pub struct ProxyReceiver<L: ?Sized + 'static> {
    observable: Observable,
    downstream: Dispatcher<L>,
}

impl<L: ?Sized + 'static> ProxyReceiver<L> {
    /// Creates a proxy with a default downstream dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_downstream(Dispatcher::new())
    }

    /// Creates a proxy that re-broadcasts to `downstream`.
    #[must_use]
    pub fn with_downstream(downstream: Dispatcher<L>) -> Self {
        Self {
            observable: Observable::new(),
            downstream,
        }
    }

    /// The dispatcher that receives every relayed signal.
    #[must_use]
    pub fn downstream(&self) -> &Dispatcher<L> {
        &self.downstream
    }
}

impl<L: ?Sized + 'static> Default for ProxyReceiver<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized + 'static> Observe for ProxyReceiver<L> {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl<L: ?Sized + 'static> Transmitter<L> for ProxyReceiver<L> {
    fn receiver(&self) -> Option<&L> {
        None
    }

    fn transmit(&self, signal: &PackedSignal<L>) -> SignalResult {
        self.downstream.send_packed(signal)?;
        Ok(())
    }
}

impl<L: ?Sized + 'static> fmt::Debug for ProxyReceiver<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("downstream", &self.downstream)
            .finish_non_exhaustive()
    }
}

/// Whether a [`FilterReceiver`] passes a signal on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Verdict {
    /// The signal is re-broadcast downstream.
    Pass,

    /// The signal is dropped.
    Block,
}

/// Inspects signals passing through a [`FilterReceiver`].
///
/// A filter typically implements the listener interface itself and delivers the signal to
/// itself to examine its arguments, deciding afterwards whether the signal goes on.
pub trait SignalFilter<L: ?Sized> {
    /// Decides whether `signal` is passed downstream.
    ///
    /// # Errors
    ///
    /// An error stops the signal and is reported to the broadcast that delivered it.
    fn inspect(&self, signal: &PackedSignal<L>) -> Result<Verdict, SignalError>;
}

/// Re-broadcasts the signals its filter lets through.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use weak_signals::{
///     Dispatcher, FilterReceiver, PackedSignal, SignalError, SignalFilter, SignalResult, Verdict,
/// };
///
/// trait Readings {
///     fn temperature(&self, celsius: i32) -> SignalResult;
/// }
///
/// /// Only lets through readings above freezing.
/// #[derive(Default)]
/// struct AboveFreezing {
///     last: Cell<i32>,
/// }
///
/// impl Readings for AboveFreezing {
///     fn temperature(&self, celsius: i32) -> SignalResult {
///         self.last.set(celsius);
///         Ok(())
///     }
/// }
///
/// impl SignalFilter<dyn Readings> for AboveFreezing {
///     fn inspect(&self, signal: &PackedSignal<dyn Readings>) -> Result<Verdict, SignalError> {
///         signal.call(self)?;
///
///         Ok(if self.last.get() > 0 { Verdict::Pass } else { Verdict::Block })
///     }
/// }
///
/// let upstream = Dispatcher::<dyn Readings>::new();
/// let filter = Rc::new(FilterReceiver::<dyn Readings, _>::new(AboveFreezing::default()));
///
/// upstream.attach(&filter);
/// assert!(upstream.send(|listener| listener.temperature(-5)).unwrap());
/// ```
pub struct FilterReceiver<L: ?Sized + 'static, F> {
    observable: Observable,
    filter: F,
    downstream: Dispatcher<L>,
}

impl<L: ?Sized + 'static, F: SignalFilter<L>> FilterReceiver<L, F> {
    /// Creates a filtering relay with a default downstream dispatcher.
    #[must_use]
    pub fn new(filter: F) -> Self {
        Self::with_downstream(filter, Dispatcher::new())
    }

    /// Creates a filtering relay that re-broadcasts to `downstream`.
    #[must_use]
    pub fn with_downstream(filter: F, downstream: Dispatcher<L>) -> Self {
        Self {
            observable: Observable::new(),
            filter,
            downstream,
        }
    }

    /// The filter that inspects every signal.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// The dispatcher that receives every signal the filter passes.
    #[must_use]
    pub fn downstream(&self) -> &Dispatcher<L> {
        &self.downstream
    }
}

impl<L: ?Sized + 'static, F> Observe for FilterReceiver<L, F> {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl<L: ?Sized + 'static, F: SignalFilter<L>> Transmitter<L> for FilterReceiver<L, F> {
    fn receiver(&self) -> Option<&L> {
        None
    }

    fn transmit(&self, signal: &PackedSignal<L>) -> SignalResult {
        match self.filter.inspect(signal)? {
            Verdict::Pass => {
                self.downstream.send_packed(signal)?;
            }
            Verdict::Block => {
                trace!(dispatcher = ?self.downstream.name(), "filter blocked signal");
            }
        }

        Ok(())
    }
}

impl<L: ?Sized + 'static, F> fmt::Debug for FilterReceiver<L, F> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("downstream", &self.downstream)
            .finish_non_exhaustive()
    }
}

/// Holds on to every signal it receives until asked to deliver it downstream.
///
/// Signals are delivered in the order they were received, one per call to
/// [`pop_signal()`][Self::pop_signal].
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use weak_signals::{Dispatcher, QueueReceiver, SignalResult};
///
/// trait Jobs {
///     fn run(&self, id: u64) -> SignalResult;
/// }
///
/// let upstream = Dispatcher::<dyn Jobs>::new();
/// let queue = Rc::new(QueueReceiver::<dyn Jobs>::new());
///
/// upstream.attach(&queue);
/// upstream.send(|listener| listener.run(1)).unwrap();
/// upstream.send(|listener| listener.run(2)).unwrap();
/// assert_eq!(queue.len(), 2);
///
/// while queue.pop_signal().unwrap() {}
/// assert!(queue.is_empty());
/// ```
pub struct QueueReceiver<L: ?Sized + 'static> {
    observable: Observable,
    queue: RefCell<VecDeque<PackedSignal<L>>>,
    downstream: Dispatcher<L>,
}

impl<L: ?Sized + 'static> QueueReceiver<L> {
    /// Creates a queue with a default downstream dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_downstream(Dispatcher::new())
    }

    /// Creates a queue that delivers to `downstream`.
    #[must_use]
    pub fn with_downstream(downstream: Dispatcher<L>) -> Self {
        Self {
            observable: Observable::new(),
            queue: RefCell::new(VecDeque::new()),
            downstream,
        }
    }

    /// The dispatcher that receives the signals popped from the queue.
    #[must_use]
    pub fn downstream(&self) -> &Dispatcher<L> {
        &self.downstream
    }

    /// The number of signals waiting in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether no signal is waiting in the queue.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Delivers the oldest queued signal downstream.
    ///
    /// Returns whether a signal was waiting in the queue.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a downstream listener. The signal is not re-queued.
    pub fn pop_signal(&self) -> Result<bool, SignalError> {
        let next = self.queue.borrow_mut().pop_front();

        let Some(signal) = next else {
            return Ok(false);
        };

        self.downstream.send_packed(&signal)?;
        Ok(true)
    }

    /// Drops every queued signal without delivering it.
    pub fn clear(&self) {
        let dropped = mem::take(&mut *self.queue.borrow_mut());

        trace!(
            dispatcher = ?self.downstream.name(),
            dropped = dropped.len(),
            "cleared signal queue"
        );
    }
}

impl<L: ?Sized + 'static> Default for QueueReceiver<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized + 'static> Observe for QueueReceiver<L> {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl<L: ?Sized + 'static> Transmitter<L> for QueueReceiver<L> {
    fn receiver(&self) -> Option<&L> {
        None
    }

    fn transmit(&self, signal: &PackedSignal<L>) -> SignalResult {
        if signal.is_empty() {
            return Ok(());
        }

        self.queue.borrow_mut().push_back(signal.clone());
        Ok(())
    }
}

impl<L: ?Sized + 'static> fmt::Debug for QueueReceiver<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.len())
            .field("downstream", &self.downstream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::test_utils::{Recorder, Signals};

    assert_not_impl_any!(ProxyReceiver<dyn Signals>: Send, Sync);
    assert_not_impl_any!(QueueReceiver<dyn Signals>: Send, Sync);

    /// Lets signals through while open, counting every signal it inspects.
    #[derive(Default)]
    struct Gate {
        open: Cell<bool>,
        inspected: Cell<usize>,
    }

    impl Signals for Gate {
        fn ping(&self) -> SignalResult {
            self.inspected.set(self.inspected.get().wrapping_add(1));
            Ok(())
        }

        fn fail(&self) -> SignalResult {
            Err(SignalError::listener("gate refused the signal"))
        }
    }

    impl SignalFilter<dyn Signals> for Gate {
        fn inspect(&self, signal: &PackedSignal<dyn Signals>) -> Result<Verdict, SignalError> {
            signal.call(self)?;

            Ok(if self.open.get() {
                Verdict::Pass
            } else {
                Verdict::Block
            })
        }
    }

    fn ping() -> PackedSignal<dyn Signals> {
        PackedSignal::<dyn Signals>::new(|listener| listener.ping())
    }

    #[test]
    fn proxy_has_no_receiver() {
        let proxy = ProxyReceiver::<dyn Signals>::new();

        assert!(proxy.receiver().is_none());
    }

    #[test]
    fn proxy_relays_packed_signal() {
        let proxy = ProxyReceiver::<dyn Signals>::new();
        let recorder = Rc::new(Recorder::default());

        proxy.downstream().attach(&recorder);
        proxy.transmit(&ping()).unwrap();

        assert_eq!(recorder.pings(), 1);
    }

    #[test]
    fn proxy_relays_direct_broadcast() {
        let upstream = Dispatcher::<dyn Signals>::new();
        let proxy = Rc::new(ProxyReceiver::<dyn Signals>::new());
        let recorder = Rc::new(Recorder::default());

        upstream.attach(&proxy);
        proxy.downstream().attach(&recorder);

        assert!(upstream.send(|listener| listener.ping()).unwrap());
        assert_eq!(recorder.pings(), 1);
    }

    #[test]
    fn proxy_reports_downstream_error() {
        let proxy = ProxyReceiver::<dyn Signals>::new();
        let recorder = Rc::new(Recorder::default());

        proxy.downstream().attach(&recorder);
        let signal = PackedSignal::<dyn Signals>::new(|listener| listener.fail());
        let result = proxy.transmit(&signal);

        assert!(matches!(result, Err(SignalError::Listener { .. })));
    }

    #[test]
    fn filter_inspects_without_downstream() {
        let filter = FilterReceiver::<dyn Signals, _>::new(Gate::default());

        filter.transmit(&ping()).unwrap();

        assert_eq!(filter.filter().inspected.get(), 1);
    }

    #[test]
    fn filter_passes_signal() {
        let filter = FilterReceiver::<dyn Signals, _>::new(Gate::default());
        let recorder = Rc::new(Recorder::default());

        filter.filter().open.set(true);
        filter.downstream().attach(&recorder);
        filter.transmit(&ping()).unwrap();

        assert_eq!(recorder.pings(), 1);
    }

    #[test]
    fn filter_blocks_signal() {
        let filter = FilterReceiver::<dyn Signals, _>::new(Gate::default());
        let recorder = Rc::new(Recorder::default());

        filter.downstream().attach(&recorder);
        filter.transmit(&ping()).unwrap();

        assert_eq!(filter.filter().inspected.get(), 1);
        assert_eq!(recorder.pings(), 0);
    }

    #[test]
    fn filter_error_stops_signal() {
        let filter = FilterReceiver::<dyn Signals, _>::new(Gate::default());
        let recorder = Rc::new(Recorder::default());

        filter.filter().open.set(true);
        filter.downstream().attach(&recorder);
        let signal = PackedSignal::<dyn Signals>::new(|listener| listener.fail());
        let result = filter.transmit(&signal);

        assert!(matches!(result, Err(SignalError::Listener { .. })));
        assert_eq!(recorder.pings(), 0);
    }

    #[test]
    fn pop_from_empty_queue() {
        let queue = QueueReceiver::<dyn Signals>::new();
        let recorder = Rc::new(Recorder::default());

        queue.downstream().attach(&recorder);

        assert!(!queue.pop_signal().unwrap());
        assert_eq!(recorder.pings(), 0);
    }

    #[test]
    fn queue_holds_signal_until_popped() {
        let queue = QueueReceiver::<dyn Signals>::new();
        let recorder = Rc::new(Recorder::default());

        queue.downstream().attach(&recorder);
        queue.transmit(&ping()).unwrap();
        assert_eq!(recorder.pings(), 0);
        assert_eq!(queue.len(), 1);

        assert!(queue.pop_signal().unwrap());
        assert_eq!(recorder.pings(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_delivers_in_arrival_order() {
        let upstream = Dispatcher::<dyn Signals>::new();
        let queue = Rc::new(QueueReceiver::<dyn Signals>::new());
        let recorder = Rc::new(Recorder::default());

        upstream.attach(&queue);
        queue.downstream().attach(&recorder);

        upstream.send(|listener| listener.ping()).unwrap();
        upstream.send(|listener| listener.fail()).unwrap();

        assert!(queue.pop_signal().unwrap());
        assert_eq!(recorder.pings(), 1);
        assert!(matches!(
            queue.pop_signal(),
            Err(SignalError::Listener { .. })
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_ignores_empty_signal() {
        let queue = QueueReceiver::<dyn Signals>::new();

        queue.transmit(&PackedSignal::empty()).unwrap();

        assert!(queue.is_empty());
    }

    #[test]
    fn clear_drops_queued_signals() {
        let queue = QueueReceiver::<dyn Signals>::new();
        let recorder = Rc::new(Recorder::default());

        queue.downstream().attach(&recorder);
        queue.transmit(&ping()).unwrap();
        queue.clear();

        assert!(!queue.pop_signal().unwrap());
        assert_eq!(recorder.pings(), 0);
    }
}
