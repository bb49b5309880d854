//! Fixtures shared by the unit tests of this crate.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{Observable, Observe, PackedSignal, SignalError, SignalResult, Transmitter};

/// An observable object that counts how often its observation state changed.
#[derive(Clone, Debug, Default)]
pub(crate) struct Probe {
    observable: Observable,
    changes: Rc<Cell<usize>>,
}

impl Probe {
    pub(crate) fn changes(&self) -> usize {
        self.changes.get()
    }

    /// The counter outlives the probe, for tests that drop the probe.
    pub(crate) fn change_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.changes)
    }
}

impl Observe for Probe {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn observation_changed(&self) {
        self.changes.set(self.changes.get().wrapping_add(1));
    }
}

/// The listener interface used by the dispatcher tests.
pub(crate) trait Signals {
    fn ping(&self) -> SignalResult;

    fn fail(&self) -> SignalResult;
}

/// A listener that records every `ping` it receives.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    observable: Observable,
    pings: Cell<usize>,
    unbound: bool,
}

impl Recorder {
    /// A transmitter without a bound receiver, which only accepts packed signals.
    pub(crate) fn unbound() -> Self {
        Self {
            unbound: true,
            ..Self::default()
        }
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.get()
    }
}

impl Signals for Recorder {
    fn ping(&self) -> SignalResult {
        self.pings.set(self.pings.get().wrapping_add(1));
        Ok(())
    }

    fn fail(&self) -> SignalResult {
        Err(SignalError::listener("recorder refused the signal"))
    }
}

impl Observe for Recorder {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl Transmitter<dyn Signals> for Recorder {
    fn receiver(&self) -> Option<&(dyn Signals + 'static)> {
        if self.unbound { None } else { Some(self) }
    }
}

/// A forwarding-only transmitter that remembers every packed signal handed to it.
#[derive(Debug, Default)]
pub(crate) struct Forwarder {
    observable: Observable,
    received: RefCell<Vec<PackedSignal<dyn Signals>>>,
    target: Recorder,
}

impl Forwarder {
    pub(crate) fn received(&self) -> Vec<PackedSignal<dyn Signals>> {
        self.received.borrow().clone()
    }

    pub(crate) fn target(&self) -> &Recorder {
        &self.target
    }
}

impl Observe for Forwarder {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl Transmitter<dyn Signals> for Forwarder {
    fn receiver(&self) -> Option<&(dyn Signals + 'static)> {
        None
    }

    fn transmit(&self, signal: &PackedSignal<dyn Signals>) -> SignalResult {
        self.received.borrow_mut().push(signal.clone());
        signal.call(&self.target)
    }
}

/// A listener that runs an arbitrary action whenever it receives a signal.
pub(crate) struct Trigger {
    observable: Observable,
    action: Box<dyn Fn() -> SignalResult>,
}

impl Trigger {
    pub(crate) fn new(action: impl Fn() -> SignalResult + 'static) -> Rc<Self> {
        Rc::new(Self {
            observable: Observable::new(),
            action: Box::new(action),
        })
    }
}

impl Signals for Trigger {
    fn ping(&self) -> SignalResult {
        (self.action)()
    }

    fn fail(&self) -> SignalResult {
        (self.action)()
    }
}

impl Observe for Trigger {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl Transmitter<dyn Signals> for Trigger {
    fn receiver(&self) -> Option<&(dyn Signals + 'static)> {
        Some(self)
    }
}
