#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Single-threaded weak observation and reentrant signal broadcasting.
//!
//! This crate provides two layers:
//!
//! * A weak observation primitive. An object that embeds an [`Observable`] and implements
//!   [`Observe`] can be referenced by any number of [`WeakSlot`]s. The object always knows
//!   whether it is observed, is notified when that changes, and can empty every slot at once via
//!   [`Observe::release_observers()`].
//! * A [`Dispatcher`] that broadcasts signals to listeners implementing a listener trait `L`. The
//!   dispatcher observes its listeners weakly and tolerates any change while a broadcast is in
//!   progress: listeners may attach, detach or drop listeners, start nested broadcasts or drop
//!   the dispatcher itself.
//!
//! Listeners are attached as [`Transmitter`]s. A transmitter with a receiver is called directly.
//! A transmitter without one gets the signal as a [`PackedSignal`] that it can store or forward,
//! as the relays in this crate do ([`ProxyReceiver`], [`FilterReceiver`], [`QueueReceiver`]).
//!
//! Listener methods return [`SignalResult`]. The first error stops the broadcast and is returned
//! to the sender.
//!
//! All types are single-threaded.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use weak_signals::{Dispatcher, Observable, Observe, SignalResult, Transmitter};
//!
//! trait Chat {
//!     fn message(&self, text: &str) -> SignalResult;
//! }
//!
//! #[derive(Default)]
//! struct Inbox {
//!     observable: Observable,
//!     messages: RefCell<Vec<String>>,
//! }
//!
//! impl Chat for Inbox {
//!     fn message(&self, text: &str) -> SignalResult {
//!         self.messages.borrow_mut().push(text.to_owned());
//!         Ok(())
//!     }
//! }
//!
//! impl Observe for Inbox {
//!     fn observable(&self) -> &Observable {
//!         &self.observable
//!     }
//! }
//!
//! impl Transmitter<dyn Chat> for Inbox {
//!     fn receiver(&self) -> Option<&(dyn Chat + 'static)> {
//!         Some(self)
//!     }
//! }
//!
//! let room = Dispatcher::<dyn Chat>::builder().name("room").build();
//! let alice = Rc::new(Inbox::default());
//! let bob = Rc::new(Inbox::default());
//!
//! room.attach(&alice);
//! room.attach(&bob);
//! room.send(|listener| listener.message("hello")).unwrap();
//!
//! drop(bob);
//! room.send(|listener| listener.message("anyone?")).unwrap();
//!
//! assert_eq!(*alice.messages.borrow(), ["hello", "anyone?"]);
//! ```

mod builder;
mod dispatcher;
mod error;
mod link;
mod observable;
mod relay;
mod signal;
mod weak_slot;

#[cfg(test)]
mod test_utils;

pub use builder::DispatcherBuilder;
pub use dispatcher::{Dispatcher, DispatcherRef};
pub use error::{SignalError, SignalResult};
pub use link::{LinkChain, LinkIter, LinkKey};
pub use observable::{Observable, Observe};
pub use relay::{FilterReceiver, ProxyReceiver, QueueReceiver, SignalFilter, Verdict};
pub use signal::{PackedSignal, Transmitter};
pub use weak_slot::WeakSlot;
