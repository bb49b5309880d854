use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::Dispatcher;

/// Builder for creating an instance of [`Dispatcher`].
///
/// All settings are optional.
///
/// # Examples
///
/// ```
/// use weak_signals::{Dispatcher, SignalResult};
///
/// trait Alarms {
///     fn triggered(&self) -> SignalResult;
/// }
///
/// let dispatcher = Dispatcher::<dyn Alarms>::builder()
///     .name("alarms")
///     .capacity(16)
///     .build();
///
/// assert!(dispatcher.is_empty());
/// assert_eq!(dispatcher.name(), Some("alarms"));
/// ```
#[must_use]
pub struct DispatcherBuilder<L: ?Sized + 'static> {
    name: Option<&'static str>,
    capacity: usize,

    _listener: PhantomData<fn(&L)>,
}

impl<L: ?Sized + 'static> DispatcherBuilder<L> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            name: None,
            capacity: 0,
            _listener: PhantomData,
        }
    }

    /// Sets the name that identifies the dispatcher in diagnostic events.
    #[inline]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the number of attachments the dispatcher can hold before it needs to grow.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the dispatcher with the configured settings.
    #[must_use]
    #[inline]
    pub fn build(self) -> Dispatcher<L> {
        Dispatcher::from_builder(self.name, self.capacity)
    }
}

impl<L: ?Sized + 'static> fmt::Debug for DispatcherBuilder<L> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_utils::Signals;

    #[test]
    fn default_builder_creates_unnamed_dispatcher() {
        let dispatcher = Dispatcher::<dyn Signals>::builder().build();

        assert_eq!(dispatcher.name(), None);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn builder_applies_settings() {
        let dispatcher = Dispatcher::<dyn Signals>::builder()
            .name("test")
            .capacity(8)
            .build();

        assert_eq!(dispatcher.name(), Some("test"));
        assert!(dispatcher.capacity() >= 8);
    }
}
