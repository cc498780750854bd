use crate::error::Result;
use crate::types::RawKeyEvent;
use crossbeam_channel::Sender;
use std::fmt;

/// A system-wide keyboard event source.
///
/// `install` starts delivering every key transition, in order, into `sink`
/// until the returned [`Subscription`] is dropped. Sources are observers only:
/// they must pass every event on to the rest of the system untouched.
pub trait KeyEventSource {
    fn install(&self, sink: Sender<RawKeyEvent>) -> Result<Subscription>;
}

/// Ownership of an installed source. Dropping it uninstalls the source and
/// releases the sink, which disconnects the receiving side once drained.
pub struct Subscription {
    uninstall: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(uninstall: impl FnOnce() + Send + 'static) -> Self {
        Self {
            uninstall: Some(Box::new(uninstall)),
        }
    }

    pub fn uninstall(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(f) = self.uninstall.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("installed", &self.uninstall.is_some())
            .finish()
    }
}
