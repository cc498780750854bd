use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Fan-out of values to any number of channel subscribers.
/// Subscribers whose receiver has been dropped are pruned on the next publish.
pub struct Broadcaster<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Broadcaster<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, value: T) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(value.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_and_prune() {
        let b = Broadcaster::new();
        let r1 = b.subscribe();
        let r2 = b.subscribe();

        b.publish(1);
        assert_eq!(r1.try_recv(), Ok(1));
        assert_eq!(r2.try_recv(), Ok(1));

        drop(r2);
        b.publish(2);
        assert_eq!(b.subscribers.lock().len(), 1);
        assert_eq!(r1.try_recv(), Ok(2));
    }
}
