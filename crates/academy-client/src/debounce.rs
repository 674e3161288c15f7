//! Debouncer
//!
//! Coalescing queue: every pushed value restarts the quiet window, and only
//! the newest value is emitted once the window passes without a push.
//! Closing the queue drops whatever is still pending.

use std::{future::Future, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};

/// Handle for pushing values into a debounce task
pub struct Debouncer<T> {
    sender: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn a debounce task that calls `emit` with the newest value after
    /// `window` of quiet
    pub fn spawn<F, Fut>(window: Duration, mut emit: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(mut latest) = receiver.recv().await {
                loop {
                    match timeout(window, receiver.recv()).await {
                        // Newer value supersedes and restarts the window
                        Ok(Some(newer)) => latest = newer,
                        // Queue closed: drop the pending value
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                emit(latest).await;
            }
        });

        Self { sender, task }
    }

    /// Queue a value. Returns false once the task has stopped.
    pub fn push(&self, value: T) -> bool {
        self.sender.send(value).is_ok()
    }

    /// Close the queue, dropping any pending value, and wait for an
    /// in-flight emit to finish
    pub async fn close(self) {
        drop(self.sender);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn collecting() -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = emitted.clone();
        let debouncer = Debouncer::spawn(Duration::from_millis(100), move |value| {
            let sink = sink.clone();
            async move { sink.lock().push(value) }
        });
        (debouncer, emitted)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_newest_value_is_emitted() {
        let (debouncer, emitted) = collecting();

        debouncer.push(1);
        sleep(Duration::from_millis(50)).await;
        debouncer.push(2);
        sleep(Duration::from_millis(50)).await;
        debouncer.push(3);

        sleep(Duration::from_millis(99)).await;
        assert!(emitted.lock().is_empty());

        sleep(Duration::from_millis(50)).await;
        assert_eq!(*emitted.lock(), vec![3]);

        debouncer.push(4);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(*emitted.lock(), vec![3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drops_pending_value() {
        let (debouncer, emitted) = collecting();

        debouncer.push(7);
        sleep(Duration::from_millis(10)).await;
        debouncer.close().await;

        sleep(Duration::from_millis(500)).await;
        assert!(emitted.lock().is_empty());
    }
}
