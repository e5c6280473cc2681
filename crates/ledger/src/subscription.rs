//! Cancellable observer subscriptions.
//!
//! A subscription owns one background task that feeds an observer. The
//! observer sits behind a mutex: delivering an item and tearing down both
//! take that lock, so once [`Subscription::cancel`] returns no delivery is in
//! progress and none will start.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex},
};

use tokio::task::AbortHandle;

use crate::util::lock;

type Observer<T> = Box<dyn FnMut(T) + Send>;

pub(crate) struct Feed<T> {
    observer: Mutex<Option<Observer<T>>>,
    task: Mutex<Option<AbortHandle>>,
}

impl<T> Feed<T> {
    /// Hands `item` to the observer. Returns `false` once torn down.
    pub(crate) fn deliver(&self, item: T) -> bool {
        let mut guard = lock(&self.observer);
        match guard.as_mut() {
            Some(observer) => {
                observer(item);
                true
            }
            None => false,
        }
    }

    /// Delivers a last item and detaches the observer.
    pub(crate) fn finish(&self, item: T) {
        let observer = {
            let mut guard = lock(&self.observer);
            if let Some(observer) = guard.as_mut() {
                observer(item);
            }
            guard.take()
        };
        drop(observer);
    }
}

trait Teardown: Send + Sync {
    fn teardown(&self);
    fn is_active(&self) -> bool;
}

impl<T> Teardown for Feed<T> {
    fn teardown(&self) {
        let observer = lock(&self.observer).take();
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        drop(observer);
    }

    fn is_active(&self) -> bool {
        lock(&self.observer).is_some()
    }
}

/// Handle to a live subscription. Dropping it cancels the subscription.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    feed: Arc<dyn Teardown>,
}

impl Subscription {
    /// Spawns `drive` with a feed wrapping `observer`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn<T, F, D, Fut>(observer: F, drive: D) -> Self
    where
        T: 'static,
        F: FnMut(T) + Send + 'static,
        D: FnOnce(Arc<Feed<T>>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let feed = Arc::new(Feed {
            observer: Mutex::new(Some(Box::new(observer) as Observer<T>)),
            task: Mutex::new(None),
        });
        let task = tokio::spawn(drive(Arc::clone(&feed)));
        *lock(&feed.task) = Some(task.abort_handle());
        Self { feed }
    }

    /// Stops the subscription and drops its observer.
    ///
    /// Idempotent. Blocks while a delivery is in progress, so it must not be
    /// called from inside the observer itself.
    pub fn cancel(&self) {
        self.feed.teardown();
    }

    /// `false` once cancelled or once the feed ended with an error.
    pub fn is_active(&self) -> bool {
        self.feed.is_active()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed.teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
