//! One-shot readiness signal.
//!
//! Resolves exactly once. Callbacks registered before resolution run in
//! registration order when it happens; later registrations run immediately.
//! [`ReadySignal::wait`] offers the same thing as a `Future`.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{ChoreoError, Result};

type Callback<T> = Box<dyn FnOnce(&T)>;

struct Inner<T> {
    value: Option<T>,
    callbacks: Vec<Callback<T>>,
    wakers: Vec<Waker>,
}

/// Shared handle; clones observe the same signal.
pub struct ReadySignal<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for ReadySignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for ReadySignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadySignal<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: None,
                callbacks: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.borrow().value.is_some()
    }
}

impl<T: Clone + 'static> ReadySignal<T> {
    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Resolve the signal. Fails if it was already resolved.
    pub fn resolve(&self, value: T) -> Result<()> {
        let (callbacks, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.is_some() {
                return Err(ChoreoError::AlreadyResolved);
            }
            inner.value = Some(value.clone());
            (
                std::mem::take(&mut inner.callbacks),
                std::mem::take(&mut inner.wakers),
            )
        };
        // Borrow released: callbacks may register further callbacks.
        for callback in callbacks {
            callback(&value);
        }
        for waker in wakers {
            waker.wake();
        }
        Ok(())
    }

    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&T) + 'static,
    {
        let ready = self.get();
        match ready {
            Some(value) => callback(&value),
            None => self.inner.borrow_mut().callbacks.push(Box::new(callback)),
        }
    }

    pub fn wait(&self) -> ReadyFuture<T> {
        ReadyFuture {
            inner: Rc::clone(&self.inner),
        }
    }
}

pub struct ReadyFuture<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: Clone> Future for ReadyFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut inner = self.inner.borrow_mut();
        match &inner.value {
            Some(value) => Poll::Ready(value.clone()),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let signal = ReadySignal::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            signal.on_ready(move |v| log.borrow_mut().push(format!("{tag}{v}")));
        }
        assert!(log.borrow().is_empty());
        signal.resolve(7).unwrap();
        assert_eq!(*log.borrow(), ["a7", "b7", "c7"]);
    }

    #[test]
    fn resolves_exactly_once() {
        let signal = ReadySignal::new();
        signal.resolve(1).unwrap();
        assert!(matches!(signal.resolve(2), Err(ChoreoError::AlreadyResolved)));
        assert_eq!(signal.get(), Some(1));
    }

    #[test]
    fn late_callbacks_run_immediately() {
        let signal = ReadySignal::new();
        signal.resolve("up").unwrap();
        let hit = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&hit);
        signal.on_ready(move |_| *flag.borrow_mut() = true);
        assert!(*hit.borrow());
    }

    #[test]
    fn callbacks_may_register_more_callbacks() {
        let signal = ReadySignal::<u8>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (s2, l2) = (signal.clone(), Rc::clone(&log));
        signal.on_ready(move |_| {
            l2.borrow_mut().push("outer");
            let l3 = Rc::clone(&l2);
            s2.on_ready(move |_| l3.borrow_mut().push("inner"));
        });
        signal.resolve(0).unwrap();
        assert_eq!(*log.borrow(), ["outer", "inner"]);
    }

    #[test]
    fn future_completes_after_resolve() {
        let signal = ReadySignal::<u32>::new();
        let mut fut = Box::pin(signal.wait());
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert!(fut.as_mut().poll(&mut cx).is_pending());
        signal.resolve(9).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(9));
    }
}
