//! Uniform async invocation contract for host-supplied callbacks.
//!
//! Hosts hand in either plain closures or async closures; both are wrapped
//! into a [`Callback`] whose [`invoke`](Callback::invoke) always returns a
//! future. Nothing is spawned: the wrapped closure only runs when the caller
//! awaits the returned future, so invocation order is exactly the order in
//! which callers await.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use futures::FutureExt;

/// Future returned by every normalized callback.
pub type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

type CallbackFn<A> = dyn Fn(A) -> CallbackFuture + Send + Sync;

/// A normalized host callback taking a single argument of type `A`.
///
/// Cloning is cheap (the closure is reference counted), which lets the
/// dispatcher copy the current callback out of its slot before awaiting it.
pub struct Callback<A> {
    inner: Arc<CallbackFn<A>>,
}

impl<A: Send + 'static> Callback<A> {
    /// Wrap a synchronous closure.
    ///
    /// The closure runs when the returned future is first polled; an `Err`
    /// becomes a rejected invocation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            inner: Arc::new(move |arg| {
                let f = Arc::clone(&f);
                async move { f(arg) }.boxed()
            }),
        }
    }

    /// Wrap a closure returning a future.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |arg| f(arg).boxed()),
        }
    }

    /// Invoke the callback. Resolves once the host's effect has completed.
    pub fn invoke(&self, arg: A) -> CallbackFuture {
        (self.inner)(arg)
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn sync_and_async_callbacks_observe_same_order() {
        let sync_log = recorder();
        let async_log = recorder();

        let log = Arc::clone(&sync_log);
        let sync_cb = Callback::from_fn(move |s: String| {
            log.lock().unwrap().push(s);
            Ok(())
        });

        let log = Arc::clone(&async_log);
        let async_cb = Callback::from_async(move |s: String| {
            let log = Arc::clone(&log);
            async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push(s);
                anyhow::Ok(())
            }
        });

        for word in ["a", "b", "c"] {
            sync_cb.invoke(word.to_string()).await.unwrap();
            async_cb.invoke(word.to_string()).await.unwrap();
        }

        assert_eq!(*sync_log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(*sync_log.lock().unwrap(), *async_log.lock().unwrap());
    }

    #[tokio::test]
    async fn sync_closure_runs_only_when_awaited() {
        let log = recorder();
        let inner = Arc::clone(&log);
        let cb = Callback::from_fn(move |s: &'static str| {
            inner.lock().unwrap().push(s.to_string());
            Ok(())
        });

        let pending = cb.invoke("late");
        assert!(log.lock().unwrap().is_empty());
        pending.await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
    }

    #[tokio::test]
    async fn errors_surface_as_rejections() {
        let sync_cb = Callback::from_fn(|_: ()| Err(anyhow::anyhow!("sync failure")));
        let async_cb = Callback::from_async(|_: ()| async {
            Err::<(), _>(anyhow::anyhow!("async failure"))
        });

        let err = sync_cb.invoke(()).await.unwrap_err();
        assert_eq!(err.to_string(), "sync failure");
        let err = async_cb.invoke(()).await.unwrap_err();
        assert_eq!(err.to_string(), "async failure");
    }

    #[tokio::test]
    async fn clones_share_the_closure() {
        let log = recorder();
        let inner = Arc::clone(&log);
        let cb = Callback::from_fn(move |n: u32| {
            inner.lock().unwrap().push(n.to_string());
            Ok(())
        });
        let copy = cb.clone();
        cb.invoke(1).await.unwrap();
        copy.invoke(2).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["1", "2"]);
    }
}
