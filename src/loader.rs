//! Lazy loading of shared heavyweight libraries.
//!
//! Some dependencies of the export pipeline are too expensive to set up on
//! every call and must exist at most once per process, the equivalent of a
//! lazily injected third-party script. [`LazyLibrary`] starts the load in a
//! background thread the first time anyone asks for it, and every caller
//! blocks on a condition variable until the library is ready or a deadline
//! passes.
//!
//! There is intentionally no unbounded wait: a library that never becomes
//! ready surfaces as [`LoaderError::Timeout`] instead of a silent hang.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LoaderError {
    /// The library did not become ready before the deadline.
    #[error("library {library:?} did not become ready within {waited:?}")]
    Timeout {
        library: &'static str,
        waited: Duration,
    },

    /// The loader ran and reported a failure. All subsequent calls observe
    /// the same failure; the load is not retried.
    #[error("library {library:?} failed to load: {message}")]
    Failed {
        library: &'static str,
        message: String,
    },
}

type LoaderFn<T> = Box<dyn FnOnce() -> Result<T, String> + Send + 'static>;

enum LoadState<T> {
    /// Registered but never requested. Holds the loader until first use.
    Idle(Option<LoaderFn<T>>),
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

struct Inner<T> {
    name: &'static str,
    state: Mutex<LoadState<T>>,
    ready: Condvar,
}

/// A process-wide library that is loaded lazily, in the background, exactly
/// once.
///
/// Cloning shares the underlying state; clones observe the same load.
///
/// # Example
///
/// ```
/// use icondeck_exporter::LazyLibrary;
/// use std::time::Duration;
///
/// let library = LazyLibrary::new("answer", || Ok::<_, String>(42));
/// let value = library.get(Duration::from_secs(1)).unwrap();
/// assert_eq!(*value, 42);
/// assert!(library.is_loaded());
/// ```
pub struct LazyLibrary<T: Send + Sync + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> Clone for LazyLibrary<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> LazyLibrary<T> {
    /// Registers a library without loading it. The loader runs on a
    /// background thread the first time [`get`](Self::get) is called.
    pub fn new<F, E>(name: &'static str, loader: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: std::fmt::Display,
    {
        let boxed: LoaderFn<T> = Box::new(move || loader().map_err(|e| e.to_string()));
        Self {
            inner: Arc::new(Inner {
                name,
                state: Mutex::new(LoadState::Idle(Some(boxed))),
                ready: Condvar::new(),
            }),
        }
    }

    /// Returns the loaded library, starting the load if nobody has yet.
    ///
    /// Blocks until the library is ready, the load fails, or `timeout`
    /// elapses. Concurrent callers share one load: the loader function runs
    /// exactly once no matter how many threads race here.
    pub fn get(&self, timeout: Duration) -> Result<Arc<T>, LoaderError> {
        let mut state = self.inner.state.lock().unwrap();

        if let LoadState::Idle(loader) = &mut *state {
            let loader = loader.take().unwrap();
            *state = LoadState::Loading;

            let inner = Arc::clone(&self.inner);
            thread::spawn(move || {
                log::debug!("loading library {:?}", inner.name);
                let result = loader();
                let mut state = inner.state.lock().unwrap();
                *state = match result {
                    Ok(library) => LoadState::Ready(Arc::new(library)),
                    Err(message) => {
                        log::error!("library {:?} failed to load: {message}", inner.name);
                        LoadState::Failed(message)
                    }
                };
                inner.ready.notify_all();
            });
        }

        let (state, wait) = self
            .inner
            .ready
            .wait_timeout_while(state, timeout, |s| matches!(s, LoadState::Loading))
            .unwrap();

        match &*state {
            LoadState::Ready(library) => Ok(Arc::clone(library)),
            LoadState::Failed(message) => Err(LoaderError::Failed {
                library: self.inner.name,
                message: message.clone(),
            }),
            LoadState::Loading => {
                debug_assert!(wait.timed_out());
                Err(LoaderError::Timeout {
                    library: self.inner.name,
                    waited: timeout,
                })
            }
            // get() replaces Idle with Loading before ever waiting.
            LoadState::Idle(_) => unreachable!(),
        }
    }

    /// Whether the library has finished loading successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.inner.state.lock().unwrap(), LoadState::Ready(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn loads_on_first_get() {
        let library = LazyLibrary::new("numbers", || Ok::<_, String>(vec![1, 2, 3]));
        assert!(!library.is_loaded());

        let value = library.get(Duration::from_secs(5)).unwrap();
        assert_eq!(*value, vec![1, 2, 3]);
        assert!(library.is_loaded());
    }

    #[test]
    fn loader_runs_exactly_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let library = LazyLibrary::new("counted", || {
            CALLS.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok::<_, String>(7u32)
        });

        let mut handles = Vec::new();
        for _ in 0..8 {
            let library = library.clone();
            handles.push(thread::spawn(move || {
                library.get(Duration::from_secs(5)).unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(*handle.join().unwrap(), 7);
        }

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slow_load_times_out_with_descriptive_error() {
        let library = LazyLibrary::new("glacial", || {
            thread::sleep(Duration::from_secs(60));
            Ok::<_, String>(())
        });

        let err = library.get(Duration::from_millis(20)).unwrap_err();
        match err {
            LoaderError::Timeout { library, .. } => assert_eq!(library, "glacial"),
            other => panic!("expected timeout, got {other}"),
        }
        assert!(!library.is_loaded());
    }

    #[test]
    fn failure_is_reported_to_every_caller() {
        let library: LazyLibrary<()> =
            LazyLibrary::new("broken", || Err("missing entry point".to_string()));

        for _ in 0..2 {
            let err = library.get(Duration::from_secs(5)).unwrap_err();
            match err {
                LoaderError::Failed { message, .. } => {
                    assert_eq!(message, "missing entry point")
                }
                other => panic!("expected failure, got {other}"),
            }
        }
        assert!(!library.is_loaded());
    }

    #[test]
    fn timed_out_caller_can_observe_a_later_ready_state() {
        let library = LazyLibrary::new("eventual", || {
            thread::sleep(Duration::from_millis(80));
            Ok::<_, String>("ready")
        });

        assert!(library.get(Duration::from_millis(5)).is_err());

        // The background load keeps going; a later bounded wait succeeds.
        let value = library.get(Duration::from_secs(5)).unwrap();
        assert_eq!(*value, "ready");
    }
}
