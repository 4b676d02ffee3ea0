use crate::error::{DataSetError, PoolTimeoutError};
use parking_lot::{Condvar, Mutex};
use std::{
    fmt,
    io::{self, Read, Seek},
    ops::{Deref, DerefMut},
    time::{Duration, Instant},
};

/// Seekable reader over a data set source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Creates a new reader over the data set source.
pub type ReaderFactory = Box<dyn Fn() -> io::Result<Box<dyn ReadSeek>> + Send + Sync>;

/// Bounded pool of readers used by the stream backend.
///
/// Readers are created lazily up to `size`. A caller finding the pool
/// exhausted blocks until a reader is returned, or fails with a
/// [`PoolTimeoutError`] once the timeout has elapsed.
pub(crate) struct ReaderPool {
    factory: ReaderFactory,
    state: Mutex<PoolState>,
    returned: Condvar,
    size: usize,
    timeout: Duration,
}

struct PoolState {
    idle: Vec<Box<dyn ReadSeek>>,
    created: usize,
}

impl ReaderPool {
    pub(crate) fn new(factory: ReaderFactory, size: usize, timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            factory,
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(size),
                created: 0,
            }),
            returned: Condvar::new(),
            size,
            timeout,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Amount of readers created so far.
    pub(crate) fn created(&self) -> usize {
        self.state.lock().created
    }

    /// Take a reader out of the pool for the duration of one read.
    pub(crate) fn acquire(&self) -> Result<PooledReader<'_>, DataSetError> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(reader) = state.idle.pop() {
                return Ok(PooledReader {
                    pool: self,
                    reader: Some(reader),
                });
            }

            if state.created < self.size {
                state.created += 1;
                let created = state.created;
                drop(state);
                tracing::trace!("create stream reader {created} of {}", self.size);
                return match (self.factory)() {
                    Ok(reader) => Ok(PooledReader {
                        pool: self,
                        reader: Some(reader),
                    }),
                    Err(err) => {
                        self.state.lock().created -= 1;
                        self.returned.notify_one();
                        Err(DataSetError::Io(err))
                    }
                };
            }

            if self.returned.wait_until(&mut state, deadline).timed_out() {
                tracing::warn!(
                    "stream reader pool exhausted: {} readers busy for {:?}",
                    self.size,
                    self.timeout
                );
                return Err(PoolTimeoutError {
                    waited: self.timeout,
                    size: self.size,
                }
                .into());
            }
        }
    }

    fn release(&self, reader: Box<dyn ReadSeek>) {
        self.state.lock().idle.push(reader);
        self.returned.notify_one();
    }
}

impl fmt::Debug for ReaderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderPool")
            .field("size", &self.size)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Reader borrowed from a [`ReaderPool`], returned on drop.
pub(crate) struct PooledReader<'a> {
    pool: &'a ReaderPool,
    reader: Option<Box<dyn ReadSeek>>,
}

impl fmt::Debug for PooledReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledReader").finish_non_exhaustive()
    }
}

impl Deref for PooledReader<'_> {
    type Target = dyn ReadSeek;

    fn deref(&self) -> &Self::Target {
        match &self.reader {
            Some(reader) => reader.as_ref(),
            None => unreachable_reader(),
        }
    }
}

impl DerefMut for PooledReader<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.reader {
            Some(reader) => reader.as_mut(),
            None => unreachable_reader(),
        }
    }
}

impl Drop for PooledReader<'_> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.pool.release(reader);
        }
    }
}

#[expect(clippy::panic, reason = "the reader is only taken on drop")]
fn unreachable_reader() -> ! {
    panic!("pooled reader used after release")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::Cursor,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    fn cursor_factory(created: Arc<AtomicUsize>) -> ReaderFactory {
        Box::new(move || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(vec![1u8, 2, 3])) as Box<dyn ReadSeek>)
        })
    }

    #[test]
    fn readers_are_reused() {
        let created = Arc::new(AtomicUsize::new(0));
        let pool = ReaderPool::new(cursor_factory(created.clone()), 2, Duration::from_secs(1));
        for _ in 0..5 {
            let mut reader = pool.acquire().unwrap();
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte).unwrap();
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let created = Arc::new(AtomicUsize::new(0));
        let pool = ReaderPool::new(cursor_factory(created), 1, Duration::from_millis(20));
        let _held = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        match err {
            DataSetError::PoolTimeout(err) => assert_eq!(err.waited(), Duration::from_millis(20)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn waiter_gets_returned_reader() {
        let created = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(ReaderPool::new(
            cursor_factory(created.clone()),
            1,
            Duration::from_secs(5),
        ));
        let held = pool.acquire().unwrap();
        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire().map(|_reader| ()).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        drop(held);
        assert!(waiter.join().unwrap());
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_error_frees_slot() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let factory: ReaderFactory = {
            let attempts = attempts.clone();
            Box::new(move || {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
                } else {
                    Ok(Box::new(Cursor::new(Vec::<u8>::new())) as Box<dyn ReadSeek>)
                }
            })
        };
        let pool = ReaderPool::new(factory, 1, Duration::from_millis(10));
        assert!(matches!(pool.acquire(), Err(DataSetError::Io(_))));
        drop(pool.acquire().unwrap());
    }
}
