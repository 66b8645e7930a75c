//! Bounded connection pool with automatic replacement and keepalive.
//!
//! The pool owns a FIFO queue of idle connections guarded by a counting
//! semaphore: available permits always equal the number of idle
//! connections. A permit is consumed on every borrow and only re-added
//! once the connection, or its replacement, is back in the queue. After
//! initial population the pool therefore holds exactly `capacity`
//! connections across {idle, borrowed, being established}.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::{PoolConfig, UnclassifiedPolicy};
use crate::connector::Connector;
use crate::error::{Classify, PoolError};

/// A bounded pool of ready connections.
///
/// Cloning is cheap; all clones share the same state.
pub struct Pool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    /// Idle connections, oldest first. Replacements land at the tail.
    idle: Mutex<VecDeque<C::Conn>>,
    /// One permit per entry in `idle`. Starts empty; population adds them.
    permits: Semaphore,
    /// Connections currently being (re)established.
    connecting: AtomicUsize,
}

impl<C: Connector> Pool<C> {
    /// Create the pool and start filling it.
    ///
    /// All `capacity` permits begin reserved; each population task releases
    /// one when its connection is established. Task `i` is delayed by
    /// `i × spawn_frequency` so the remote endpoint does not see a burst of
    /// simultaneous connection attempts. If a keepalive interval is
    /// configured, the keepalive loop is started as well.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] when `config` fails validation.
    pub fn new(connector: C, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let capacity = config.capacity;
        let keepalive = config.keepalive;
        let inner = Arc::new(PoolInner {
            connector,
            config,
            idle: Mutex::new(VecDeque::with_capacity(capacity)),
            permits: Semaphore::new(0),
            connecting: AtomicUsize::new(capacity),
        });

        for i in 0..capacity {
            let inner = Arc::clone(&inner);
            let delay = inner.config.spawn_frequency * i as u32;
            tokio::spawn(async move {
                sleep(delay).await;
                inner.add_one().await;
            });
        }

        let pool = Self { inner };
        if let Some(interval) = keepalive {
            tokio::spawn(pool.clone().keepalive_loop(interval));
        }
        Ok(pool)
    }

    /// Borrow a connection.
    ///
    /// Suspends until a connection is idle, then hands out the oldest one.
    /// The returned guard dereferences to the connection. Dropping the
    /// guard returns the connection to the pool; use
    /// [`PooledConn::release`] instead to route a borrow outcome through
    /// failure classification.
    ///
    /// There is no timeout: if the endpoint is down, this waits until
    /// reconnection succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolClosed`] once [`close`](Pool::close) has
    /// been called.
    pub async fn acquire(&self) -> Result<PooledConn<C>, PoolError> {
        let permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| PoolError::PoolClosed)?;
        // The permit is consumed here and only re-added once the
        // connection, or its replacement, is back in the queue.
        permit.forget();

        let conn = self.inner.idle.lock().pop_front();
        match conn {
            Some(conn) => {
                tracing::trace!("connection borrowed");
                Ok(PooledConn {
                    conn: Some(conn),
                    pool: Arc::clone(&self.inner),
                })
            }
            // Only reachable when `close` drained the queue between the
            // permit grant and the pop.
            None => Err(PoolError::PoolClosed),
        }
    }

    /// Get a snapshot of pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let idle = self.inner.idle.lock().len();
        let connecting = self.inner.connecting.load(Ordering::Relaxed);
        let capacity = self.inner.config.capacity;
        PoolStatus {
            capacity,
            idle,
            connecting,
            in_use: capacity.saturating_sub(idle + connecting),
        }
    }

    /// Close the pool, dropping all idle connections.
    ///
    /// Blocked and future [`acquire`](Pool::acquire) calls return
    /// [`PoolError::PoolClosed`]; reconnection tasks and the keepalive
    /// loop exit. Borrowed connections are dropped when their guards go
    /// out of scope.
    pub fn close(&self) {
        self.inner.permits.close();
        self.inner.idle.lock().clear();
        tracing::debug!("connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Periodically draw one connection and probe it.
    ///
    /// Probe load is spread evenly over the cycle: one probe every
    /// `interval / capacity`. A classified probe failure is swallowed,
    /// since releasing the guard already discarded the connection and
    /// scheduled a replacement. An unclassified probe error stops the
    /// loop; supervision beyond that is the embedder's concern.
    async fn keepalive_loop(self, interval: Duration) {
        let delay = interval / self.inner.config.capacity as u32;
        loop {
            sleep(delay).await;
            let Ok(mut conn) = self.acquire().await else {
                break;
            };
            let result = self.inner.connector.probe(&mut conn).await;
            if let Err(err) = conn.release(result) {
                if err.is_disconnect() {
                    tracing::debug!(error = %err, "keepalive probe found a broken connection");
                } else {
                    tracing::error!(error = %err, "keepalive probe failed; stopping keepalive loop");
                    break;
                }
            }
        }
    }
}

impl<C: Connector> PoolInner<C> {
    /// Establish one connection, retrying forever, and put it in the queue.
    ///
    /// Used both for initial population and for replacing a discarded
    /// connection. While the factory reports "not ready" the task sleeps
    /// with exponential backoff, doubling from `spawn_frequency` up to
    /// `max_backoff`. There is no give-up: a connection slot must
    /// eventually be filled, unless the pool is closed first.
    async fn add_one(&self) {
        let mut backoff = self.config.spawn_frequency;
        let conn = loop {
            if self.permits.is_closed() {
                self.connecting.fetch_sub(1, Ordering::Relaxed);
                return;
            }
            match self.connector.connect().await {
                Some(conn) => break conn,
                None => {
                    tracing::debug!(
                        backoff_ms = backoff.as_millis() as u64,
                        "endpoint not ready; backing off"
                    );
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        };
        if self.permits.is_closed() {
            self.connecting.fetch_sub(1, Ordering::Relaxed);
            return;
        }
        self.idle.lock().push_back(conn);
        self.connecting.fetch_sub(1, Ordering::Relaxed);
        self.permits.add_permits(1);
        tracing::trace!("connection added to pool");
    }

    /// Schedule a replacement for a discarded connection.
    ///
    /// The discarded connection's permit stays reserved until the
    /// replacement lands, so acquirers cannot observe phantom capacity.
    fn schedule_replacement(self: &Arc<Self>) {
        self.connecting.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            sleep(inner.config.replace_delay).await;
            inner.add_one().await;
        });
    }

    /// Return an intact connection to the queue tail.
    fn put_back(&self, conn: C::Conn) {
        if self.permits.is_closed() {
            return;
        }
        self.idle.lock().push_back(conn);
        self.permits.add_permits(1);
        tracing::trace!("connection returned to pool");
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Fixed pool size.
    pub capacity: usize,
    /// Connections idle in the pool.
    pub idle: usize,
    /// Connections currently borrowed.
    pub in_use: usize,
    /// Connections being (re)established.
    pub connecting: usize,
}

/// A connection borrowed from the pool.
///
/// Dereferences to the connection. Dropping the guard returns the
/// connection to the pool unchanged; [`release`](PooledConn::release)
/// routes a borrow outcome through failure classification first, and
/// [`discard`](PooledConn::discard) / [`detach`](PooledConn::detach)
/// remove the connection permanently while scheduling a replacement.
#[must_use]
pub struct PooledConn<C: Connector> {
    conn: Option<C::Conn>,
    pool: Arc<PoolInner<C>>,
}

impl<C: Connector> PooledConn<C> {
    /// Classify a borrow outcome and release the connection accordingly.
    ///
    /// A classified error discards the connection and schedules an
    /// asynchronous replacement; the pool returns to capacity once the
    /// replacement is established. `Ok` returns the connection to the
    /// pool, and an unclassified error follows
    /// [`PoolConfig::on_unclassified`](crate::PoolConfig::on_unclassified).
    /// The result itself passes through untouched, so this composes with
    /// `?` and with [`retry`](crate::retry()).
    pub fn release<T, E: Classify>(mut self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.put_back(),
            Err(err) if err.is_disconnect() => self.discard_now(),
            Err(_) => match self.pool.config.on_unclassified {
                UnclassifiedPolicy::Reuse => self.put_back(),
                UnclassifiedPolicy::Replace => self.discard_now(),
            },
        }
        result
    }

    /// Discard the connection unconditionally and schedule a replacement.
    pub fn discard(mut self) {
        self.discard_now();
    }

    /// Remove the connection from the pool permanently and take ownership.
    ///
    /// A replacement is scheduled, so the pool still returns to capacity.
    pub fn detach(mut self) -> C::Conn {
        self.pool.schedule_replacement();
        match self.conn.take() {
            Some(conn) => conn,
            None => unreachable!("guard holds a connection until consumed"),
        }
    }

    fn put_back(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }

    fn discard_now(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn);
            tracing::debug!("discarding broken connection");
            self.pool.schedule_replacement();
        }
    }
}

impl<C: Connector> Deref for PooledConn<C> {
    type Target = C::Conn;

    fn deref(&self) -> &C::Conn {
        match &self.conn {
            Some(conn) => conn,
            // `conn` is only vacated by methods that consume the guard.
            None => unreachable!(),
        }
    }
}

impl<C: Connector> DerefMut for PooledConn<C> {
    fn deref_mut(&mut self) -> &mut C::Conn {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!(),
        }
    }
}

impl<C: Connector> Drop for PooledConn<C> {
    fn drop(&mut self) {
        // Success path: the borrower reported nothing, keep the connection.
        self.put_back();
    }
}
