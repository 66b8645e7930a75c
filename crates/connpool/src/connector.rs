//! Collaborator trait for connection establishment and liveness probing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Classify;

/// Supplies the pool with connections and application-level probes.
///
/// Implementations own the transport details; the pool only sees opaque
/// [`Conn`](Connector::Conn) values and moves them between the idle queue
/// and a single borrower at a time.
///
/// `#[async_trait]` is used so the returned futures are `Send` and the
/// trait stays object-safe.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type managed by the pool.
    type Conn: Send + 'static;

    /// Error type raised by [`probe`](Connector::probe).
    type Error: Classify + std::error::Error + Send + 'static;

    /// Establish one connection.
    ///
    /// `None` means the endpoint is not ready yet. The pool sleeps with
    /// exponential backoff and calls again, forever; it is never treated
    /// as an error.
    async fn connect(&self) -> Option<Self::Conn>;

    /// Application-level liveness check on an idle connection.
    ///
    /// Called by the keepalive loop when
    /// [`PoolConfig::keepalive`](crate::PoolConfig::keepalive) is set. A
    /// classified error discards the connection and schedules a
    /// replacement; an unclassified error stops the keepalive loop.
    ///
    /// The default implementation accepts every connection.
    async fn probe(&self, conn: &mut Self::Conn) -> Result<(), Self::Error> {
        let _ = conn;
        Ok(())
    }
}

/// Delegating impl so a shared connector (`Arc<C>`) can drive a pool.
#[async_trait]
impl<C: Connector> Connector for Arc<C> {
    type Conn = C::Conn;
    type Error = C::Error;

    async fn connect(&self) -> Option<Self::Conn> {
        C::connect(self).await
    }

    async fn probe(&self, conn: &mut Self::Conn) -> Result<(), Self::Error> {
        C::probe(self, conn).await
    }
}
