//! # connpool
//!
//! Bounded pool of long-lived network connections for async consumers.
//!
//! ## Features
//!
//! - Fixed, configurable pool size with FIFO lending
//! - Staggered initial population to avoid connection storms
//! - Automatic replacement of broken connections, with exponential backoff
//!   while the remote endpoint is down
//! - Optional periodic application-level keepalive probing
//! - A [`retry`](retry()) wrapper that reissues an operation when it fails
//!   on a broken connection
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use connpool::{retry, Connector, Pool, PoolConfig, RetryPolicy};
//!
//! let config = PoolConfig::new(10).keepalive(Duration::from_secs(30));
//! let pool = Pool::new(MyConnector::new(addr), config)?;
//!
//! let policy = RetryPolicy::new()
//!     .max_failures(3)
//!     .interval(Duration::from_millis(250));
//!
//! let reply = retry("send_command", &policy, || async {
//!     let mut conn = pool.acquire().await.map_err(io::Error::other)?;
//!     let outcome = send_command(&mut conn).await;
//!     conn.release(outcome)
//! })
//! .await?;
//! ```
//!
//! ## Failure classification
//!
//! The pool never invents its own error type for a borrow. The borrower's
//! error is the signal: implement [`Classify`] on it to mark which kinds
//! mean "this connection is broken". Classified failures discard the
//! connection and schedule a replacement; everything else propagates
//! unchanged and the connection is kept (configurable via
//! [`UnclassifiedPolicy`]).

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connector;
pub mod error;
pub mod pool;
pub mod retry;

pub use config::{PoolConfig, UnclassifiedPolicy};
pub use connector::Connector;
pub use error::{Classify, PoolError};
pub use pool::{Pool, PoolStatus, PooledConn};
pub use retry::{retry, RetryPolicy};
