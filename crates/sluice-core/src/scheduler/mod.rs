//! Control tick cadence, per-connection workers and command routing.
//!
//! Each delivery server gets a [`ConnectionWorker`] on its own thread; the
//! [`Dispatcher`] forwards download commands to the worker matching the
//! requested address and returns the worker's ack.

mod dispatch;
mod tick;
mod worker;

pub use dispatch::Dispatcher;
pub use tick::{Clock, ManualClock, SystemClock, TickScheduler};
pub use worker::{ConnectionWorker, PreparedDownload, TickReport, WorkerCommand, WorkerHandle};
