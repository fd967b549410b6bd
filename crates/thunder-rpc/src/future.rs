//! One-shot synchronization primitive pairing a request id with its reply.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use thunder_proto::Packet;
use tokio::sync::Notify;

use crate::error::RpcError;

/// Completion callback registered by `invoke_async`.
///
/// Fires at most once, on whichever of (response arrival, failure, deadline
/// expiry) resolves the future first.
pub type ResponseCallback = Box<dyn FnOnce(&ResponseFuture) + Send + 'static>;

enum Outcome {
    Response(Packet),
    Failed(RpcError),
}

/// Correlation entry for one outstanding request.
///
/// The outcome slot is single-assignment: the first of [`complete`] or
/// [`fail`] wins and every later call is a no-op. The callback is guarded
/// by an atomic compare-and-set rather than a lock, so a callback that
/// issues further RPCs cannot deadlock against its own future.
///
/// At most one task waits on a given future (the issuing call site), which
/// lets completion signal through a stored-permit [`Notify`].
///
/// [`complete`]: ResponseFuture::complete
/// [`fail`]: ResponseFuture::fail
pub struct ResponseFuture {
    packet_id: i32,
    outcome: Mutex<Option<Outcome>>,
    callback: Mutex<Option<ResponseCallback>>,
    callback_fired: AtomicBool,
    done: Notify,
}

impl ResponseFuture {
    /// Create a future for the given correlation id.
    pub fn new(packet_id: i32, callback: Option<ResponseCallback>) -> Self {
        Self {
            packet_id,
            outcome: Mutex::new(None),
            callback: Mutex::new(callback),
            callback_fired: AtomicBool::new(false),
            done: Notify::new(),
        }
    }

    /// Correlation id this future is registered under.
    pub fn packet_id(&self) -> i32 {
        self.packet_id
    }

    /// Install the response, fire the callback, and wake the waiter.
    ///
    /// No-op if the future already resolved.
    pub fn complete(&self, packet: Packet) {
        self.resolve(Outcome::Response(packet));
    }

    /// Install an error, fire the callback, and wake the waiter.
    ///
    /// No-op if the future already resolved.
    pub fn fail(&self, error: RpcError) {
        self.resolve(Outcome::Failed(error));
    }

    fn resolve(&self, outcome: Outcome) {
        {
            let mut slot = self.outcome.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if slot.is_some() {
                return;
            }
            *slot = Some(outcome);
        }
        self.fire_callback();
        self.done.notify_one();
    }

    fn fire_callback(&self) {
        if self
            .callback_fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let callback = self
                .callback
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(callback) = callback {
                callback(self);
            }
        }
    }

    /// The installed response, if the future resolved successfully.
    pub fn response(&self) -> Option<Packet> {
        match &*self.outcome.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            Some(Outcome::Response(packet)) => Some(packet.clone()),
            _ => None,
        }
    }

    /// The installed error, if the future resolved with one.
    pub fn error(&self) -> Option<RpcError> {
        match &*self.outcome.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            Some(Outcome::Failed(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Suspend until the future resolves or the deadline elapses.
    ///
    /// Returns the response packet, the installed error, or
    /// [`RpcError::Timeout`] if the deadline fired first. Resolution by the
    /// receive path after a timeout here is harmless: the issuing call site
    /// removes the correlation entry, so the late response is dropped.
    pub async fn wait(&self, timeout: Duration) -> Result<Packet, RpcError> {
        if tokio::time::timeout(timeout, self.done.notified()).await.is_err() {
            return Err(RpcError::Timeout);
        }

        let outcome =
            self.outcome.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        match outcome {
            Some(Outcome::Response(packet)) => Ok(packet),
            Some(Outcome::Failed(error)) => Err(error),
            None => Err(RpcError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use bytes::Bytes;

    use super::*;

    fn reply(id: i32) -> Packet {
        let mut packet = Packet::new(1, Bytes::new());
        packet.packet_id = id;
        packet.mark_response();
        packet
    }

    #[tokio::test]
    async fn wait_returns_installed_response() {
        let future = Arc::new(ResponseFuture::new(7, None));
        let waiter = Arc::clone(&future);
        let handle = tokio::spawn(async move { waiter.wait(Duration::from_secs(1)).await });

        future.complete(reply(7));
        let packet = handle.await.unwrap().unwrap();
        assert_eq!(packet.packet_id, 7);
        assert!(packet.is_response());
    }

    #[tokio::test]
    async fn wait_after_complete_does_not_block() {
        // complete() before wait(): the stored notify permit must carry over.
        let future = ResponseFuture::new(8, None);
        future.complete(reply(8));
        let packet = future.wait(Duration::from_millis(10)).await.unwrap();
        assert_eq!(packet.packet_id, 8);
    }

    #[tokio::test]
    async fn wait_times_out_without_response() {
        let future = ResponseFuture::new(9, None);
        let result = future.wait(Duration::from_millis(20)).await;
        assert_eq!(result, Err(RpcError::Timeout));
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let future = ResponseFuture::new(10, None);
        future.complete(reply(10));
        future.fail(RpcError::Timeout);
        future.complete(reply(99));

        assert_eq!(future.response().map(|p| p.packet_id), Some(10));
        assert!(future.error().is_none());
    }

    #[tokio::test]
    async fn callback_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        let future = ResponseFuture::new(11, Some(Box::new(move |_f| {
            observed.fetch_add(1, Ordering::SeqCst);
        })));

        future.complete(reply(11));
        future.complete(reply(11));
        future.fail(RpcError::ConnectionLost);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn callback_observes_failure() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let future = ResponseFuture::new(12, Some(Box::new(move |f: &ResponseFuture| {
            *sink.lock().unwrap() = f.error();
        })));

        future.fail(RpcError::Timeout);
        assert_eq!(*seen.lock().unwrap(), Some(RpcError::Timeout));
    }
}
