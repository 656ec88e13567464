//! Transport sessions.
//!
//! A [`Session`] is the handle to one bound duplex WebSocket: a pure text
//! conduit with no protocol semantics. The actual socket halves are owned
//! by the connection's I/O task; the session hands frames to that task
//! through a bounded channel, so it stays cheap to clone and safe to use
//! from any number of callers.

use tokio::sync::mpsc;

use crate::error::SessionError;

/// A frame queued for the write side of a session.
#[derive(Debug)]
pub(crate) enum OutboundFrame {
    /// A text payload.
    Text(String),
    /// A graceful close request with its reason.
    Close(String),
}

/// Handle to one bound transport session.
#[derive(Debug, Clone)]
pub struct Session {
    frames: mpsc::Sender<OutboundFrame>,
}

impl Session {
    /// Creates a session handle and the receiving end for the I/O task.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (frames, rx) = mpsc::channel(capacity);
        (Self { frames }, rx)
    }

    /// Queues a text frame.
    ///
    /// Fails with [`SessionError::Closed`] once the transport's writer is
    /// gone.
    pub async fn send_text(&self, text: String) -> Result<(), SessionError> {
        self.frames
            .send(OutboundFrame::Text(text))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Requests a graceful close with the given reason.
    pub async fn close(&self, reason: &str) -> Result<(), SessionError> {
        self.frames
            .send(OutboundFrame::Close(reason.to_string()))
            .await
            .map_err(|_| SessionError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_reach_the_io_task() {
        let (session, mut rx) = Session::channel(4);
        session.send_text("hello".to_string()).await.unwrap();
        session.close("bye").await.unwrap();

        assert!(matches!(rx.recv().await, Some(OutboundFrame::Text(t)) if t == "hello"));
        assert!(matches!(rx.recv().await, Some(OutboundFrame::Close(r)) if r == "bye"));
    }

    #[tokio::test]
    async fn send_fails_once_the_io_task_is_gone() {
        let (session, rx) = Session::channel(4);
        drop(rx);
        assert!(matches!(
            session.send_text("hello".to_string()).await,
            Err(SessionError::Closed)
        ));
    }
}
