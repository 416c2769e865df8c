use super::outcome::{CaptureError, Outcome};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Guarantees a single outcome is ever delivered to the waiting caller.
///
/// Up to four independent paths (final transcript, engine error, silence
/// fallback, cancel) can each attempt delivery; the first one wins and the
/// rest are silently dropped. Taking the oneshot sender on first delivery
/// makes a second delivery impossible by construction.
#[derive(Debug)]
pub struct ResultSink {
    reply: Option<oneshot::Sender<Result<String, CaptureError>>>,
}

impl ResultSink {
    pub fn new(reply: oneshot::Sender<Result<String, CaptureError>>) -> Self {
        Self { reply: Some(reply) }
    }

    /// Deliver `outcome` to the caller.
    ///
    /// Returns `true` if this call performed the delivery, `false` if an
    /// earlier delivery already happened.
    pub fn deliver(&mut self, outcome: Outcome) -> bool {
        match self.reply.take() {
            Some(reply) => {
                if reply.send(outcome.into_result()).is_err() {
                    warn!("caller went away before outcome delivery");
                }
                true
            }
            None => {
                debug!(?outcome, "duplicate outcome delivery dropped");
                false
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.reply.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::outcome::ErrorKind;

    #[tokio::test]
    async fn test_first_delivery_wins() {
        let (tx, rx) = oneshot::channel();
        let mut sink = ResultSink::new(tx);

        assert!(!sink.is_delivered());
        assert!(sink.deliver(Outcome::Text("first".into())));
        assert!(sink.is_delivered());

        // Every later attempt is dropped, from any path.
        assert!(!sink.deliver(Outcome::Text("second".into())));
        assert!(!sink.deliver(Outcome::Error(CaptureError::new(
            ErrorKind::EngineError,
            "late error"
        ))));

        assert_eq!(rx.await.unwrap(), Ok("first".to_string()));
    }

    #[tokio::test]
    async fn test_delivery_to_dropped_caller_still_counts() {
        let (tx, rx) = oneshot::channel::<Result<String, CaptureError>>();
        drop(rx);

        let mut sink = ResultSink::new(tx);
        assert!(sink.deliver(Outcome::Text("nobody listening".into())));
        assert!(sink.is_delivered());
    }
}
