use crate::common::Frame;
use std::time::Duration;
use tokio::sync::mpsc::{error::TrySendError, Sender};
use tokio::time::MissedTickBehavior;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MIN_PERIOD: Duration = Duration::from_nanos(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub captured: u64,
    pub dropped: u64,
}

/// Emits frames at a fixed rate. Frames arriving while the pipeline is still
/// busy are discarded rather than queued.
pub struct FrameSource {
    period: Duration,
    frame_tx: Sender<Frame>,
}

impl FrameSource {
    /// Rates too high for a representable period tick every nanosecond.
    pub fn new(frame_rate: f64, frame_tx: Sender<Frame>) -> Self {
        let period = Duration::try_from_secs_f64(1.0 / frame_rate)
            .unwrap_or(MIN_PERIOD)
            .max(MIN_PERIOD);
        Self { period, frame_tx }
    }

    pub async fn run(self, cancel_token: CancellationToken) -> SourceStats {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        let mut stats = SourceStats::default();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                tick = ticks.next() => {
                    if tick.is_none() {
                        break;
                    }
                    let frame = Frame::capture(stats.captured);
                    stats.captured += 1;
                    match self.frame_tx.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(frame)) => {
                            stats.dropped += 1;
                            debug!(
                                sequence = frame.sequence(),
                                "pipeline busy, dropping late frame"
                            );
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("frame receiver closed, stopping capture");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            captured = stats.captured,
            dropped = stats.dropped,
            "frame source stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn drops_frames_when_receiver_is_busy() {
        let (frame_tx, mut frame_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let source = FrameSource::new(100.0, frame_tx);
        let task = tokio::spawn(source.run(cancel_token.clone()));

        tokio::time::sleep(Duration::from_millis(55)).await;
        cancel_token.cancel();
        let stats = task.await.unwrap();

        assert!(stats.captured >= 5);
        assert_eq!(stats.dropped, stats.captured - 1);
        let first = frame_rx.recv().await.unwrap();
        assert_eq!(first.sequence(), 0);
        assert!(frame_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn extreme_frame_rate_does_not_panic() {
        let (frame_tx, mut frame_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let source = FrameSource::new(1e12, frame_tx);
        assert_eq!(source.period, MIN_PERIOD);
        let task = tokio::spawn(source.run(cancel_token.clone()));

        assert!(frame_rx.recv().await.is_some());
        cancel_token.cancel();
        let stats = task.await.unwrap();
        assert!(stats.captured >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_receiver_closes() {
        let (frame_tx, frame_rx) = mpsc::channel(4);
        drop(frame_rx);
        let stats = FrameSource::new(30.0, frame_tx)
            .run(CancellationToken::new())
            .await;
        assert_eq!(stats.captured, 1);
        assert_eq!(stats.dropped, 0);
    }
}
