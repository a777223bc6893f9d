use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::clock::Clock;

/// Reminder times have minute granularity, so one scan per minute.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// One scheduling tick. Carries the instant the trigger observed it so scan
/// matching does not drift with processing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub at: DateTime<Utc>,
}

/// The explicit periodic task driving the scheduler. The hosting process
/// owns it and stops it through the cancellation token.
pub struct PeriodicTrigger {
    next: Sender<Tick>,
    shutdown: CancellationToken,
    interval: Duration,
    clock: Box<dyn Clock>,
}

impl PeriodicTrigger {
    pub fn new(
        next: Sender<Tick>,
        shutdown: CancellationToken,
        interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            shutdown,
            interval,
            clock,
        }
    }

    /// Executes the trigger event loop. Sending into a bounded channel is the
    /// back-pressure: while the scheduler is still scanning, the next tick
    /// waits instead of overlapping it.
    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.clock.instant();
        loop {
            tick_point += self.interval;

            let tick = Tick {
                at: self.clock.now(),
            };
            debug!("Emitting tick at {}", tick.at);
            if self.next.send(tick).await.is_err() {
                info!("Tick receiver is gone, stopping the trigger");
                return Ok(());
            }

            tokio::select! {
                // Cancelation stops the loop and drops the sender, which in
                // turn ends the scheduler's receive loop.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::utils::clock::SystemClock;

    use super::{PeriodicTrigger, Tick};

    #[tokio::test(start_paused = true)]
    async fn trigger_emits_ticks_until_cancelled() -> Result<()> {
        let (sender, mut receiver) = mpsc::channel::<Tick>(8);
        let shutdown = CancellationToken::new();
        let trigger = PeriodicTrigger::new(
            sender,
            shutdown.clone(),
            Duration::from_secs(60),
            Box::new(SystemClock),
        );

        let handle = tokio::spawn(trigger.run());

        for _ in 0..3 {
            assert!(receiver.recv().await.is_some());
        }

        shutdown.cancel();
        handle.await??;
        assert!(receiver.recv().await.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_stops_when_the_receiver_is_dropped() -> Result<()> {
        let (sender, receiver) = mpsc::channel::<Tick>(1);
        let trigger = PeriodicTrigger::new(
            sender,
            CancellationToken::new(),
            Duration::from_secs(60),
            Box::new(SystemClock),
        );
        drop(receiver);

        trigger.run().await?;
        Ok(())
    }
}
