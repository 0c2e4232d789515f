use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Suspension point used by every wait in the controller, swapped out in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Copy, Clone)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded retry with a fixed delay before every attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: usize, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Waiting for the cluster to elect a new primary after the old one went away.
    pub const fn election() -> Self {
        Self::new(3, Duration::from_secs(10))
    }

    /// Waiting for the monitored service to come up at process start.
    pub const fn startup() -> Self {
        Self::new(10, Duration::from_secs(5))
    }

    /// Runs `attempt` until it yields `Some`, sleeping `delay` before each try. The attempt
    /// number passed in starts at 1.
    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, mut attempt: F) -> Option<T>
        where
            F: FnMut(usize) -> Fut,
            Fut: Future<Output=Option<T>>,
    {
        for n in 1..=self.max_attempts {
            sleeper.sleep(self.delay).await;
            if let Some(value) = attempt(n).await {
                return Some(value);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::retry::RetryPolicy;
    use crate::testkit::RecordingSleeper;

    #[tokio::test]
    async fn stops_at_first_success() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        let result = policy
            .run(&sleeper, |attempt| async move { (attempt == 3).then_some(attempt) })
            .await;
        assert_eq!(result, Some(3));
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(2); 3]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Option<()> = RetryPolicy::election()
            .run(&sleeper, |_| {
                calls += 1;
                async { None }
            })
            .await;
        assert_eq!(result, None);
        assert_eq!(calls, 3);
        assert_eq!(sleeper.total(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn zero_attempts_never_calls() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Option<()> = RetryPolicy::new(0, Duration::from_secs(1))
            .run(&sleeper, |_| {
                calls += 1;
                async { None }
            })
            .await;
        assert_eq!(result, None);
        assert_eq!(calls, 0);
        assert!(sleeper.slept().is_empty());
    }
}
