use crate::api::ClientError;
use std::time::Duration;
use tokio::time::sleep;

/// Exponential backoff for idempotent reads.
///
/// `max_retries = 0` disables retrying: the first failure propagates.
/// Delays double per attempt and are clamped to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u8,
    base_delay: Duration,
    max_delay: Duration,
}

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

impl RetryPolicy {
    pub fn new(max_retries: u8, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY.max(base_delay),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn none() -> Self {
        Self::new(0, Duration::from_secs(1))
    }

    pub fn max_retries(&self) -> u8 {
        self.max_retries
    }

    pub fn should_retry(&self, attempt: u8, error: &ClientError) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        error.is_retryable()
    }

    pub fn delay_for(&self, attempt: u8) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt as u32);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
            .max(Duration::from_millis(1))
    }

    pub async fn wait_before_retry(&self, attempt: u8) {
        let delay = self.delay_for(attempt);

        tracing::info!(
            "Retrying in {}ms (attempt {})",
            delay.as_millis(),
            u32::from(attempt) + 2
        );
        sleep(delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable() -> ClientError {
        ClientError::Server {
            status: 503,
            message: "Service Unavailable".to_string(),
            detail: None,
            request_id: None,
        }
    }

    #[test]
    fn test_default_never_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(0, &ClientError::Network("reset".to_string())));
    }

    #[test]
    fn test_retries_only_retryable_errors() {
        let policy = RetryPolicy::new(2, Duration::from_millis(100));
        assert!(policy.should_retry(0, &unavailable()));
        assert!(policy.should_retry(1, &unavailable()));
        assert!(!policy.should_retry(2, &unavailable()));
        assert!(!policy.should_retry(0, &ClientError::Protocol("bad".to_string())));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_clamps_at_max() {
        let policy = RetryPolicy::new(255, Duration::from_millis(250))
            .with_max_delay(Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(254), Duration::from_secs(2));

        let default_cap = RetryPolicy::new(255, Duration::from_secs(1));
        assert_eq!(default_cap.delay_for(200), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_attempt_logs_without_overflow() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let policy = RetryPolicy::new(255, Duration::from_millis(10));
        policy.wait_before_retry(254).await;
    }
}
