//! Notification queue configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Notification queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Buffer capacity; a full buffer drops notifications
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Delivery attempts before dead-lettering
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between delivery attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl NotificationsConfig {
    /// Get retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}
