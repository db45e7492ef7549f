// ABOUTME: Dispatcher configuration: retry policy, send deadline, quota, short-code rules and FDN
// ABOUTME: Defaults match handset behaviour; builder-style setters adjust individual values

use crate::policy::{FixedDialing, PremiumSmsPermission, ShortCodeRules, UsageLimits};
use std::collections::HashMap;
use std::time::Duration;

/// How failed segments are retried
///
/// # Example
///
/// ```rust
/// use gsm_sms::dispatcher::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default().with_retry_delay(Duration::from_millis(500));
/// assert_eq!(policy.delay_before_attempt(2), Duration::ZERO);
/// assert_eq!(policy.delay_before_attempt(3), Duration::from_millis(500));
/// assert_eq!(policy.delay_before_attempt(4), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per segment, the first one included (default: 3)
    pub max_attempts: u32,

    /// Wait before the second retry (default: 2 seconds)
    ///
    /// The first retry goes out immediately.
    pub retry_delay: Duration,

    /// Growth factor for each later retry (default: 2)
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier.max(1);
        self
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn allows_another(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-based)
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        match attempt {
            0..=2 => Duration::ZERO,
            n => {
                let factor = self.backoff_multiplier.saturating_pow(n - 3);
                self.retry_delay.saturating_mul(factor)
            }
        }
    }
}

/// Configuration for a [`GsmSmsDispatcher`](crate::dispatcher::GsmSmsDispatcher)
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub retry: RetryPolicy,

    /// Time a send may take, prompts included, before it fails with
    /// `Timeout` (default: 3 minutes)
    pub send_timeout: Duration,

    pub usage_limits: UsageLimits,

    pub short_codes: ShortCodeRules,

    /// Premium short-code permission per package; unlisted packages are asked
    pub premium_permissions: HashMap<String, PremiumSmsPermission>,

    pub fixed_dialing: FixedDialing,

    /// Subscription this dispatcher serves
    pub sub_id: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            send_timeout: Duration::from_secs(3 * 60),
            usage_limits: UsageLimits::default(),
            short_codes: ShortCodeRules::default(),
            premium_permissions: HashMap::new(),
            fixed_dialing: FixedDialing::disabled(),
            sub_id: 0,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_usage_limits(mut self, limits: UsageLimits) -> Self {
        self.usage_limits = limits;
        self
    }

    pub fn with_short_codes(mut self, rules: ShortCodeRules) -> Self {
        self.short_codes = rules;
        self
    }

    pub fn with_premium_permission(
        mut self,
        package: impl Into<String>,
        permission: PremiumSmsPermission,
    ) -> Self {
        self.premium_permissions.insert(package.into(), permission);
        self
    }

    pub fn with_fixed_dialing(mut self, fdn: FixedDialing) -> Self {
        self.fixed_dialing = fdn;
        self
    }

    pub fn with_sub_id(mut self, sub_id: i32) -> Self {
        self.sub_id = sub_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_schedule() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_another(1));
        assert!(policy.allows_another(2));
        assert!(!policy.allows_another(3));
        assert_eq!(policy.delay_before_attempt(2), Duration::ZERO);
        assert_eq!(policy.delay_before_attempt(3), Duration::from_secs(2));
        assert_eq!(policy.delay_before_attempt(5), Duration::from_secs(8));
    }

    #[test]
    fn no_retries_allows_only_the_first_attempt() {
        assert!(!RetryPolicy::no_retries().allows_another(1));
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn config_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.send_timeout, Duration::from_secs(180));
        assert_eq!(config.usage_limits.max_count, 30);
        assert!(!config.fixed_dialing.is_enabled());
    }
}
