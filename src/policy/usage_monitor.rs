// ABOUTME: Per-package SMS quota over a sliding window and premium short-code classification
// ABOUTME: Decides when the user must confirm a send before it reaches the radio

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Sending quota applied to every package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    /// Messages allowed inside one window (default: 30)
    pub max_count: usize,
    /// Length of the sliding window (default: 30 minutes)
    pub check_period: Duration,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            max_count: 30,
            check_period: Duration::from_secs(30 * 60),
        }
    }
}

impl UsageLimits {
    pub fn new(max_count: usize, check_period: Duration) -> Self {
        Self {
            max_count,
            check_period,
        }
    }
}

/// How a destination is treated with respect to premium charging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCodeCategory {
    /// A regular phone number
    NotShortCode,
    /// Known free short code
    FreeShortCode,
    /// Short code without premium charging
    StandardShortCode,
    /// Known premium-rate short code
    PremiumShortCode,
}

impl ShortCodeCategory {
    pub fn is_premium(&self) -> bool {
        matches!(self, ShortCodeCategory::PremiumShortCode)
    }
}

/// Whether a package may send to premium short codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PremiumSmsPermission {
    /// Prompt the user for each premium send
    #[default]
    Ask,
    NeverAllow,
    AlwaysAllow,
}

/// Short-code lists for one country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryShortCodes {
    /// Longest destination still treated as a short code
    pub max_len: usize,
    pub free: Vec<String>,
    pub premium: Vec<String>,
    /// Any short code starting with one of these is premium
    pub premium_prefixes: Vec<String>,
}

impl Default for CountryShortCodes {
    fn default() -> Self {
        Self {
            max_len: 6,
            free: Vec::new(),
            premium: Vec::new(),
            premium_prefixes: Vec::new(),
        }
    }
}

impl CountryShortCodes {
    pub fn with_free(mut self, code: impl Into<String>) -> Self {
        self.free.push(code.into());
        self
    }

    pub fn with_premium(mut self, code: impl Into<String>) -> Self {
        self.premium.push(code.into());
        self
    }

    pub fn with_premium_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.premium_prefixes.push(prefix.into());
        self
    }
}

/// Short-code rules keyed by ISO country code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortCodeRules {
    countries: HashMap<String, CountryShortCodes>,
}

/// Longest short code recognised for a country without rules
const DEFAULT_SHORT_CODE_LEN: usize = 5;

impl ShortCodeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_country(mut self, iso: impl AsRef<str>, codes: CountryShortCodes) -> Self {
        self.countries.insert(iso.as_ref().to_ascii_lowercase(), codes);
        self
    }

    /// Classify a destination for the detected country
    ///
    /// Without rules for the country a short code is only ever standard.
    pub fn classify(&self, country: Option<&str>, destination: &str) -> ShortCodeCategory {
        let digits: String = destination
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return ShortCodeCategory::NotShortCode;
        }

        let rules = country.and_then(|iso| self.countries.get(&iso.to_ascii_lowercase()));
        let Some(rules) = rules else {
            return if digits.len() <= DEFAULT_SHORT_CODE_LEN {
                ShortCodeCategory::StandardShortCode
            } else {
                ShortCodeCategory::NotShortCode
            };
        };

        if digits.len() > rules.max_len {
            ShortCodeCategory::NotShortCode
        } else if rules.free.contains(&digits) {
            ShortCodeCategory::FreeShortCode
        } else if rules.premium.contains(&digits)
            || rules.premium_prefixes.iter().any(|p| digits.starts_with(p.as_str()))
        {
            ShortCodeCategory::PremiumShortCode
        } else {
            ShortCodeCategory::StandardShortCode
        }
    }
}

/// Counters for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageStatistics {
    /// Quota checks performed
    pub checks: u64,
    /// Checks that stayed within the quota
    pub within_limit: u64,
    /// Checks that would have exceeded the quota
    pub over_limit: u64,
    /// Messages recorded after the user allowed an over-quota send
    pub user_approved: u64,
}

/// Tracks sending history per package
#[derive(Debug)]
pub struct SmsUsageMonitor {
    limits: UsageLimits,
    rules: ShortCodeRules,
    permissions: HashMap<String, PremiumSmsPermission>,
    history: HashMap<String, VecDeque<Instant>>,
    statistics: UsageStatistics,
}

impl SmsUsageMonitor {
    pub fn new(limits: UsageLimits, rules: ShortCodeRules) -> Self {
        Self {
            limits,
            rules,
            permissions: HashMap::new(),
            history: HashMap::new(),
            statistics: UsageStatistics::default(),
        }
    }

    /// Record `count` messages for `package` if they fit the quota
    ///
    /// Returns false, recording nothing, when the window is full.
    pub fn check(&mut self, package: &str, count: usize) -> bool {
        self.statistics.checks += 1;
        let now = Instant::now();
        let period = self.limits.check_period;
        let sent = self.history.entry(package.to_string()).or_default();

        while let Some(&oldest) = sent.front() {
            if now.duration_since(oldest) >= period {
                sent.pop_front();
            } else {
                break;
            }
        }

        if sent.len() + count > self.limits.max_count {
            self.statistics.over_limit += 1;
            return false;
        }

        sent.extend(std::iter::repeat_n(now, count));
        self.statistics.within_limit += 1;
        true
    }

    /// Record messages the user allowed past the quota
    pub fn record(&mut self, package: &str, count: usize) {
        let now = Instant::now();
        self.history
            .entry(package.to_string())
            .or_default()
            .extend(std::iter::repeat_n(now, count));
        self.statistics.user_approved += count as u64;
    }

    pub fn check_destination(&self, country: Option<&str>, destination: &str) -> ShortCodeCategory {
        self.rules.classify(country, destination)
    }

    pub fn premium_permission(&self, package: &str) -> PremiumSmsPermission {
        self.permissions.get(package).copied().unwrap_or_default()
    }

    pub fn set_premium_permission(&mut self, package: impl Into<String>, permission: PremiumSmsPermission) {
        self.permissions.insert(package.into(), permission);
    }

    pub fn statistics(&self) -> &UsageStatistics {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_counts_messages_per_package() {
        let mut monitor = SmsUsageMonitor::new(UsageLimits::new(3, Duration::from_secs(60)), ShortCodeRules::new());
        assert!(monitor.check("a", 2));
        assert!(!monitor.check("a", 2));
        assert!(monitor.check("a", 1));
        assert!(!monitor.check("a", 1));
        // Other packages have their own window
        assert!(monitor.check("b", 3));

        let stats = monitor.statistics();
        assert_eq!(stats.checks, 5);
        assert_eq!(stats.over_limit, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let mut monitor = SmsUsageMonitor::new(UsageLimits::new(1, Duration::from_secs(60)), ShortCodeRules::new());
        assert!(monitor.check("a", 1));
        assert!(!monitor.check("a", 1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(monitor.check("a", 1));
    }

    #[test]
    fn recorded_approvals_count_against_the_window() {
        let mut monitor = SmsUsageMonitor::new(UsageLimits::new(2, Duration::from_secs(60)), ShortCodeRules::new());
        monitor.record("a", 2);
        assert!(!monitor.check("a", 1));
        assert_eq!(monitor.statistics().user_approved, 2);
    }

    #[test]
    fn classification_without_rules() {
        let rules = ShortCodeRules::new();
        assert_eq!(rules.classify(None, "12345"), ShortCodeCategory::StandardShortCode);
        assert_eq!(rules.classify(Some("us"), "6501002000"), ShortCodeCategory::NotShortCode);
        assert_eq!(rules.classify(None, "+1234"), ShortCodeCategory::NotShortCode);
    }

    #[test]
    fn classification_with_country_rules() {
        let rules = ShortCodeRules::new().with_country(
            "US",
            CountryShortCodes::default()
                .with_free("40404")
                .with_premium("87654")
                .with_premium_prefix("9"),
        );
        assert_eq!(rules.classify(Some("us"), "40404"), ShortCodeCategory::FreeShortCode);
        assert_eq!(rules.classify(Some("us"), "87654"), ShortCodeCategory::PremiumShortCode);
        assert_eq!(rules.classify(Some("us"), "91234"), ShortCodeCategory::PremiumShortCode);
        assert_eq!(rules.classify(Some("us"), "22222"), ShortCodeCategory::StandardShortCode);
        assert_eq!(rules.classify(Some("us"), "1234567"), ShortCodeCategory::NotShortCode);
        // Rules do not leak to other countries
        assert_eq!(rules.classify(Some("gb"), "87654"), ShortCodeCategory::StandardShortCode);
    }

    #[test]
    fn premium_permission_defaults_to_ask() {
        let mut monitor = SmsUsageMonitor::new(UsageLimits::default(), ShortCodeRules::new());
        assert_eq!(monitor.premium_permission("a"), PremiumSmsPermission::Ask);
        monitor.set_premium_permission("a", PremiumSmsPermission::NeverAllow);
        assert_eq!(monitor.premium_permission("a"), PremiumSmsPermission::NeverAllow);
    }
}
