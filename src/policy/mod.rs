// ABOUTME: Policy hooks consulted before a message reaches the radio
// ABOUTME: Emergency classification, blocked-number notification, quota, short codes, FDN and properties

pub mod blocked_numbers;
pub mod emergency;
pub mod fdn;
pub mod properties;
pub mod usage_monitor;

pub use blocked_numbers::{
    BlockedNumberNotifier, BlockedNumberProvider, NoopBlockedNumberProvider, ProviderError,
};
pub use emergency::{
    Country, CountryDetector, CountrySource, EmergencyPolicyContext, NoCountryDetector,
};
pub use fdn::FixedDialing;
pub use properties::{EnvProperties, MapProperties, PropertySource, ECC_LIST_PROPERTY};
pub use usage_monitor::{
    CountryShortCodes, PremiumSmsPermission, ShortCodeCategory, ShortCodeRules, SmsUsageMonitor,
    UsageLimits, UsageStatistics,
};
