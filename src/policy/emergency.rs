// ABOUTME: Emergency-number classification from the detected country and the configured ECC list
// ABOUTME: The policy context is resolved fresh for every send and never cached

use crate::policy::properties::{PropertySource, ECC_LIST_PROPERTY};

/// Used when `ril.ecclist` is unset or empty
pub const DEFAULT_EMERGENCY_NUMBERS: [&str; 2] = ["112", "911"];

/// Where a country detection came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountrySource {
    Network,
    Location,
    Sim,
    Locale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 alpha-2, lower case
    pub iso: String,
    pub source: CountrySource,
}

impl Country {
    pub fn new(iso: impl AsRef<str>, source: CountrySource) -> Self {
        Self {
            iso: iso.as_ref().to_ascii_lowercase(),
            source,
        }
    }
}

/// Detects the country the device is in
pub trait CountryDetector: Send + Sync {
    fn detect_country(&self) -> Option<Country>;
}

/// Detector that never knows the country
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCountryDetector;

impl CountryDetector for NoCountryDetector {
    fn detect_country(&self) -> Option<Country> {
        None
    }
}

/// International calling code for a country, when known
pub fn calling_code(iso: &str) -> Option<&'static str> {
    let code = match iso.to_ascii_lowercase().as_str() {
        "us" | "ca" => "1",
        "ru" => "7",
        "fr" => "33",
        "es" => "34",
        "it" => "39",
        "gb" => "44",
        "se" => "46",
        "de" => "49",
        "br" => "55",
        "au" => "61",
        "jp" => "81",
        "kr" => "82",
        "cn" => "86",
        "in" => "91",
        _ => return None,
    };
    Some(code)
}

/// Strip dialling separators and an international prefix for the home country
pub fn normalize_number(number: &str, calling_code: Option<&str>) -> String {
    let compact: String = number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let Some(international) = compact.strip_prefix('+') else {
        return compact;
    };
    match calling_code.and_then(|code| international.strip_prefix(code)) {
        Some(national) => national.to_string(),
        None => international.to_string(),
    }
}

/// Country and emergency numbers in force for one send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmergencyPolicyContext {
    pub country: Option<Country>,
    pub numbers: Vec<String>,
}

impl EmergencyPolicyContext {
    pub fn resolve(detector: &dyn CountryDetector, properties: &dyn PropertySource) -> Self {
        let numbers: Vec<String> = properties
            .get(ECC_LIST_PROPERTY)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let numbers = if numbers.is_empty() {
            DEFAULT_EMERGENCY_NUMBERS.iter().map(|n| n.to_string()).collect()
        } else {
            numbers
        };

        Self {
            country: detector.detect_country(),
            numbers,
        }
    }

    pub fn country_iso(&self) -> Option<&str> {
        self.country.as_ref().map(|c| c.iso.as_str())
    }

    /// Exact match of the normalized destination against the list
    pub fn is_emergency_number(&self, number: &str) -> bool {
        let code = self.country_iso().and_then(calling_code);
        let normalized = normalize_number(number, code);
        !normalized.is_empty() && self.numbers.iter().any(|n| *n == normalized)
    }
}
