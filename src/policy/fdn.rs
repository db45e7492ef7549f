// ABOUTME: Fixed Dialing Numbers allow-list consulted before a send reaches the radio
// ABOUTME: Destinations match after the same normalization used for emergency numbers

use crate::policy::emergency::normalize_number;

/// Fixed Dialing Numbers: when enabled, only listed destinations may be messaged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedDialing {
    enabled: bool,
    numbers: Vec<String>,
}

impl FixedDialing {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(numbers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            numbers: numbers
                .into_iter()
                .map(|n| {
                    let n: String = n.into();
                    normalize_number(&n, None)
                })
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `destination` may be messaged
    pub fn permits(&self, destination: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let destination = normalize_number(destination, None);
        self.numbers.iter().any(|n| *n == destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_permits_everything() {
        assert!(FixedDialing::disabled().permits("6501002000"));
    }

    #[test]
    fn enabled_permits_only_listed() {
        let fdn = FixedDialing::enabled(["+1 650 100 2000", "112"]);
        assert!(fdn.permits("+16501002000"));
        assert!(fdn.permits("112"));
        assert!(!fdn.permits("6501002001"));
    }
}
