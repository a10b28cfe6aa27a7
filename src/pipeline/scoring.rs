//! Capability similarity scoring.
//!
//! A backend declares the capability set it provides; each candidate is
//! scored against every declared set along a fixed, ordered list of
//! criteria. The criterion ORDER is load-bearing: the platform criteria
//! interact (current-platform satisfaction before exact before fuzzy) and
//! reordering them changes which backend wins for ambiguous candidates.
//! A value missing on either side is neutral for that criterion; a value
//! present on both sides that fails every applicable criterion disqualifies
//! the pairing.

use crate::capabilities::Capabilities;

use super::platform::Platform;

/// Scores candidates against declared backend capabilities.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    current: Platform,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            current: Platform::current(),
        }
    }
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scorer that pretends to run on `current`. Used by tests and
    /// by grid-style deployments scoring on behalf of another host.
    pub fn on_platform(current: Platform) -> Self {
        Self { current }
    }

    /// Score a (candidate, provided) pairing. `None` disqualifies the
    /// backend for this candidate; higher scores are better matches.
    pub fn score(&self, desired: &Capabilities, provided: &Capabilities) -> Option<u32> {
        let mut score = 0;

        score += exact_str(desired.browser_name(), provided.browser_name())?;
        score += exact_str(desired.browser_version(), provided.browser_version())?;
        score += exact_bool(desired.javascript_enabled(), provided.javascript_enabled())?;
        score += self.platform_score(desired.platform_name(), provided.platform_name())?;

        Some(score)
    }

    /// Platform evaluated three ways, in order: exact match against the
    /// current platform when the current platform itself satisfies the
    /// request, plain exact match, then the bidirectional family match.
    fn platform_score(&self, desired: Option<&str>, provided: Option<&str>) -> Option<u32> {
        let (desired, provided) = match (desired, provided) {
            (Some(d), Some(p)) => (d, p),
            _ => return Some(0),
        };

        let desired_platform = Platform::from_name(desired);
        let provided_platform = Platform::from_name(provided);

        let mut score = 0;

        if let (Some(d), Some(p)) = (desired_platform, provided_platform) {
            if self.current.matches(d) && p == self.current {
                score += 1;
            }
        }

        if desired.eq_ignore_ascii_case(provided) {
            score += 1;
        }

        if let (Some(d), Some(p)) = (desired_platform, provided_platform) {
            if d.matches(p) {
                score += 1;
            }
        }

        if score == 0 {
            None
        } else {
            Some(score)
        }
    }
}

fn exact_str(desired: Option<&str>, provided: Option<&str>) -> Option<u32> {
    match (desired, provided) {
        (Some(d), Some(p)) if d.eq_ignore_ascii_case(p) => Some(1),
        (Some(_), Some(_)) => None,
        _ => Some(0),
    }
}

fn exact_bool(desired: Option<bool>, provided: Option<bool>) -> Option<u32> {
    match (desired, provided) {
        (Some(d), Some(p)) if d == p => Some(1),
        (Some(_), Some(_)) => None,
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caps(value: serde_json::Value) -> Capabilities {
        Capabilities::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_browser_name_mismatch_disqualifies() {
        let scorer = Scorer::on_platform(Platform::Linux);
        assert_eq!(
            scorer.score(
                &caps(json!({"browserName": "chrome"})),
                &caps(json!({"browserName": "firefox"})),
            ),
            None
        );
    }

    #[test]
    fn test_missing_values_are_neutral() {
        let scorer = Scorer::on_platform(Platform::Linux);
        // Backend declares nothing; candidate asks for chrome. Neutral, not
        // disqualified.
        assert_eq!(
            scorer.score(&caps(json!({"browserName": "chrome"})), &caps(json!({}))),
            Some(0)
        );
    }

    #[test]
    fn test_more_specific_backend_scores_higher() {
        let scorer = Scorer::on_platform(Platform::Linux);
        let candidate = caps(json!({"browserName": "chrome", "platformName": "linux"}));

        let generic = scorer
            .score(&candidate, &caps(json!({"browserName": "chrome"})))
            .unwrap();
        let platformed = scorer
            .score(
                &candidate,
                &caps(json!({"browserName": "chrome", "platformName": "linux"})),
            )
            .unwrap();
        assert!(platformed > generic);
    }

    #[test]
    fn test_current_platform_bonus() {
        // Candidate asks for the unix family; two backends offer mac and
        // linux. On a linux host the linux backend collects the
        // current-platform bonus and wins.
        let scorer = Scorer::on_platform(Platform::Linux);
        let candidate = caps(json!({"platformName": "unix"}));

        let linux = scorer
            .score(&candidate, &caps(json!({"platformName": "linux"})))
            .unwrap();
        let mac = scorer
            .score(&candidate, &caps(json!({"platformName": "mac"})))
            .unwrap();
        assert!(linux > mac);
    }

    #[test]
    fn test_family_fuzzy_match_both_directions() {
        let scorer = Scorer::on_platform(Platform::Win10);
        // Request the family, provide the leaf; and the reverse.
        assert!(scorer
            .score(
                &caps(json!({"platformName": "windows"})),
                &caps(json!({"platformName": "win10"})),
            )
            .is_some());
        assert!(scorer
            .score(
                &caps(json!({"platformName": "win10"})),
                &caps(json!({"platformName": "windows"})),
            )
            .is_some());
    }

    #[test]
    fn test_unrelated_platforms_disqualify() {
        let scorer = Scorer::on_platform(Platform::Linux);
        assert_eq!(
            scorer.score(
                &caps(json!({"platformName": "windows"})),
                &caps(json!({"platformName": "mac"})),
            ),
            None
        );
    }
}
