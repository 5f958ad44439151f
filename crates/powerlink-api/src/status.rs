// Canonical panel status and the raw-vocabulary mapper.
//
// Each protocol revision speaks its own status dialect ("Disarm" vs.
// "DISARM", "ArmHome" vs. "HOME"). The mapper is pure table lookup; it
// never fails on observation and only fails on commands it cannot issue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::Error;

/// Client-facing security-system state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum CanonicalStatus {
    #[strum(to_string = "disarmed", serialize = "disarm", serialize = "off")]
    Disarmed,
    #[strum(to_string = "home", serialize = "armed-home", serialize = "armed_home")]
    ArmedHome,
    #[strum(to_string = "away", serialize = "armed-away", serialize = "armed_away")]
    ArmedAway,
    /// The panel has begun arming and is letting people leave.
    #[strum(to_string = "exit delay", serialize = "exit-delay", serialize = "exit_delay")]
    ExitDelay,
    #[strum(to_string = "unknown")]
    Unknown,
}

impl CanonicalStatus {
    /// Whether this status can be requested via `set_status`.
    /// `ExitDelay` and `Unknown` are observation-only.
    pub fn is_settable(self) -> bool {
        matches!(self, Self::Disarmed | Self::ArmedHome | Self::ArmedAway)
    }
}

/// Bidirectional translation between a revision's raw vocabulary and
/// [`CanonicalStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMapper {
    raw_to_canonical: HashMap<String, CanonicalStatus>,
    canonical_to_command: HashMap<CanonicalStatus, String>,
}

impl StateMapper {
    /// Build a mapper from a raw-status table and a command table.
    ///
    /// Command entries for observation-only statuses are ignored.
    pub fn new<R, C>(
        statuses: impl IntoIterator<Item = (R, CanonicalStatus)>,
        commands: impl IntoIterator<Item = (CanonicalStatus, C)>,
    ) -> Self
    where
        R: Into<String>,
        C: Into<String>,
    {
        Self {
            raw_to_canonical: statuses
                .into_iter()
                .map(|(raw, status)| (raw.into(), status))
                .collect(),
            canonical_to_command: commands
                .into_iter()
                .filter(|(status, _)| status.is_settable())
                .map(|(status, cmd)| (status, cmd.into()))
                .collect(),
        }
    }

    /// Vocabulary of the single-step `rest_api/3.0` revision.
    pub fn rest_v3() -> Self {
        Self::new(
            [
                ("Disarm", CanonicalStatus::Disarmed),
                // Disarmed with an open zone.
                ("NotReady", CanonicalStatus::Disarmed),
                ("Exit Delay", CanonicalStatus::ExitDelay),
                ("HOME", CanonicalStatus::ArmedHome),
                ("AWAY", CanonicalStatus::ArmedAway),
            ],
            [
                (CanonicalStatus::Disarmed, "Disarm"),
                (CanonicalStatus::ArmedHome, "ArmHome"),
                (CanonicalStatus::ArmedAway, "ArmAway"),
            ],
        )
    }

    /// Vocabulary of the two-step `rest_api/8.0` revision.
    pub fn rest_v8() -> Self {
        Self::new(
            [
                ("DISARM", CanonicalStatus::Disarmed),
                ("EXIT", CanonicalStatus::ExitDelay),
                ("HOME", CanonicalStatus::ArmedHome),
                ("AWAY", CanonicalStatus::ArmedAway),
            ],
            [
                (CanonicalStatus::Disarmed, "DISARM"),
                (CanonicalStatus::ArmedHome, "HOME"),
                (CanonicalStatus::ArmedAway, "AWAY"),
            ],
        )
    }

    /// Map a raw status string. Anything outside the table is `Unknown`.
    pub fn to_canonical(&self, raw: &str) -> CanonicalStatus {
        self.raw_to_canonical
            .get(raw)
            .copied()
            .unwrap_or(CanonicalStatus::Unknown)
    }

    /// Map a target status to the revision's command string.
    pub fn to_raw(&self, status: CanonicalStatus) -> Result<&str, Error> {
        if !status.is_settable() {
            return Err(Error::UnsupportedTarget(status));
        }
        self.canonical_to_command
            .get(&status)
            .map(String::as_str)
            .ok_or(Error::UnsupportedTarget(status))
    }

    /// Raw strings that map to `status`, sorted.
    pub fn raw_for(&self, status: CanonicalStatus) -> Vec<&str> {
        let mut raws: Vec<&str> = self
            .raw_to_canonical
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(raw, _)| raw.as_str())
            .collect();
        raws.sort_unstable();
        raws
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn v3_vocabulary_maps_known_strings() {
        let mapper = StateMapper::rest_v3();
        assert_eq!(mapper.to_canonical("HOME"), CanonicalStatus::ArmedHome);
        assert_eq!(mapper.to_canonical("Disarm"), CanonicalStatus::Disarmed);
        assert_eq!(mapper.to_canonical("NotReady"), CanonicalStatus::Disarmed);
        assert_eq!(mapper.to_canonical("Exit Delay"), CanonicalStatus::ExitDelay);
        assert_eq!(mapper.to_canonical("AWAY"), CanonicalStatus::ArmedAway);
    }

    #[test]
    fn unrecognized_raw_is_unknown() {
        for mapper in [StateMapper::rest_v3(), StateMapper::rest_v8()] {
            assert_eq!(mapper.to_canonical("FAULT"), CanonicalStatus::Unknown);
            assert_eq!(mapper.to_canonical(""), CanonicalStatus::Unknown);
            // Lookup is exact; the gateway is case-sensitive too.
            assert_eq!(mapper.to_canonical("home"), CanonicalStatus::Unknown);
        }
    }

    #[test]
    fn observation_only_statuses_cannot_be_commanded() {
        let mapper = StateMapper::rest_v3();
        for status in [CanonicalStatus::ExitDelay, CanonicalStatus::Unknown] {
            assert!(matches!(
                mapper.to_raw(status),
                Err(Error::UnsupportedTarget(s)) if s == status
            ));
        }
    }

    #[test]
    fn every_settable_status_has_a_command_in_both_revisions() {
        for mapper in [StateMapper::rest_v3(), StateMapper::rest_v8()] {
            for status in CanonicalStatus::iter().filter(|s| s.is_settable()) {
                let cmd = mapper.to_raw(status).unwrap();
                assert!(!cmd.is_empty());
                // Each settable status is also observable in the same dialect.
                assert!(!mapper.raw_for(status).is_empty(), "{status} not observable");
            }
        }
    }

    #[test]
    fn v3_commands_differ_from_observed_strings() {
        let mapper = StateMapper::rest_v3();
        assert_eq!(mapper.to_raw(CanonicalStatus::Disarmed).unwrap(), "Disarm");
        assert_eq!(mapper.to_raw(CanonicalStatus::ArmedHome).unwrap(), "ArmHome");
        assert_eq!(mapper.to_raw(CanonicalStatus::ArmedAway).unwrap(), "ArmAway");
        assert_eq!(mapper.raw_for(CanonicalStatus::Disarmed), vec!["Disarm", "NotReady"]);
    }

    #[test]
    fn commands_for_observation_only_statuses_are_dropped() {
        let mapper = StateMapper::new(
            [("X", CanonicalStatus::ExitDelay)],
            [(CanonicalStatus::ExitDelay, "Exit")],
        );
        assert!(mapper.to_raw(CanonicalStatus::ExitDelay).is_err());
        // Settable but missing from the table.
        assert!(matches!(
            mapper.to_raw(CanonicalStatus::ArmedAway),
            Err(Error::UnsupportedTarget(CanonicalStatus::ArmedAway))
        ));
    }

    #[test]
    fn parses_user_input() {
        assert_eq!(CanonicalStatus::from_str("away").unwrap(), CanonicalStatus::ArmedAway);
        assert_eq!(CanonicalStatus::from_str("HOME").unwrap(), CanonicalStatus::ArmedHome);
        assert_eq!(
            CanonicalStatus::from_str("exit-delay").unwrap(),
            CanonicalStatus::ExitDelay
        );
        assert_eq!(CanonicalStatus::from_str("disarm").unwrap(), CanonicalStatus::Disarmed);
        assert!(CanonicalStatus::from_str("panic").is_err());
    }

    #[test]
    fn display_and_serde_names() {
        assert_eq!(CanonicalStatus::ExitDelay.to_string(), "exit delay");
        assert_eq!(
            serde_json::to_string(&CanonicalStatus::ArmedHome).unwrap(),
            "\"armed_home\""
        );
    }
}
