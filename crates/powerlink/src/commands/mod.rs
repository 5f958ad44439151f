//! Command handlers.

pub mod config_cmd;
pub mod status;

use std::str::FromStr;

use powerlink_api::{CanonicalStatus, PowerLinkClient};

use crate::cli::{ArmMode, Command, GlobalOpts};
use crate::error::CliError;

/// A gateway operation, validated before any connection is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Status,
    Set(CanonicalStatus),
}

impl Action {
    pub fn from_command(cmd: &Command) -> Result<Self, CliError> {
        match cmd {
            Command::Status => Ok(Self::Status),
            Command::Disarm => Ok(Self::Set(CanonicalStatus::Disarmed)),
            Command::Arm(args) => Ok(Self::Set(match args.mode {
                ArmMode::Home => CanonicalStatus::ArmedHome,
                ArmMode::Away => CanonicalStatus::ArmedAway,
            })),
            Command::Set(args) => parse_target(&args.status).map(Self::Set),
            Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
                field: "command".into(),
                reason: "not a gateway operation".into(),
            }),
        }
    }
}

/// Parse a user-supplied status name, rejecting observation-only states.
pub fn parse_target(raw: &str) -> Result<CanonicalStatus, CliError> {
    let status = CanonicalStatus::from_str(raw.trim()).map_err(|_| CliError::Validation {
        field: "status".into(),
        reason: format!("'{raw}' is not a status; expected disarmed, home or away"),
    })?;

    if !status.is_settable() {
        return Err(CliError::UnsupportedTarget {
            status: status.to_string(),
        });
    }
    Ok(status)
}

pub async fn dispatch(
    action: Action,
    client: &PowerLinkClient,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match action {
        Action::Status => status::show(client, profile, global).await,
        Action::Set(target) => status::set(client, target, global).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settable_names_parse() {
        for (raw, expected) in [
            ("disarmed", CanonicalStatus::Disarmed),
            ("OFF", CanonicalStatus::Disarmed),
            ("home", CanonicalStatus::ArmedHome),
            ("armed-away", CanonicalStatus::ArmedAway),
        ] {
            assert!(matches!(parse_target(raw), Ok(s) if s == expected), "{raw}");
        }
    }

    #[test]
    fn observation_only_states_are_refused() {
        for raw in ["exit-delay", "unknown"] {
            assert!(
                matches!(parse_target(raw), Err(CliError::UnsupportedTarget { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn gibberish_is_a_validation_error() {
        assert!(matches!(
            parse_target("banana"),
            Err(CliError::Validation { .. })
        ));
    }
}
