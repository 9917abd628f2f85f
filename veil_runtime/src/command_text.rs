use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::{HostCommand, RevealAction, TargetSelector, TeamSide};

pub const INVIS_USAGE: &str = "Usage: css_invis <#userid|name|@all|@ct|@t>";

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid float '{value}' for {context}: {source}")]
    InvalidFloat {
        value: String,
        context: &'static str,
        source: ParseFloatError,
    },
    #[error("invalid target selector: {0}")]
    InvalidSelector(String),
    #[error("invalid team side '{0}'")]
    InvalidSide(String),
    #[error("invalid reveal action '{0}'")]
    InvalidAction(String),
}

/// Parse a single target token such as `@all`, `@ct`, `#3` or `bob`.
pub fn parse_target_selector(token: &str) -> Result<TargetSelector, CommandParseError> {
    if token.starts_with('@') {
        return match token.to_ascii_lowercase().as_str() {
            "@all" => Ok(TargetSelector::All),
            "@ct" => Ok(TargetSelector::Side(TeamSide::CounterTerrorist)),
            "@t" => Ok(TargetSelector::Side(TeamSide::Terrorist)),
            _ => Err(CommandParseError::InvalidSelector(token.to_string())),
        };
    }
    Ok(TargetSelector::Pattern(token.to_string()))
}

/// Parse the arguments that follow `css_invis`.
pub fn parse_invis_target(args: &[&str]) -> Result<TargetSelector, CommandParseError> {
    let token = args
        .first()
        .map(|arg| arg.trim())
        .filter(|arg| !arg.is_empty())
        .ok_or(CommandParseError::MissingArgument("target"))?;
    parse_target_selector(token)
}

pub fn parse_host_command(input: &str) -> Result<HostCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "join" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("name"))?;
            let side_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("side"))?;
            Ok(HostCommand::Join {
                name: name.to_string(),
                side: parse_side(side_str)?,
            })
        }
        "leave" => {
            let id_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("userid"))?;
            let user_id = parse_u32(id_str.trim_start_matches('#'), "leave userid")?;
            Ok(HostCommand::Leave { user_id })
        }
        "invis" | "invisible" | "css_invis" | "css_invisible" => {
            let args: Vec<&str> = parts.collect();
            let target = parse_invis_target(&args)?;
            Ok(HostCommand::Invis { target })
        }
        "act" => {
            let id_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("userid"))?;
            let user_id = parse_u32(id_str.trim_start_matches('#'), "act userid")?;
            let action_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("action"))?
                .to_ascii_lowercase();
            let action = match action_str.as_str() {
                "sound" => {
                    let secs_str = parts.next().unwrap_or("1.0");
                    RevealAction::Sound {
                        duration: parse_f32(secs_str, "sound duration")?,
                    }
                }
                "shot" | "shoot" | "impact" => RevealAction::BulletImpact,
                "plant" => RevealAction::BeginPlant,
                "defuse" => RevealAction::BeginDefuse,
                "reload" => RevealAction::Reload,
                "hurt" | "damage" => RevealAction::Hurt,
                other => return Err(CommandParseError::InvalidAction(other.to_string())),
            };
            Ok(HostCommand::Act { user_id, action })
        }
        "map" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("map name"))?;
            Ok(HostCommand::Map {
                name: name.to_string(),
            })
        }
        "quit" | "exit" => Ok(HostCommand::Quit),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_side(token: &str) -> Result<TeamSide, CommandParseError> {
    match token.to_ascii_lowercase().as_str() {
        "t" | "terrorist" => Ok(TeamSide::Terrorist),
        "ct" | "counterterrorist" | "counter-terrorist" => Ok(TeamSide::CounterTerrorist),
        other => Err(CommandParseError::InvalidSide(other.to_string())),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse::<u32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_f32(value: &str, context: &'static str) -> Result<f32, CommandParseError> {
    value
        .parse::<f32>()
        .map_err(|source| CommandParseError::InvalidFloat {
            value: value.to_string(),
            context,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_selectors_are_case_insensitive() {
        assert_eq!(
            parse_target_selector("@CT").unwrap(),
            TargetSelector::Side(TeamSide::CounterTerrorist)
        );
        assert_eq!(
            parse_target_selector("@t").unwrap(),
            TargetSelector::Side(TeamSide::Terrorist)
        );
        assert_eq!(parse_target_selector("@All").unwrap(), TargetSelector::All);
    }

    #[test]
    fn unknown_at_selector_is_rejected() {
        let err = parse_target_selector("@spec").unwrap_err();
        assert!(matches!(err, CommandParseError::InvalidSelector(ref s) if s == "@spec"));
    }

    #[test]
    fn missing_target_reports_missing_argument() {
        assert!(matches!(
            parse_invis_target(&[]),
            Err(CommandParseError::MissingArgument("target"))
        ));
        assert!(matches!(
            parse_invis_target(&["  "]),
            Err(CommandParseError::MissingArgument("target"))
        ));
    }

    #[test]
    fn host_act_sound_defaults_to_one_second() {
        let cmd = parse_host_command("act 4 sound").unwrap();
        assert_eq!(
            cmd,
            HostCommand::Act {
                user_id: 4,
                action: RevealAction::Sound { duration: 1.0 }
            }
        );
    }

    #[test]
    fn host_commands_parse() {
        assert_eq!(
            parse_host_command("join ghost ct").unwrap(),
            HostCommand::Join {
                name: "ghost".into(),
                side: TeamSide::CounterTerrorist
            }
        );
        assert_eq!(
            parse_host_command("css_invis #3").unwrap(),
            HostCommand::Invis {
                target: TargetSelector::Pattern("#3".into())
            }
        );
        assert_eq!(
            parse_host_command("act #2 reload").unwrap(),
            HostCommand::Act {
                user_id: 2,
                action: RevealAction::Reload
            }
        );
        assert_eq!(parse_host_command("QUIT").unwrap(), HostCommand::Quit);
    }

    #[test]
    fn host_command_errors() {
        assert!(matches!(parse_host_command("   "), Err(CommandParseError::Empty)));
        assert!(matches!(
            parse_host_command("dance"),
            Err(CommandParseError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_host_command("join ghost spec"),
            Err(CommandParseError::InvalidSide(_))
        ));
        assert!(matches!(
            parse_host_command("act x reload"),
            Err(CommandParseError::InvalidInteger { .. })
        ));
        assert!(matches!(
            parse_host_command("act 1 jump"),
            Err(CommandParseError::InvalidAction(_))
        ));
    }
}
