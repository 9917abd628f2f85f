use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two opposing factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    Terrorist,
    CounterTerrorist,
}

impl TeamSide {
    /// The side an invisible member of `self` is hidden from.
    pub fn opposing(self) -> Self {
        match self {
            TeamSide::Terrorist => TeamSide::CounterTerrorist,
            TeamSide::CounterTerrorist => TeamSide::Terrorist,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            TeamSide::Terrorist => "t",
            TeamSide::CounterTerrorist => "ct",
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Attention-drawing actions that temporarily reveal an invisible player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RevealAction {
    /// Ambient sound emitted by the player; the reveal scales with its length.
    Sound { duration: f32 },
    BulletImpact,
    BeginPlant,
    BeginDefuse,
    Reload,
    Hurt,
}

impl RevealAction {
    pub fn label(&self) -> &'static str {
        match self {
            RevealAction::Sound { .. } => "sound",
            RevealAction::BulletImpact => "bullet_impact",
            RevealAction::BeginPlant => "begin_plant",
            RevealAction::BeginDefuse => "begin_defuse",
            RevealAction::Reload => "reload",
            RevealAction::Hurt => "hurt",
        }
    }
}

/// Who an admin command targets, before it is resolved against live players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    All,
    Side(TeamSide),
    /// `#<userid>`, a bare user id, or a (partial) player name.
    Pattern(String),
}

impl TargetSelector {
    /// User id named by a pattern, accepting an optional leading `#`.
    ///
    /// Only the canonical decimal form matches: `007` or `+7` name no id.
    pub fn user_id(&self) -> Option<u32> {
        match self {
            TargetSelector::Pattern(pattern) => {
                let digits = pattern.strip_prefix('#').unwrap_or(pattern);
                let id: u32 = digits.parse().ok()?;
                (id.to_string() == digits).then_some(id)
            }
            _ => None,
        }
    }
}

/// Line commands understood by the demo host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Join { name: String, side: TeamSide },
    Leave { user_id: u32 },
    Invis { target: TargetSelector },
    Act { user_id: u32, action: RevealAction },
    Map { name: String },
    Quit,
}
