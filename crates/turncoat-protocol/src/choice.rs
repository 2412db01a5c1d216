//! Interactive option identifiers.
//!
//! When the engine sends a message with buttons, each button carries a
//! [`Choice`]. The gateway renders the button however it likes and, when
//! someone presses it, hands the token back as `{actor, token}`. The engine
//! only ever sees the identifiers it issued.
//!
//! Every token starts with the room id, so an inbound press is routed to
//! its room without a global player→room index:
//!
//! ```text
//! <room>:vote:<target>
//! <room>:act:<murder|recruit|blackmail>
//! <room>:target:<action>:<target>
//! <room>:offer:<recruit|blackmail>:<accept|decline>:<proposer>
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ActionKind, Decision, PlayerId, ProtocolError, RoomId};

/// One selectable option, without its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceOption {
    /// Vote to banish this player.
    Vote(PlayerId),
    /// The prompted traitor picks an action from the night menu.
    Action(ActionKind),
    /// The prompted traitor picks a target for the chosen action.
    Target(ActionKind, PlayerId),
    /// The target of a recruit/blackmail offer answers it.
    Offer {
        action: ActionKind,
        decision: Decision,
        proposer: PlayerId,
    },
}

/// A [`ChoiceOption`] bound to the room that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub room: RoomId,
    pub option: ChoiceOption,
}

impl Choice {
    pub fn new(room: RoomId, option: ChoiceOption) -> Self {
        Self { room, option }
    }

    /// The string form handed to the gateway.
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let room = self.room.0;
        match self.option {
            ChoiceOption::Vote(target) => write!(f, "{room}:vote:{}", target.0),
            ChoiceOption::Action(action) => write!(f, "{room}:act:{action}"),
            ChoiceOption::Target(action, target) => {
                write!(f, "{room}:target:{action}:{}", target.0)
            }
            ChoiceOption::Offer {
                action,
                decision,
                proposer,
            } => write!(
                f,
                "{room}:offer:{action}:{}:{}",
                decision.as_str(),
                proposer.0
            ),
        }
    }
}

impl FromStr for Choice {
    type Err = ProtocolError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ProtocolError::InvalidMessage(format!("unrecognised choice token {token:?}"));
        let parts: Vec<&str> = token.split(':').collect();
        let room = parts
            .first()
            .and_then(|s| s.parse::<i64>().ok())
            .map(RoomId)
            .ok_or_else(invalid)?;
        let player = |s: &str| s.parse::<u64>().ok().map(PlayerId);
        let action = |s: &str| ActionKind::parse(s);

        let option = match parts.as_slice() {
            [_, "vote", target] => ChoiceOption::Vote(player(*target).ok_or_else(invalid)?),
            [_, "act", kind] => ChoiceOption::Action(action(*kind).ok_or_else(invalid)?),
            [_, "target", kind, target] => ChoiceOption::Target(
                action(*kind).ok_or_else(invalid)?,
                player(*target).ok_or_else(invalid)?,
            ),
            [_, "offer", kind, decision, proposer] => {
                let kind = action(*kind).filter(|k| k.is_offer()).ok_or_else(invalid)?;
                ChoiceOption::Offer {
                    action: kind,
                    decision: Decision::parse(*decision).ok_or_else(invalid)?,
                    proposer: player(*proposer).ok_or_else(invalid)?,
                }
            }
            _ => return Err(invalid()),
        };

        Ok(Self { room, option })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId(-100)
    }

    #[test]
    fn test_token_formats() {
        let vote = Choice::new(room(), ChoiceOption::Vote(PlayerId(7)));
        assert_eq!(vote.token(), "-100:vote:7");

        let offer = Choice::new(
            room(),
            ChoiceOption::Offer {
                action: ActionKind::Blackmail,
                decision: Decision::Decline,
                proposer: PlayerId(3),
            },
        );
        assert_eq!(offer.token(), "-100:offer:blackmail:decline:3");
    }

    #[test]
    fn test_parse_every_shape() {
        let options = [
            ChoiceOption::Vote(PlayerId(1)),
            ChoiceOption::Action(ActionKind::Recruit),
            ChoiceOption::Target(ActionKind::Murder, PlayerId(9)),
            ChoiceOption::Offer {
                action: ActionKind::Recruit,
                decision: Decision::Accept,
                proposer: PlayerId(4),
            },
        ];
        for option in options {
            let choice = Choice::new(room(), option);
            let parsed: Choice = choice.token().parse().unwrap();
            assert_eq!(parsed, choice);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "1:vote", "1:vote:x", "1:act:poison", "1:dance:2"] {
            assert!(
                matches!(bad.parse::<Choice>(), Err(ProtocolError::InvalidMessage(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_murder_offer() {
        let result = "5:offer:murder:accept:1".parse::<Choice>();
        assert!(result.is_err(), "murder never produces an offer");
    }
}
