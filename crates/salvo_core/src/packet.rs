//! What a committed turn hands to the server transport.
//!
//! The packet carries the reordered attack queue plus the single commands
//! issued outside the queue during the turn. It is encoded with bincode;
//! the version field guards against mixing builds.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilitySet;
use crate::combatant::{UnitId, WeaponId};
use crate::declaration::AttackDeclaration;
use crate::error::{FireError, Result};
use crate::ordnance::PhaseOrdnance;
use crate::queue::DroppedAttack;

/// Current packet format version.
pub const PACKET_VERSION: u32 = 1;

/// Where a called shot is directed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ShotCall {
    /// No call.
    #[default]
    None,
    /// High.
    High,
    /// Low.
    Low,
    /// Left.
    Left,
    /// Right.
    Right,
}

impl ShotCall {
    /// The next call in the cycle none, high, low, left, right.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::High,
            Self::High => Self::Low,
            Self::Low => Self::Left,
            Self::Left => Self::Right,
            Self::Right => Self::None,
        }
    }
}

/// A command issued outside the attack queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    /// Switch a weapon's fire mode at end of phase.
    FireMode {
        /// Weapon changed.
        weapon: WeaponId,
        /// New mode index.
        mode: usize,
    },
    /// Change a weapon's called shot.
    CalledShot {
        /// Weapon changed.
        weapon: WeaponId,
        /// New call.
        call: ShotCall,
    },
    /// Replace the unit's weapon order.
    WeaponOrder {
        /// Weapons in the new order.
        order: Vec<WeaponId>,
    },
}

/// Everything committed for one unit's fire turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPacket {
    /// Format version.
    pub version: u32,
    /// Unit that acted.
    pub firer: UnitId,
    /// Attacks in resolution order.
    pub attacks: Vec<AttackDeclaration>,
    /// Out-of-queue commands in the order they were issued.
    pub commands: Vec<SessionCommand>,
    /// Declarations dropped because they went stale.
    pub dropped: Vec<DroppedAttack>,
    /// Internal bomb usage for the phase after this turn.
    pub ordnance: PhaseOrdnance,
    /// Abilities engaged this turn.
    pub abilities: AbilitySet,
}

impl CommitPacket {
    /// An empty packet for `firer`.
    #[must_use]
    pub fn empty(firer: UnitId) -> Self {
        Self {
            version: PACKET_VERSION,
            firer,
            attacks: Vec::new(),
            commands: Vec::new(),
            dropped: Vec::new(),
            ordnance: PhaseOrdnance::default(),
            abilities: AbilitySet::empty(),
        }
    }

    /// Whether the packet carries anything for the server.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty() && self.commands.is_empty()
    }

    /// Encode to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| FireError::Encoding(format!("Failed to serialize packet: {e}")))
    }

    /// Decode from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed or were written by a
    /// different packet version.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let packet: Self = bincode::deserialize(bytes)
            .map_err(|e| FireError::Encoding(format!("Failed to deserialize packet: {e}")))?;
        if packet.version != PACKET_VERSION {
            return Err(FireError::Encoding(format!(
                "Packet version mismatch: expected {}, got {}",
                PACKET_VERSION, packet.version
            )));
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    fn sample() -> CommitPacket {
        let mut packet = CommitPacket::empty(UnitId(4));
        packet.attacks.push(AttackDeclaration::weapon(
            UnitId(4),
            WeaponId(1),
            Target::Unit(UnitId(9)),
        ));
        packet.commands.push(SessionCommand::CalledShot {
            weapon: WeaponId(1),
            call: ShotCall::High,
        });
        packet
    }

    #[test]
    fn test_packet_encode_decode() {
        let packet = sample();
        let bytes = packet.encode().unwrap();
        assert_eq!(CommitPacket::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_packet_version_mismatch() {
        let mut packet = sample();
        packet.version = PACKET_VERSION + 1;
        let bytes = bincode::serialize(&packet).unwrap();
        assert!(matches!(
            CommitPacket::decode(&bytes),
            Err(FireError::Encoding(_))
        ));
    }

    #[test]
    fn test_packet_garbage() {
        assert!(CommitPacket::decode(&[0xff, 0x01]).is_err());
    }

    #[test]
    fn test_shot_call_cycles() {
        let mut call = ShotCall::None;
        for _ in 0..5 {
            call = call.next();
        }
        assert_eq!(call, ShotCall::None);
    }

    #[test]
    fn test_empty_packet() {
        assert!(CommitPacket::empty(UnitId(1)).is_empty());
        assert!(!sample().is_empty());
    }
}
