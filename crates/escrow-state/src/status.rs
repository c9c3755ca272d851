//! # Escrow Status
//!
//! The closed set of lifecycle states of an escrow record.
//!
//! ## Transition Graph
//!
//! ```text
//! Created ──fund()──▶ Funded ──release()──▶ Released
//!    │                  │
//!    │               dispute()
//!    │                  │
//!    ├──dispute()──▶ Disputed ──resolve(pay)──▶ Released
//!    │                  │
//!    │                  └──resolve(refund)──▶ Cancelled
//!    │
//!    └──cancel()──▶ Cancelled
//! ```
//!
//! `Released` and `Cancelled` are terminal. `Disputed` never returns to
//! `Funded`.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an escrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Initialized, awaiting funding.
    Created,
    /// Vault holds the full amount.
    Funded,
    /// Dispute raised, awaiting the arbiter.
    Disputed,
    /// Vault paid out to the beneficiary. Terminal state.
    Released,
    /// Escrow abandoned or refunded to the depositor. Terminal state.
    Cancelled,
}

impl EscrowStatus {
    /// Every status, in persisted tag order.
    pub const ALL: [EscrowStatus; 5] = [
        Self::Created,
        Self::Funded,
        Self::Disputed,
        Self::Released,
        Self::Cancelled,
    ];

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Funded => "FUNDED",
            Self::Disputed => "DISPUTED",
            Self::Released => "RELEASED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a canonical status name. Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CREATED" => Some(Self::Created),
            "FUNDED" => Some(Self::Funded),
            "DISPUTED" => Some(Self::Disputed),
            "RELEASED" => Some(Self::Released),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this status is terminal (no further mutating transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Cancelled)
    }

    /// Valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [EscrowStatus] {
        match self {
            Self::Created => &[Self::Funded, Self::Disputed, Self::Cancelled],
            Self::Funded => &[Self::Released, Self::Disputed],
            Self::Disputed => &[Self::Released, Self::Cancelled],
            Self::Released | Self::Cancelled => &[],
        }
    }

    /// Whether `self → to` is an edge of the transition graph.
    pub fn can_transition_to(&self, to: EscrowStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// One-byte tag used by the persisted account layout.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Funded => 1,
            Self::Disputed => 2,
            Self::Released => 3,
            Self::Cancelled => 4,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
