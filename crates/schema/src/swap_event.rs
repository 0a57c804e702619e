//! Raydium CLMM `SwapEvent`
//!
//! The program emits this event as an Anchor `Program data:` log: an 8-byte
//! discriminator followed by a fixed 197-byte borsh payload (little-endian,
//! no padding). Layout:
//!
//! | offset | width | field            |
//! |--------|-------|------------------|
//! | 0      | 32    | pool_state       |
//! | 32     | 32    | sender           |
//! | 64     | 32    | token_account_0  |
//! | 96     | 32    | token_account_1  |
//! | 128    | 8     | amount_0         |
//! | 136    | 8     | transfer_fee_0   |
//! | 144    | 8     | amount_1         |
//! | 152    | 8     | transfer_fee_1   |
//! | 160    | 1     | zero_for_one     |
//! | 161    | 16    | sqrt_price_x64   |
//! | 177    | 16    | liquidity        |
//! | 193    | 4     | tick             |

use crate::pubkey::{PUBKEY_LEN, Pubkey};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input: need {expected} bytes, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    #[error("invalid zero_for_one flag byte {0:#04x}")]
    InvalidFlag(u8),

    #[error("unexpected discriminator {actual:?}, expected {expected:?}")]
    UnexpectedDiscriminator {
        expected: Discriminator,
        actual: Discriminator,
    },

    #[error("malformed payload: {0}")]
    Malformed(#[from] std::io::Error),
}

/// Swap event emitted by the Raydium concentrated liquidity program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct SwapEvent {
    /// The pool for which token_0 and token_1 were swapped
    pub pool_state: Pubkey,

    /// The address that initiated the swap call
    pub sender: Pubkey,

    /// Payer token account in zero-for-one swaps, recipient otherwise
    pub token_account_0: Pubkey,

    /// Payer token account in one-for-zero swaps, recipient otherwise
    pub token_account_1: Pubkey,

    pub amount_0: u64,
    pub transfer_fee_0: u64,
    pub amount_1: u64,
    pub transfer_fee_1: u64,

    /// If true, token_0 goes into the pool and token_1 comes out
    pub zero_for_one: bool,

    /// sqrt(price) after the swap, Q64.64
    #[serde(with = "u128_string")]
    pub sqrt_price_x64: u128,

    #[serde(with = "u128_string")]
    pub liquidity: u128,

    /// log base 1.0001 of the price after the swap
    pub tick: i32,
}

impl SwapEvent {
    /// `sha256("event:SwapEvent")[..8]`
    pub const DISCRIMINATOR: Discriminator = [64, 198, 205, 232, 38, 8, 113, 226];

    pub const PAYLOAD_LEN: usize = 4 * PUBKEY_LEN + 4 * 8 + 1 + 16 + 16 + 4;

    pub const ENCODED_LEN: usize = DISCRIMINATOR_LEN + Self::PAYLOAD_LEN;

    const ZERO_FOR_ONE_OFFSET: usize = 4 * PUBKEY_LEN + 4 * 8;

    /// Decode and additionally require the swap-event discriminator.
    pub fn decode_checked(raw: &[u8]) -> Result<Self, DecodeError> {
        let (discriminator, event) = decode(raw)?;
        if discriminator != Self::DISCRIMINATOR {
            return Err(DecodeError::UnexpectedDiscriminator {
                expected: Self::DISCRIMINATOR,
                actual: discriminator,
            });
        }
        Ok(event)
    }

    /// Discriminator followed by the payload; the exact inverse of [`decode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(&Self::DISCRIMINATOR);
        self.write_payload(&mut out);
        out
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_LEN);
        self.write_payload(&mut out);
        out
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.pool_state.as_bytes());
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(self.token_account_0.as_bytes());
        out.extend_from_slice(self.token_account_1.as_bytes());
        out.extend_from_slice(&self.amount_0.to_le_bytes());
        out.extend_from_slice(&self.transfer_fee_0.to_le_bytes());
        out.extend_from_slice(&self.amount_1.to_le_bytes());
        out.extend_from_slice(&self.transfer_fee_1.to_le_bytes());
        out.push(u8::from(self.zero_for_one));
        out.extend_from_slice(&self.sqrt_price_x64.to_le_bytes());
        out.extend_from_slice(&self.liquidity.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
    }

    /// (amount in, amount out) from the trader's point of view.
    pub fn amounts_in_out(&self) -> (u64, u64) {
        if self.zero_for_one {
            (self.amount_0, self.amount_1)
        } else {
            (self.amount_1, self.amount_0)
        }
    }

    /// Gross amounts minus the token-2022 transfer fees withheld on each side.
    pub fn net_amounts(&self) -> (u64, u64) {
        (
            self.amount_0.saturating_sub(self.transfer_fee_0),
            self.amount_1.saturating_sub(self.transfer_fee_1),
        )
    }

    /// Approximate post-swap price of token_0 in token_1, raw base units (no
    /// decimals applied).
    ///
    /// `sqrt_price_x64` is rounded to the nearest f64 (53-bit mantissa) before
    /// squaring, so this is for display and sanity checks only; use the raw
    /// field for exact arithmetic.
    pub fn price(&self) -> f64 {
        let sqrt = self.sqrt_price_x64 as f64 / 2f64.powi(64);
        sqrt * sqrt
    }
}

/// Split off the discriminator and decode the fixed-layout payload.
///
/// The discriminator is returned as-is; use [`SwapEvent::decode_checked`]
/// when the caller only accepts swap events. Bytes past
/// [`SwapEvent::ENCODED_LEN`] are ignored.
pub fn decode(raw: &[u8]) -> Result<(Discriminator, SwapEvent), DecodeError> {
    if raw.len() < SwapEvent::ENCODED_LEN {
        return Err(DecodeError::TruncatedInput {
            expected: SwapEvent::ENCODED_LEN,
            actual: raw.len(),
        });
    }

    let (head, rest) = raw.split_at(DISCRIMINATOR_LEN);
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(head);

    let payload = &rest[..SwapEvent::PAYLOAD_LEN];

    // borsh would reject this too, but without naming the byte
    match payload[SwapEvent::ZERO_FOR_ONE_OFFSET] {
        0 | 1 => {}
        flag => return Err(DecodeError::InvalidFlag(flag)),
    }

    let event = borsh::from_slice::<SwapEvent>(payload)?;
    Ok((discriminator, event))
}

/// u128 as a decimal string, so JSON consumers keep full precision.
pub(crate) mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
