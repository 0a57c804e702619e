//! Raydium CLMM swap instructions in a `getTransaction` result (`json` encoding).
//!
//! With plain `json` encoding each instruction is
//! `{ programIdIndex, accounts: [u8], data: <base58> }`, indices pointing into
//! the full account key list (static keys, then ALT writable, then ALT readonly).

use crate::program_logs::RAYDIUM_CLMM_PROGRAM_ID;
use crate::swap_event::{DISCRIMINATOR_LEN, Discriminator};
use borsh::{BorshDeserialize, BorshSerialize};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    Swap,
    SwapV2,
}

impl SwapKind {
    /// `sha256("global:swap")[..8]`
    pub const SWAP_DISCRIMINATOR: Discriminator = [248, 198, 158, 145, 225, 117, 135, 200];
    /// `sha256("global:swap_v2")[..8]`
    pub const SWAP_V2_DISCRIMINATOR: Discriminator = [43, 4, 237, 11, 26, 201, 30, 98];

    pub fn from_discriminator(d: &[u8]) -> Option<Self> {
        if d == Self::SWAP_DISCRIMINATOR {
            Some(Self::Swap)
        } else if d == Self::SWAP_V2_DISCRIMINATOR {
            Some(Self::SwapV2)
        } else {
            None
        }
    }

    pub fn discriminator(&self) -> Discriminator {
        match self {
            Self::Swap => Self::SWAP_DISCRIMINATOR,
            Self::SwapV2 => Self::SWAP_V2_DISCRIMINATOR,
        }
    }
}

/// Arguments shared by `swap` and `swap_v2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct SwapArgs {
    pub amount: u64,
    pub other_amount_threshold: u64,
    #[serde(with = "crate::swap_event::u128_string")]
    pub sqrt_price_limit_x64: u128,
    pub is_base_input: bool,
}

impl SwapArgs {
    pub const LEN: usize = 8 + 8 + 16 + 1;
}

/// A swap instruction located in a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInstruction {
    pub kind: SwapKind,
    /// Index of the top-level instruction (the outer one for CPI swaps)
    pub index_in_tx: u16,
    /// Position inside `meta.innerInstructions` when invoked through CPI
    pub inner_index: Option<u16>,
    /// Account 0 of the instruction (signer paying for the swap)
    pub payer: String,
    /// Account 2 of the instruction
    pub pool_state: String,
    pub args: SwapArgs,
}

/// Instruction data: 8-byte discriminator, then borsh `SwapArgs`.
pub fn parse_swap_instruction_data(data: &[u8]) -> Option<(SwapKind, SwapArgs)> {
    if data.len() < DISCRIMINATOR_LEN + SwapArgs::LEN {
        return None;
    }
    let (disc, rest) = data.split_at(DISCRIMINATOR_LEN);
    let kind = SwapKind::from_discriminator(disc)?;
    let args = borsh::from_slice::<SwapArgs>(&rest[..SwapArgs::LEN]).ok()?;
    Some((kind, args))
}

/// Full account key list: `accountKeys` + `loadedAddresses.writable` + `loadedAddresses.readonly`.
pub fn account_keys(tx: &Value) -> Vec<String> {
    let mut keys: Vec<String> = tx
        .pointer("/transaction/message/accountKeys")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| {
                    // plain json gives strings, jsonParsed gives { pubkey, .. }
                    x.as_str()
                        .or_else(|| x.get("pubkey").and_then(|p| p.as_str()))
                        .map(|s| s.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    for section in ["writable", "readonly"] {
        let ptr = format!("/meta/loadedAddresses/{}", section);
        if let Some(arr) = tx.pointer(&ptr).and_then(|v| v.as_array()) {
            keys.extend(arr.iter().filter_map(|a| a.as_str().map(|s| s.to_string())));
        }
    }

    keys
}

/// Every Raydium CLMM `swap` / `swap_v2` instruction, top-level and CPI,
/// ordered by position in the transaction.
pub fn swap_instructions(tx: &Value) -> Vec<SwapInstruction> {
    let keys = account_keys(tx);
    let mut out = Vec::new();

    if let Some(top) = tx
        .pointer("/transaction/message/instructions")
        .and_then(|v| v.as_array())
    {
        for (i, ix) in top.iter().enumerate() {
            if let Some(s) = swap_instruction(ix, &keys, i as u16, None) {
                out.push(s);
            }
        }
    }

    if let Some(groups) = tx
        .pointer("/meta/innerInstructions")
        .and_then(|v| v.as_array())
    {
        for group in groups {
            let Some(outer) = group.get("index").and_then(|v| v.as_u64()) else {
                continue;
            };
            let Some(inner) = group.get("instructions").and_then(|v| v.as_array()) else {
                continue;
            };
            for (j, ix) in inner.iter().enumerate() {
                if let Some(s) = swap_instruction(ix, &keys, outer as u16, Some(j as u16)) {
                    out.push(s);
                }
            }
        }
    }

    // top-level before its own CPIs
    out.sort_by_key(|s| (s.index_in_tx, s.inner_index.map_or(0, |j| j as u32 + 1)));
    out
}

fn swap_instruction(
    ix: &Value,
    keys: &[String],
    index_in_tx: u16,
    inner_index: Option<u16>,
) -> Option<SwapInstruction> {
    let program_index = ix.get("programIdIndex")?.as_u64()? as usize;
    if keys.get(program_index).map(String::as_str) != Some(RAYDIUM_CLMM_PROGRAM_ID) {
        return None;
    }

    let data = bs58::decode(ix.get("data")?.as_str()?).into_vec().ok()?;
    let Some((kind, args)) = parse_swap_instruction_data(&data) else {
        debug!(
            "raydium clmm instruction {}/{:?} is not a swap ({} data bytes)",
            index_in_tx,
            inner_index,
            data.len()
        );
        return None;
    };

    let accounts: Vec<usize> = ix
        .get("accounts")?
        .as_array()?
        .iter()
        .filter_map(|a| a.as_u64().map(|a| a as usize))
        .collect();

    Some(SwapInstruction {
        kind,
        index_in_tx,
        inner_index,
        payer: keys.get(*accounts.first()?)?.clone(),
        pool_state: keys.get(*accounts.get(2)?)?.clone(),
        args,
    })
}
