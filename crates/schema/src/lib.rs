pub mod instructions;
pub mod program_logs;
pub mod pubkey;
pub mod swap_event;

pub use pubkey::{ParsePubkeyError, Pubkey};

// Fixed-layout swap event decoder
pub use swap_event::{DISCRIMINATOR_LEN, DecodeError, Discriminator, SwapEvent, decode};

// `Program data:` log extraction
pub use program_logs::{
    LogError, PROGRAM_DATA_PREFIX, RAYDIUM_CLMM_PROGRAM_ID, invokes_raydium_clmm, log_messages,
    program_data, swap_events_from_logs,
};

// Swap instructions in `getTransaction` (`json` encoding) results
pub use instructions::{
    SwapArgs, SwapInstruction, SwapKind, account_keys, parse_swap_instruction_data,
    swap_instructions,
};
