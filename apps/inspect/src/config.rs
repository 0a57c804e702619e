use anyhow::{Result, anyhow};
use std::{env, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub rpc_max_attempts: u32,
    pub rpc_timeout: Duration,

    /// Base64 event payload, as found after `Program data: `
    pub swap_event_b64: Option<String>,
    pub tx_signature: Option<String>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_u64(name: &str, v: Option<String>, default: u64) -> Result<u64> {
    match non_empty(v) {
        None => Ok(default),
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid {name}={s}: expected an unsigned integer")),
    }
}

pub fn load() -> Result<Config> {
    from_vars(|name| env::var(name).ok())
}

fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let rpc_url = non_empty(var("RPC_URL"))
        .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string());

    let rpc_max_attempts = parse_u64("RPC_MAX_ATTEMPTS", var("RPC_MAX_ATTEMPTS"), 3)?;
    if rpc_max_attempts == 0 {
        return Err(anyhow!("RPC_MAX_ATTEMPTS must be >= 1"));
    }
    let rpc_max_attempts = u32::try_from(rpc_max_attempts)
        .map_err(|_| anyhow!("RPC_MAX_ATTEMPTS too large: {rpc_max_attempts}"))?;

    let rpc_timeout = Duration::from_secs(parse_u64("RPC_TIMEOUT_SECS", var("RPC_TIMEOUT_SECS"), 20)?);

    let swap_event_b64 = non_empty(var("SWAP_EVENT_B64"));
    let tx_signature = non_empty(var("TX_SIGNATURE"));

    if swap_event_b64.is_none() && tx_signature.is_none() {
        return Err(anyhow!(
            "Nothing to inspect: set SWAP_EVENT_B64 and/or TX_SIGNATURE"
        ));
    }

    Ok(Config {
        rpc_url,
        rpc_max_attempts,
        rpc_timeout,
        swap_event_b64,
        tx_signature,
    })
}
