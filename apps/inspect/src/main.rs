use anyhow::{Result, anyhow};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use clmm_schema::{
    SwapEvent, SwapInstruction, decode, invokes_raydium_clmm, log_messages, swap_events_from_logs,
    swap_instructions,
};
use log::{info, warn};
use serde_json::{Value, json};

mod config;
mod rpc;

use config::Config;
use rpc::RpcClient;

fn setup_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cfg: Config = config::load()?;

    info!("inspect starting:");
    info!("  rpc_url={}", cfg.rpc_url);
    info!("  rpc_max_attempts={}", cfg.rpc_max_attempts);
    info!("  rpc_timeout_secs={}", cfg.rpc_timeout.as_secs());
    info!("  payload={}", cfg.swap_event_b64.is_some());
    info!("  tx_signature={}", cfg.tx_signature.as_deref().unwrap_or("-"));

    if let Some(b64) = &cfg.swap_event_b64 {
        let report = payload_report(b64)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(signature) = &cfg.tx_signature {
        let rpc = RpcClient::new(cfg.rpc_url.clone(), cfg.rpc_timeout, cfg.rpc_max_attempts)?;
        let tx = rpc.get_transaction(signature).await?;
        println!("{}", serde_json::to_string_pretty(&tx)?);

        let swaps = transaction_swap_instructions(&tx);
        info!("found {} swap instruction(s) in {}", swaps.len(), signature);
        for ix in &swaps {
            println!("{}", serde_json::to_string_pretty(ix)?);
        }

        let events = transaction_swap_events(&tx)?;
        info!("found {} swap event(s) in {}", events.len(), signature);
        for event in &events {
            println!("{}", serde_json::to_string_pretty(&event_report(event))?);
        }
    }

    Ok(())
}

/// Decode a base64 event payload. The discriminator is reported, not enforced.
fn payload_report(b64: &str) -> Result<Value> {
    let raw = BASE64_STANDARD
        .decode(b64.trim())
        .map_err(|e| anyhow!("SWAP_EVENT_B64 is not valid base64: {e}"))?;

    let (discriminator, event) = decode(&raw)?;
    if discriminator != SwapEvent::DISCRIMINATOR {
        warn!(
            "discriminator {:?} is not the swap event discriminator {:?}",
            discriminator,
            SwapEvent::DISCRIMINATOR
        );
    }

    let mut report = event_report(&event);
    report["discriminator"] = json!(discriminator);
    Ok(report)
}

fn event_report(event: &SwapEvent) -> Value {
    let (amount_in, amount_out) = event.amounts_in_out();
    json!({
        "event": event,
        "amount_in": amount_in,
        "amount_out": amount_out,
        "price": event.price(),
    })
}

fn transaction_swap_events(tx: &Value) -> Result<Vec<SwapEvent>> {
    let logs = log_messages(tx);
    if logs.is_empty() {
        warn!("transaction has no log messages");
        return Ok(vec![]);
    }
    if !invokes_raydium_clmm(&logs) {
        warn!("transaction does not invoke the Raydium CLMM program");
    }
    Ok(swap_events_from_logs(&logs)?)
}

fn transaction_swap_instructions(tx: &Value) -> Vec<SwapInstruction> {
    let swaps = swap_instructions(tx);
    for ix in &swaps {
        info!(
            "{:?} #{}{} payer={} pool={} amount={}",
            ix.kind,
            ix.index_in_tx,
            ix.inner_index.map(|j| format!(".{j}")).unwrap_or_default(),
            ix.payer,
            ix.pool_state,
            ix.args.amount
        );
    }
    swaps
}
