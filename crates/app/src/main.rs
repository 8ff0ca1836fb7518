//! Demo: a host client and an enclave pipeline wired over an in-process
//! transport. The evaluator is a toy integer-sum interpreter; the signer
//! hashes key material over the transaction bytes.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use channel::handshake::HandshakeConfig;
use channel::payload::Response;
use enclave::{Enclave, EnclaveConfig, Evaluator, HandlerFailure, Signer};
use host::HostConnector;

#[derive(Parser, Debug)]
#[command(about = "host <-> enclave secure channel demo")]
struct Args {
    /// Snippet for the enclave to evaluate.
    #[arg(long, default_value = "40+2")]
    source: String,

    /// Sequence acceptance window (0 = strict ordering).
    #[arg(long, default_value_t = 0)]
    window: u64,

    /// Handler deadline in milliseconds.
    #[arg(long, default_value_t = 1000)]
    deadline_ms: u64,

    /// Also run a sign request over a demo transaction.
    #[arg(long)]
    sign: bool,
}

/// Sums integer terms joined by `+` and `-`; identifiers resolve through
/// the request bindings. Polls the interrupt between terms.
struct SumEvaluator;

impl SumEvaluator {
    fn resolve(term: &str, bindings: &BTreeMap<String, Value>) -> Result<i64, HandlerFailure> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(0);
        }
        if let Ok(n) = term.parse::<i64>() {
            return Ok(n);
        }
        bindings
            .get(term)
            .and_then(Value::as_i64)
            .ok_or_else(|| HandlerFailure::new(format!("unbound term: {term}")))
    }
}

impl Evaluator for SumEvaluator {
    fn evaluate(
        &self,
        source: &str,
        bindings: &BTreeMap<String, Value>,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<Value, HandlerFailure> {
        let mut total = 0i64;
        let mut term = String::new();
        let mut op = '+';
        for ch in source.chars().chain(std::iter::once('+')) {
            if interrupt() {
                return Err(HandlerFailure::new("interrupted"));
            }
            match ch {
                '+' | '-' => {
                    let value = Self::resolve(&term, bindings)?;
                    total = if op == '+' { total + value } else { total - value };
                    term.clear();
                    op = ch;
                }
                _ => term.push(ch),
            }
        }
        Ok(Value::from(total))
    }
}

/// Stand-in signer: SHA-256 over key material and transaction bytes.
struct DigestSigner;

impl Signer for DigestSigner {
    fn sign(&self, tx: &[u8], key: &[u8]) -> Result<Vec<u8>, HandlerFailure> {
        Ok(crypto::sha256(&[key, tx]).to_vec())
    }
}

fn handshake_config(window: u64) -> HandshakeConfig {
    HandshakeConfig {
        host_origin: "https://host.example".into(),
        enclave_origin: "https://enclave.example".into(),
        code_hash: "demo-enclave-v1".into(),
        sequence_window: window,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let enclave = Enclave::new(
        EnclaveConfig {
            handshake: handshake_config(args.window),
            deadline: Duration::from_millis(args.deadline_ms),
        },
        SumEvaluator,
        DigestSigner,
    );

    let (to_enclave, enclave_rx) = tokio::sync::mpsc::channel(16);
    let (enclave_tx, mut from_enclave) = tokio::sync::mpsc::channel(16);
    let pipeline = tokio::spawn(enclave.run(enclave_rx, enclave_tx));

    // Handshake.
    let (connector, hello) = HostConnector::start(handshake_config(args.window));
    to_enclave.send(hello).await.context("enclave gone")?;
    let ack = from_enclave.recv().await.context("no handshake ack")?;
    let mut client = connector.complete(&ack)?;
    info!(id = %hex::encode(client.session_id()), "channel established");

    // Evaluate.
    let request = client.request_evaluate(&args.source, BTreeMap::new())?;
    to_enclave.send(request).await.context("enclave gone")?;
    let reply = from_enclave.recv().await.context("no reply")?;
    match client.handle_reply(&reply)? {
        Response::Ok(value) => println!("{} = {value}", args.source),
        Response::Err(err) => println!("{} failed: {:?} {}", args.source, err.kind, err.message),
    }

    // Sign.
    if args.sign {
        let key = crypto::secure_random::<32>();
        let request = client.request_sign(b"demo transaction", &key)?;
        to_enclave.send(request).await.context("enclave gone")?;
        let reply = from_enclave.recv().await.context("no reply")?;
        match client.handle_reply(&reply)? {
            Response::Ok(value) => println!("signature: {value}"),
            Response::Err(err) => println!("sign failed: {:?} {}", err.kind, err.message),
        }
    }

    drop(to_enclave);
    pipeline.await.ok();
    Ok(())
}
