use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing_subscriber::EnvFilter;

use delegator_flow::{
    snapshot_address, AccountSnapshot, AccountWatcher, AuthorizationFlow, Credential,
    DelegationStatus, HttpRpc, Session, SubmitOptions,
};
use delegator_types::{Network, SponsorMode, SubmissionRecord};

/// Drive the EIP-7702 delegation demo flow against a test network.
///
/// This is the headless rendition of the browser demo: connect a test
/// key, sign an authorization tuple (or a revocation), optionally submit
/// the carrying transaction, and watch the account's nonce/code.
///
/// Testnet keys only. Never feed this tool a credential that holds real
/// funds.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the account's nonce, code, and delegation indicator.
    Status(StatusArgs),
    /// Sign an authorization tuple and print it.
    Sign(SignArgs),
    /// Sign a revocation tuple (delegation to the zero address) and print it.
    Revoke(RevokeArgs),
    /// Sign, submit the carrying transaction, and wait for the receipt.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// Network to target (holesky, sepolia, base-sepolia).
    #[arg(long, default_value = "holesky")]
    network: String,

    /// RPC URL; defaults to the network's public endpoint.
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// JSON file overriding per-network delegate addresses
    /// (eg `{"holesky": "0x..."}`).
    #[arg(long)]
    delegates_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    /// BIP-39 seed phrase (12-24 words).
    #[arg(long, env = "MNEMONIC", conflicts_with_all = ["private_key", "private_key_path", "ephemeral"])]
    mnemonic: Option<String>,

    /// Private key (hex string, 0x...).
    #[arg(long, env = "PKEY", conflicts_with_all = ["private_key_path", "ephemeral"])]
    private_key: Option<String>,

    /// Path to a file containing the private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "ephemeral")]
    private_key_path: Option<PathBuf>,

    /// Connect with a freshly generated throwaway key.
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Args, Debug)]
struct SponsorArgs {
    /// Sponsor address expected to submit the carrying transaction.
    #[arg(long, conflicts_with = "sponsor_anyone")]
    sponsor: Option<String>,

    /// Let anyone sponsor the carrying transaction.
    #[arg(long)]
    sponsor_anyone: bool,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    credential: CredentialArgs,

    /// Inspect this address instead of deriving one from a credential.
    #[arg(long, conflicts_with_all = ["mnemonic", "private_key", "private_key_path", "ephemeral"])]
    address: Option<String>,

    /// Keep polling until interrupted.
    #[arg(long)]
    watch: bool,

    /// Poll interval for --watch, in seconds.
    #[arg(long, default_value_t = delegator_flow::DEFAULT_POLL_INTERVAL.as_secs())]
    interval_secs: u64,
}

#[derive(Args, Debug)]
struct SignArgs {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    credential: CredentialArgs,

    #[command(flatten)]
    sponsor: SponsorArgs,

    /// Delegation target; defaults to the network's reference delegate.
    #[arg(long)]
    target: Option<String>,
}

#[derive(Args, Debug)]
struct RevokeArgs {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    credential: CredentialArgs,

    #[command(flatten)]
    sponsor: SponsorArgs,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    credential: CredentialArgs,

    /// Delegation target; defaults to the network's reference delegate.
    #[arg(long, conflicts_with = "revoke")]
    target: Option<String>,

    /// Submit a revocation instead of a delegation.
    #[arg(long)]
    revoke: bool,

    /// Gas limit override for the carrying transaction.
    #[arg(long)]
    gas_limit: Option<u64>,

    /// How long to wait for the receipt before giving up, in seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Path to write the submission record (eg, submissions.holesky.json).
    #[arg(long)]
    record_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Status(args) => run_status(args).await,
        Command::Sign(args) => run_sign(args).await,
        Command::Revoke(args) => run_revoke(args).await,
        Command::Submit(args) => run_submit(args).await,
    }
}

async fn run_status(args: StatusArgs) -> Result<()> {
    let network = resolve_network(&args.network)?;
    let rpc = Arc::new(HttpRpc::new(rpc_url(&args.network, &network)));

    let address = match &args.address {
        Some(raw) => parse_address(raw)?,
        None => {
            let mut session = Session::new();
            session.connect(args.credential.credential()?)?
        }
    };

    println!("Network: {} (chain {})", network.name, network.chain_id);
    println!("Account: {address}");

    if !args.watch {
        let snapshot = snapshot_address(rpc.as_ref(), address).await?;
        print_snapshot(&snapshot);
        return Ok(());
    }

    println!("Watching every {}s, Ctrl-C to stop.", args.interval_secs);
    let watcher = AccountWatcher::spawn(
        rpc,
        address,
        Duration::from_secs(args.interval_secs.max(1)),
    );
    let mut receiver = watcher.subscribe();
    loop {
        receiver
            .changed()
            .await
            .context("account watcher stopped unexpectedly")?;
        let snapshot = receiver.borrow().clone();
        if let Some(snapshot) = snapshot {
            print_snapshot(&snapshot);
        }
    }
}

async fn run_sign(args: SignArgs) -> Result<()> {
    let network = resolve_network(&args.network)?;
    let rpc = HttpRpc::new(rpc_url(&args.network, &network));
    let mut session = Session::new();
    let authority = session.connect(args.credential.credential()?)?;

    let target = resolve_target(args.target.as_deref(), &network)?;
    let mut flow = AuthorizationFlow::new(network.clone()).with_sponsor(args.sponsor.mode()?);

    let signed = flow.sign_authorization(&session, &rpc, target).await?;
    println!("Authority: {authority}");
    println!("Target:    {target}");
    println!("Authorization tuple:");
    println!("{}", serde_json::to_string_pretty(signed)?);
    Ok(())
}

async fn run_revoke(args: RevokeArgs) -> Result<()> {
    let network = resolve_network(&args.network)?;
    let rpc = HttpRpc::new(rpc_url(&args.network, &network));
    let mut session = Session::new();
    let authority = session.connect(args.credential.credential()?)?;

    let mut flow = AuthorizationFlow::new(network.clone()).with_sponsor(args.sponsor.mode()?);
    let signed = flow.revoke(&session, &rpc).await?;

    println!("Authority: {authority}");
    println!("Revocation tuple (zero-address target):");
    println!("{}", serde_json::to_string_pretty(signed)?);
    Ok(())
}

async fn run_submit(args: SubmitArgs) -> Result<()> {
    let network = resolve_network(&args.network)?;
    let rpc = HttpRpc::new(rpc_url(&args.network, &network));
    let mut session = Session::new();
    let authority = session.connect(args.credential.credential()?)?;

    let target = if args.revoke {
        Address::ZERO
    } else {
        resolve_target(args.target.as_deref(), &network)?
    };

    let options = SubmitOptions {
        gas_limit: args.gas_limit,
        receipt_poll_interval: Duration::from_secs(2),
        receipt_attempts: (args.timeout_secs / 2).max(1) as u32,
    };
    let mut flow = AuthorizationFlow::new(network.clone()).with_options(options);

    let signed = flow.sign_authorization(&session, &rpc, target).await?;
    println!(
        "Signed authorization: {authority} -> {target} (nonce {}, chain {})",
        signed.nonce, network.chain_id
    );

    let hash = flow.submit(&session, &rpc).await?;
    println!("Submitted: {hash}");
    println!("Waiting for receipt...");

    let settlement = flow.wait_for_settlement(&rpc).await?;
    let status = if settlement.success { "success" } else { "reverted" };
    match settlement.block_number {
        Some(block) => println!(
            "Settled: {status} (gas used {}, block {block})",
            settlement.gas_used
        ),
        None => println!("Settled: {status} (gas used {})", settlement.gas_used),
    }

    let record = SubmissionRecord {
        network: network.name.clone(),
        chain_id: network.chain_id,
        authority,
        delegate: target,
        tx_hash: settlement.hash,
        status: status.to_string(),
        gas_used: settlement.gas_used,
        submitted_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string()),
    };
    let record_path = args
        .record_path
        .unwrap_or_else(|| PathBuf::from(format!("submissions.{}.json", network.name)));
    write_submission_record(&record_path, &record)?;
    println!("Recorded submission in {}", record_path.display());
    Ok(())
}

impl CredentialArgs {
    fn credential(&self) -> Result<Credential> {
        if let Some(phrase) = &self.mnemonic {
            return Ok(Credential::mnemonic(phrase.clone()));
        }
        if let Some(key) = &self.private_key {
            return Ok(Credential::private_key(key.clone()));
        }
        if let Some(path) = &self.private_key_path {
            let key = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            return Ok(Credential::private_key(key.trim().to_string()));
        }
        if self.ephemeral {
            return Ok(Credential::Ephemeral);
        }
        Err(anyhow!(
            "missing credential: provide --mnemonic, --private-key, --private-key-path or --ephemeral \
             (or set MNEMONIC/PKEY/PRIV_KEY_PATH)"
        ))
    }
}

impl SponsorArgs {
    fn mode(&self) -> Result<SponsorMode> {
        if self.sponsor_anyone {
            return Ok(SponsorMode::AnySponsor);
        }
        match &self.sponsor {
            Some(raw) => Ok(SponsorMode::Sponsored(parse_address(raw)?)),
            None => Ok(SponsorMode::SelfExecuted),
        }
    }
}

fn resolve_network(args: &NetworkArgs) -> Result<Network> {
    let mut network = Network::by_name(&args.network).ok_or_else(|| {
        anyhow!(
            "unknown network `{}`; known: holesky, sepolia, base-sepolia",
            args.network
        )
    })?;

    if let Some(path) = &args.delegates_path {
        let body = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        if let Some(delegate) = delegate_override(&body, &network.name)? {
            network.delegate = Some(delegate);
        }
    }
    Ok(network)
}

fn rpc_url(args: &NetworkArgs, network: &Network) -> String {
    args.rpc_url.clone().unwrap_or_else(|| network.rpc_url.clone())
}

fn resolve_target(raw: Option<&str>, network: &Network) -> Result<Address> {
    match raw {
        Some(raw) => parse_address(raw),
        None => network.delegate.ok_or_else(|| {
            anyhow!(
                "no --target given and `{}` has no default delegate",
                network.name
            )
        }),
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|err| anyhow!("`{raw}` is not a valid address: {err}"))
}

/// Pick a network's delegate override out of a `{"name": "0x..."}` file.
fn delegate_override(body: &str, network_name: &str) -> Result<Option<Address>> {
    let overrides: HashMap<String, String> =
        serde_json::from_str(body).context("delegate override file is not a name->address map")?;
    overrides
        .get(network_name)
        .map(|raw| parse_address(raw))
        .transpose()
}

fn print_snapshot(snapshot: &AccountSnapshot) {
    println!("Nonce:   {}", snapshot.nonce);
    match snapshot.delegation {
        DelegationStatus::Undelegated => println!("Code:    none (EOA)"),
        DelegationStatus::Delegated(delegate) => {
            println!("Code:    delegated to {delegate} (smart account)")
        }
        DelegationStatus::Bytecode => {
            println!("Code:    contract bytecode ({} bytes)", snapshot.code.len())
        }
    }
}

/// Append a record under `submissions` in the JSON file, creating it if
/// needed. Existing content is preserved.
fn write_submission_record(path: &Path, record: &SubmissionRecord) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?
    } else {
        String::new()
    };

    let merged = merge_submission(&existing, record)?;
    fs::write(path, merged).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

fn merge_submission(existing: &str, record: &SubmissionRecord) -> Result<String> {
    let mut root: Value = if existing.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(existing).context("existing submissions file is not valid JSON")?
    };

    let Value::Object(map) = &mut root else {
        return Err(anyhow!("existing submissions file is not a JSON object"));
    };
    let submissions = map.entry("submissions").or_insert_with(|| json!([]));
    let entries = submissions
        .as_array_mut()
        .ok_or_else(|| anyhow!("`submissions` is not an array"))?;
    entries.push(serde_json::to_value(record)?);

    let mut out = serde_json::to_string_pretty(&root)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn record() -> SubmissionRecord {
        SubmissionRecord {
            network: "holesky".to_string(),
            chain_id: 17000,
            authority: Address::repeat_byte(0xaa),
            delegate: Address::repeat_byte(0xbb),
            tx_hash: B256::repeat_byte(0x42),
            status: "success".to_string(),
            gas_used: 46_000,
            submitted_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn merge_starts_a_fresh_file() {
        let merged = merge_submission("", &record()).unwrap();
        let root: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(root["submissions"].as_array().unwrap().len(), 1);
        assert_eq!(root["submissions"][0]["chainId"], 17000);
    }

    #[test]
    fn merge_preserves_existing_entries() {
        let first = merge_submission("", &record()).unwrap();
        let second = merge_submission(&first, &record()).unwrap();
        let root: Value = serde_json::from_str(&second).unwrap();
        assert_eq!(root["submissions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn merge_rejects_garbage_files() {
        assert!(merge_submission("not json", &record()).is_err());
        assert!(merge_submission("[1,2,3]", &record()).is_err());
    }

    #[test]
    fn delegate_override_picks_the_right_network() {
        let body = r#"{"holesky": "0x00000000000000000000000000000000000000aa"}"#;
        let delegate = delegate_override(body, "holesky").unwrap().unwrap();
        let expected: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(delegate, expected);
        assert!(delegate_override(body, "sepolia").unwrap().is_none());
        assert!(delegate_override("[]", "holesky").is_err());
    }
}
