use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use staking_primitives::Address;

use crate::constants::DEFAULT_RECEIPT_POLL_MS;

#[derive(Parser, Debug)]
#[command(
    name = "stake-cli",
    about = "Stake into, unstake from and withdraw out of a staking pool",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    #[clap(flatten)]
    pub(crate) network: NetworkArgs,

    #[clap(flatten)]
    pub(crate) wallet: WalletArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Commands {
    /// Show the session, balances and position.
    Status,

    /// Deposit native currency into the pool.
    Stake(AmountArgs),

    /// Request an unstake, starting its cooldown.
    Unstake(AmountArgs),

    /// Withdraw everything whose cooldown has elapsed.
    Withdraw,

    /// Follow account changes and print the position after each one, until Ctrl-C.
    Watch,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct AmountArgs {
    #[arg(help = "the amount in whole units, e.g. 0.5")]
    pub(crate) amount: String,
}

/// Overrides for the staking configuration.
///
/// Precedence, lowest first: built-in defaults, the `--config` file, environment variables, flags.
#[derive(Args, Debug, Clone)]
pub(crate) struct NetworkArgs {
    #[arg(
        long,
        short = 'c',
        global = true,
        help = "TOML file with the staking configuration"
    )]
    pub(crate) config: Option<PathBuf>,

    #[arg(long, global = true, help = "address of the staking contract")]
    pub(crate) stake_address: Option<Address>,

    #[arg(long, global = true, help = "url of the JSON-RPC endpoint")]
    pub(crate) rpc_url: Option<String>,

    #[arg(long, global = true, help = "the pool to stake into")]
    pub(crate) pool_id: Option<u64>,

    #[arg(long, global = true, help = "the chain the contract lives on")]
    pub(crate) chain_id: Option<u64>,

    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_RECEIPT_POLL_MS,
        help = "how often to poll for transaction receipts, in milliseconds"
    )]
    pub(crate) receipt_poll_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct WalletArgs {
    #[arg(
        long,
        global = true,
        env = "STAKER_PRIVATE_KEY",
        hide_env_values = true,
        conflicts_with = "node_wallet",
        help = "hex-encoded private key to sign with"
    )]
    pub(crate) private_key: Option<String>,

    #[arg(
        long,
        global = true,
        help = "use the accounts unlocked on the RPC node instead of a local key"
    )]
    pub(crate) node_wallet: bool,
}
