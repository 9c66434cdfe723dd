pub(crate) mod status;
pub(crate) mod transact;
pub(crate) mod watch;

use std::{fs, path::Path, process::ExitCode, sync::Arc, time::Duration};

use alloy::providers::Provider;
use anyhow::{Context, Result};
use staking_evm_client::{connect, AlloyStakingClient, LocalSignerWallet, NodeAccountsWallet};
use staking_primitives::PoolId;
use staking_sm::{
    client::{StakingClient, WalletProvider},
    config::StakingConfig,
    phase::PendingOperation,
    session::ConnectionTracker,
    stake::StakeFlow,
    unstake::UnstakeFlow,
};
use tracing::{debug, info, trace, warn};

use crate::{
    cli::{Cli, Commands, NetworkArgs},
    constants::NODE_ACCOUNTS_POLL_INTERVAL,
};

/// Everything a command needs, wired to one connection tracker.
pub(crate) struct Staking<C = AlloyStakingClient> {
    pub(crate) config: StakingConfig,
    pub(crate) tracker: ConnectionTracker,
    pub(crate) stake: StakeFlow<C>,
    pub(crate) unstake: UnstakeFlow<C>,
}

impl<C: StakingClient> Staking<C> {
    /// Re-reads balances and the position of the current session.
    pub(crate) async fn refresh(&self) {
        tokio::join!(self.stake.refresh(), self.unstake.refresh());
    }

    /// Re-reads the view that `operation` did not belong to.
    ///
    /// The flow that ran `operation` refreshes itself once it finalizes.
    pub(crate) async fn refresh_other(&self, operation: PendingOperation) {
        match operation {
            PendingOperation::Staking => self.unstake.refresh().await,
            PendingOperation::Unstaking | PendingOperation::Withdrawing => {
                self.stake.refresh().await
            }
            PendingOperation::None => {}
        }
    }
}

pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli.network)?;
    info!(
        contract = %config.stake_contract_address,
        rpc_url = %config.rpc_url,
        pool = %config.pool_id,
        chain_id = config.chain_id,
        "resolved configuration"
    );
    if !config.is_configured() {
        warn!("staking contract address is not set, contract reads and writes will fail");
    }
    let poll_interval = Duration::from_millis(cli.network.receipt_poll_ms);

    if let Some(private_key) = cli.wallet.private_key.as_deref() {
        let wallet = LocalSignerWallet::from_hex(private_key).context("invalid private key")?;
        let provider = connect(&config.rpc_url, Some(wallet.ethereum_wallet()))?;
        info!(account = %wallet.address(), "using local signer");

        let client = AlloyStakingClient::new(provider).with_poll_interval(poll_interval);
        dispatch(cli.command, config, Some(client), Some(&wallet)).await
    } else if cli.wallet.node_wallet {
        let provider = connect(&config.rpc_url, None)?;
        let wallet = NodeAccountsWallet::new(provider.clone(), NODE_ACCOUNTS_POLL_INTERVAL);
        info!("using accounts managed by the node");

        let client = AlloyStakingClient::new(provider).with_poll_interval(poll_interval);
        dispatch(cli.command, config, Some(client), Some(&wallet)).await
    } else {
        info!("no wallet configured");
        dispatch::<LocalSignerWallet>(cli.command, config, None, None).await
    }
}

async fn dispatch<W: WalletProvider>(
    command: Commands,
    config: StakingConfig,
    client: Option<AlloyStakingClient>,
    wallet: Option<&W>,
) -> Result<ExitCode> {
    if let Some(client) = &client {
        check_chain_id(client, config.chain_id).await;
    }

    let mut tracker = ConnectionTracker::new();
    tracker.initialize(wallet).await;
    info!(session = %tracker.current(), "wallet initialized");

    let client = client.map(Arc::new);
    let mut staking = Staking {
        stake: StakeFlow::new(client.clone(), &config, tracker.watch()),
        unstake: UnstakeFlow::new(client, &config, tracker.watch()),
        config,
        tracker,
    };
    staking.refresh().await;

    let exit = match command {
        Commands::Status => {
            status::print_status(&staking);
            ExitCode::SUCCESS
        }
        Commands::Stake(args) => transact::handle_stake(&staking, args).await,
        Commands::Unstake(args) => transact::handle_unstake(&staking, args).await,
        Commands::Withdraw => transact::handle_withdraw(&staking).await,
        Commands::Watch => watch::handle_watch(&staking).await?,
    };

    staking.tracker.teardown();
    Ok(exit)
}

async fn check_chain_id(client: &AlloyStakingClient, expected: u64) {
    match client.provider().get_chain_id().await {
        Ok(chain_id) if chain_id == expected => debug!(%chain_id, "connected to expected chain"),
        Ok(chain_id) => warn!(%chain_id, %expected, "rpc endpoint serves a different chain"),
        Err(err) => warn!(%err, "failed to query chain id"),
    }
}

/// Layers the `--config` file, the environment and the flags over the defaults.
fn resolve_config(args: &NetworkArgs) -> Result<StakingConfig> {
    let base = match &args.config {
        Some(path) => parse_toml(path)?,
        None => StakingConfig::default(),
    };
    let mut config = base
        .with_env()
        .context("invalid staking configuration in environment")?;

    if let Some(address) = args.stake_address {
        config.stake_contract_address = address;
    }
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(pool_id) = args.pool_id {
        config.pool_id = PoolId::new(pool_id);
    }
    if let Some(chain_id) = args.chain_id {
        config.chain_id = chain_id;
    }

    Ok(config)
}

fn parse_toml(path: &Path) -> Result<StakingConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    trace!(?raw, "read config file");

    let parsed = toml::from_str::<StakingConfig>(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    debug!(?parsed, "parsed config file");

    Ok(parsed)
}
