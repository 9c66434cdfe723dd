use std::process::ExitCode;

use staking_sm::{
    client::StakingClient,
    errors::FlowResult,
    stake::{Completed, STAKE_SUCCESS},
    unstake::{UNSTAKE_SUCCESS, WITHDRAW_SUCCESS},
};
use tracing::{debug, info};

use super::{status::print_status, Staking};
use crate::cli::AmountArgs;

pub(crate) async fn handle_stake<C: StakingClient>(
    staking: &Staking<C>,
    args: AmountArgs,
) -> ExitCode {
    staking.stake.set_amount(args.amount);
    let result = staking.stake.stake().await;
    report(staking, result, STAKE_SUCCESS).await
}

pub(crate) async fn handle_unstake<C: StakingClient>(
    staking: &Staking<C>,
    args: AmountArgs,
) -> ExitCode {
    // a rejected entry leaves the field empty, which then fails validation
    if !staking.unstake.input_amount(&args.amount) {
        debug!(amount = %args.amount, "amount is not a decimal number");
    }
    let result = staking.unstake.unstake().await;
    report(staking, result, UNSTAKE_SUCCESS).await
}

pub(crate) async fn handle_withdraw<C: StakingClient>(staking: &Staking<C>) -> ExitCode {
    let result = staking.unstake.withdraw().await;
    report(staking, result, WITHDRAW_SUCCESS).await
}

async fn report<C: StakingClient>(
    staking: &Staking<C>,
    result: FlowResult<Completed>,
    success: &str,
) -> ExitCode {
    match result {
        Ok(done) => {
            info!(operation = %done.operation, tx = %done.tx, "operation finalized");
            println!("{success} (tx {})", done.tx);
            staking.refresh_other(done.operation).await;
            print_status(staking);
            ExitCode::SUCCESS
        }
        Err(err) => {
            info!(%err, "operation failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    };

    use staking_evm_client::LocalSignerWallet;
    use staking_primitives::{Address, EthAmount, PoolId};
    use staking_sm::{
        client::{FinalityStatus, QueryResponse, StakingCall, StakingQuery},
        config::StakingConfig,
        errors::ClientResult,
        session::ConnectionTracker,
        stake::StakeFlow,
        unstake::UnstakeFlow,
    };

    use super::*;

    const KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    /// Answers every read with ten ether and finalizes every call successfully.
    #[derive(Debug, Default)]
    struct CountingClient {
        native_reads: AtomicUsize,
        staked_reads: AtomicUsize,
        withdraw_reads: AtomicUsize,
        next_tx: AtomicU64,
    }

    impl CountingClient {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.native_reads.load(Ordering::SeqCst),
                self.staked_reads.load(Ordering::SeqCst),
                self.withdraw_reads.load(Ordering::SeqCst),
            )
        }
    }

    fn ten() -> EthAmount {
        EthAmount::parse_ether("10").unwrap()
    }

    impl StakingClient for CountingClient {
        type CallHandle = u64;

        async fn read(&self, _contract: Address, query: StakingQuery) -> ClientResult<QueryResponse> {
            Ok(match query {
                StakingQuery::NativeBalance { .. } => {
                    self.native_reads.fetch_add(1, Ordering::SeqCst);
                    QueryResponse::Amount(ten())
                }
                StakingQuery::StakingBalance { .. } => {
                    self.staked_reads.fetch_add(1, Ordering::SeqCst);
                    QueryResponse::Amount(ten())
                }
                StakingQuery::WithdrawAmount { .. } => {
                    self.withdraw_reads.fetch_add(1, Ordering::SeqCst);
                    QueryResponse::WithdrawStatus {
                        requested: ten(),
                        withdrawable: ten(),
                    }
                }
            })
        }

        async fn write(&self, _from: Address, _contract: Address, _call: StakingCall) -> ClientResult<u64> {
            Ok(self.next_tx.fetch_add(1, Ordering::SeqCst))
        }

        async fn wait_for_finality(&self, _handle: u64) -> ClientResult<FinalityStatus> {
            Ok(FinalityStatus::Success)
        }
    }

    async fn staking() -> (Arc<CountingClient>, Staking<CountingClient>) {
        let wallet = LocalSignerWallet::from_hex(KEY).unwrap();
        let mut tracker = ConnectionTracker::new();
        tracker.initialize(Some(&wallet)).await;

        let config = StakingConfig {
            stake_contract_address: Address::with_last_byte(0xcc),
            pool_id: PoolId::new(0),
            ..StakingConfig::default()
        };
        let client = Arc::new(CountingClient::default());
        let staking = Staking {
            stake: StakeFlow::new(Some(client.clone()), &config, tracker.watch()),
            unstake: UnstakeFlow::new(Some(client.clone()), &config, tracker.watch()),
            config,
            tracker,
        };
        staking.refresh().await;
        (client, staking)
    }

    fn amount(text: &str) -> AmountArgs {
        AmountArgs {
            amount: text.to_string(),
        }
    }

    #[tokio::test]
    async fn unstake_reads_user_data_once_after_finality() {
        let (client, staking) = staking().await;
        let (native, staked, withdraw) = client.counts();

        let exit = handle_unstake(&staking, amount("1")).await;

        assert_eq!(exit, ExitCode::SUCCESS);
        // the unstake view reads its position once, the stake view its balances once
        assert_eq!(client.counts(), (native + 1, staked + 2, withdraw + 1));
    }

    #[tokio::test]
    async fn withdraw_reads_user_data_once_after_finality() {
        let (client, staking) = staking().await;
        let (native, staked, withdraw) = client.counts();

        let exit = handle_withdraw(&staking).await;

        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(client.counts(), (native + 1, staked + 2, withdraw + 1));
    }

    #[tokio::test]
    async fn stake_reads_each_balance_once_after_finality() {
        let (client, staking) = staking().await;
        let (native, staked, withdraw) = client.counts();

        let exit = handle_stake(&staking, amount("1")).await;

        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(client.counts(), (native + 1, staked + 2, withdraw + 1));
    }

    #[tokio::test]
    async fn rejected_operation_reads_nothing() {
        let (client, staking) = staking().await;
        let before = client.counts();

        let exit = handle_unstake(&staking, amount("11")).await;

        assert_eq!(exit, ExitCode::FAILURE);
        assert_eq!(client.counts(), before);
    }
}
