use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use super::{status::print_status, Staking};

pub(crate) async fn handle_watch(staking: &Staking) -> Result<ExitCode> {
    if !staking.tracker.is_listening() {
        println!("no wallet to follow");
        print_status(staking);
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = staking.tracker.watch();
    print_status(staking);

    loop {
        tokio::select! {
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = session.borrow_and_update().clone();
                info!(session = %current, epoch = current.epoch(), "refreshing after account change");
                staking.refresh().await;
                println!();
                print_status(staking);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("interrupted, stopping");
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
