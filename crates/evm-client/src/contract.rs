//! ABI bindings for the staking contract.

use alloy::sol;

sol! {
    /// The staking contract.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IStake {
        /// Deposits the transferred value into the default pool.
        function depositETH() external payable;

        /// Requests `amount` of principal out of pool `pid`, starting its cooldown.
        function unstake(uint256 pid, uint256 amount) external;

        /// Pays out everything in pool `pid` whose cooldown has elapsed.
        function withdraw(uint256 pid) external;

        /// Principal `user` has staked in pool `pid`.
        function stakingBalance(uint256 pid, address user) external view returns (uint256);

        /// Outstanding unstake requests of `user` and the part of them that is withdrawable.
        function withdrawAmount(uint256 pid, address user)
            external
            view
            returns (uint256 requestAmount, uint256 pendingWithdrawAmount);
    }
}
