// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance tracker contract interactions.

use std::str::FromStr;
use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    providers::DynProvider,
    rpc::types::TransactionReceipt,
    sol,
};
use async_trait::async_trait;

use super::client::GatewayError;
use super::types::{OnChainUser, TxReceipt};

// Define the tracker interface using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IBalanceTracker {
        function register(string _username, string _userId) external;
        function deposit() external payable;
        function withdraw(uint256 amount) external;
        function getBalance() external view returns (uint256);
        function users(address account) external view returns (string username, string userId, uint256 balance, bool registered);
    }
}

/// The external ledger contract, as seen by the session engine.
///
/// Every call is made on behalf of `account`. Mutating calls resolve once
/// the transaction is mined; a mined-but-reverted transaction comes back as
/// a receipt with `success == false`, not as an error.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Estimate gas for `register(username, userId)`.
    async fn estimate_register_gas(
        &self,
        account: Address,
        username: &str,
        user_id: &str,
    ) -> Result<u64, GatewayError>;

    /// Submit `register` with an explicit gas limit and wait for the receipt.
    async fn register(
        &self,
        account: Address,
        username: &str,
        user_id: &str,
        gas_limit: u64,
    ) -> Result<TxReceipt, GatewayError>;

    /// Submit `deposit()` with `amount_wei` attached as value.
    async fn deposit(&self, account: Address, amount_wei: U256) -> Result<TxReceipt, GatewayError>;

    /// Submit `withdraw(amount_wei)`.
    async fn withdraw(&self, account: Address, amount_wei: U256)
        -> Result<TxReceipt, GatewayError>;

    /// Read `getBalance()` as seen by `account`.
    async fn get_balance(&self, account: Address) -> Result<U256, GatewayError>;

    /// Read `users(account)`.
    async fn get_identity(&self, account: Address) -> Result<OnChainUser, GatewayError>;
}

/// Alloy-backed contract gateway.
pub struct TrackerContract {
    contract: IBalanceTracker::IBalanceTrackerInstance<DynProvider>,
    confirmation_timeout: Option<Duration>,
}

impl TrackerContract {
    /// Bind the contract at `contract_address` through `provider`.
    ///
    /// The provider must carry a wallet for mutating calls to succeed.
    pub fn new(
        provider: DynProvider,
        contract_address: &str,
        confirmation_timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let address = Address::from_str(contract_address)
            .map_err(|e| GatewayError::InvalidAddress(e.to_string()))?;

        Ok(Self {
            contract: IBalanceTracker::new(address, provider),
            confirmation_timeout,
        })
    }

    /// Contract address.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

fn to_receipt(receipt: TransactionReceipt) -> TxReceipt {
    TxReceipt {
        tx_hash: format!("{:#x}", receipt.transaction_hash),
        block_number: receipt.block_number.unwrap_or(0),
        gas_used: receipt.gas_used as u64,
        success: receipt.status(),
    }
}

#[async_trait]
impl ContractGateway for TrackerContract {
    async fn estimate_register_gas(
        &self,
        account: Address,
        username: &str,
        user_id: &str,
    ) -> Result<u64, GatewayError> {
        self.contract
            .register(username.to_string(), user_id.to_string())
            .from(account)
            .estimate_gas()
            .await
            .map_err(|e| GatewayError::classify_estimation(e.to_string()))
    }

    async fn register(
        &self,
        account: Address,
        username: &str,
        user_id: &str,
        gas_limit: u64,
    ) -> Result<TxReceipt, GatewayError> {
        let pending = self
            .contract
            .register(username.to_string(), user_id.to_string())
            .from(account)
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| GatewayError::classify(e.to_string()))?;

        tracing::debug!(tx_hash = %pending.tx_hash(), "register submitted");

        let receipt = pending
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(map_pending_error)?;
        Ok(to_receipt(receipt))
    }

    async fn deposit(&self, account: Address, amount_wei: U256) -> Result<TxReceipt, GatewayError> {
        let pending = self
            .contract
            .deposit()
            .from(account)
            .value(amount_wei)
            .send()
            .await
            .map_err(|e| GatewayError::classify(e.to_string()))?;

        tracing::debug!(tx_hash = %pending.tx_hash(), "deposit submitted");

        let receipt = pending
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(map_pending_error)?;
        Ok(to_receipt(receipt))
    }

    async fn withdraw(
        &self,
        account: Address,
        amount_wei: U256,
    ) -> Result<TxReceipt, GatewayError> {
        let pending = self
            .contract
            .withdraw(amount_wei)
            .from(account)
            .send()
            .await
            .map_err(|e| GatewayError::classify(e.to_string()))?;

        tracing::debug!(tx_hash = %pending.tx_hash(), "withdraw submitted");

        let receipt = pending
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(map_pending_error)?;
        Ok(to_receipt(receipt))
    }

    async fn get_balance(&self, account: Address) -> Result<U256, GatewayError> {
        self.contract
            .getBalance()
            .from(account)
            .call()
            .await
            .map_err(|e| GatewayError::Rpc(e.to_string()))
    }

    async fn get_identity(&self, account: Address) -> Result<OnChainUser, GatewayError> {
        let user = self
            .contract
            .users(account)
            .call()
            .await
            .map_err(|e| GatewayError::Rpc(e.to_string()))?;

        Ok(OnChainUser {
            username: user.username,
            user_id: user.userId,
            registered: user.registered,
        })
    }
}

fn map_pending_error(e: alloy::providers::PendingTransactionError) -> GatewayError {
    match e {
        alloy::providers::PendingTransactionError::TxWatcher(_) => GatewayError::Timeout,
        other => GatewayError::classify(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::connect_read_only;
    use crate::blockchain::types::DEFAULT_CONTRACT_ADDRESS;
    use alloy::sol_types::SolCall;

    #[test]
    fn binds_contract_address() {
        let provider = connect_read_only("http://127.0.0.1:8545").unwrap();
        let contract = TrackerContract::new(provider, DEFAULT_CONTRACT_ADDRESS, None).unwrap();
        assert_eq!(
            contract.address(),
            DEFAULT_CONTRACT_ADDRESS.parse::<Address>().unwrap()
        );
    }

    #[test]
    fn rejects_bad_contract_address() {
        let provider = connect_read_only("http://127.0.0.1:8545").unwrap();
        assert!(matches!(
            TrackerContract::new(provider, "0x1234", None),
            Err(GatewayError::InvalidAddress(_))
        ));
    }

    #[test]
    fn abi_selectors_match_contract() {
        assert_eq!(IBalanceTracker::depositCall::SIGNATURE, "deposit()");
        assert_eq!(IBalanceTracker::withdrawCall::SIGNATURE, "withdraw(uint256)");
        assert_eq!(
            IBalanceTracker::registerCall::SIGNATURE,
            "register(string,string)"
        );
        assert_eq!(IBalanceTracker::usersCall::SIGNATURE, "users(address)");
    }
}
