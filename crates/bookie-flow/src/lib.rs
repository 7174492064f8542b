//! Bet placement and redemption through the relay.
//!
//! Coordinates the codec, call encoder, relay client and signer:
//! build calls → estimate → confirm → sign every typed-data role → execute.

use alloy::primitives::{address, Address};

pub mod plan;
pub mod workflow;

pub use plan::{BetPlan, MinOddsPolicy, Plan, PreparedCalls, RedeemPlan, Route, DEFAULT_DEADLINE_SECS};
pub use workflow::{Confirm, FlowEvent, FlowEventHandler, FlowOutcome, FlowState, Workflow};

/// Contract addresses and chain settings for one deployment.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    /// Sent as `destinationChain` when set.
    pub destination_chain: Option<u64>,
    pub stake_token: Address,
    pub stake_symbol: String,
    pub stake_decimals: u8,
    pub liquidity_pool: Address,
    pub prematch_core: Address,
    pub express_core: Address,
    pub proxy_front: Address,
    /// Relay contract that collects its fee in the stake token.
    pub relay_spender: Address,
    pub affiliate: Address,
}

impl Default for NetworkConfig {
    /// Polygon mainnet deployment, USDT stakes.
    fn default() -> Self {
        Self {
            chain_id: 137,
            destination_chain: None,
            stake_token: address!("0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
            stake_symbol: "USDT".to_string(),
            stake_decimals: bookie_codec::STAKE_DECIMALS,
            liquidity_pool: address!("0x7043E4e1c4045424858ECBCED80989FeAfC11B36"),
            prematch_core: address!("0xA40F8D69D412b79b49EAbdD5cf1b5706395bfCf7"),
            express_core: address!("0x92a4e8Bc6B92a2e1ced411f41013B5FE6BE07613"),
            proxy_front: address!("0x200BD65A3189930634af857C72281abE63C3da5e"),
            relay_spender: address!("0x9e53D78e8698d4e80d83d573a6A1335F2d80dbBc"),
            affiliate: address!("0x3121e8d2a4f0F220e8C7C7c6D9a7046527A54B19"),
        }
    }
}
