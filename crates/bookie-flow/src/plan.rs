//! Bet and redeem plans: what to send, turned into relay-ready calls.

use alloy::primitives::{Address, U256};
use bookie_calls::{BetExtra, BetRoute};
use bookie_types::{BetSelection, BookieError, CallDescriptor, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::NetworkConfig;

/// Seconds a bet stays valid after it is built.
pub const DEFAULT_DEADLINE_SECS: u64 = 2000;

/// Which contract the bet call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight to the liquidity pool.
    Direct,
    /// Through the proxy front.
    Proxy,
}

/// How the minimum acceptable odds are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinOddsPolicy {
    /// Derive the bound from the quoted odds and a slippage tolerance in percent.
    Slippage {
        current_odds: Decimal,
        slippage_percent: Decimal,
    },
    /// Send zero: the bet is accepted at whatever odds the core offers.
    Unprotected,
}

/// A bet to place: one selection is a single bet, more is a combo.
#[derive(Debug, Clone)]
pub struct BetPlan {
    /// Stake in stable-asset units, e.g. `"0.1"`.
    pub stake: String,
    pub selections: Vec<BetSelection>,
    pub route: Route,
    pub min_odds: MinOddsPolicy,
    /// Overrides the network's default affiliate.
    pub affiliate: Option<Address>,
    pub deadline_secs: u64,
}

/// Redeem the payout of a settled bet.
#[derive(Debug, Clone)]
pub struct RedeemPlan {
    pub bet_id: U256,
    /// Stable-asset allowance granted to the relay's fee spender, e.g. `"1.0"`.
    pub fee_allowance: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Plan {
    Bet(BetPlan),
    Redeem(RedeemPlan),
}

/// Calls for one relay bundle plus the token amount the relay should pull.
#[derive(Debug, Clone)]
pub struct PreparedCalls {
    pub calls: Vec<CallDescriptor>,
    pub token_amount: U256,
}

impl BetPlan {
    pub fn is_combo(&self) -> bool {
        self.selections.len() > 1
    }

    fn min_odds(&self) -> Result<U256> {
        match self.min_odds {
            MinOddsPolicy::Slippage { current_odds, slippage_percent } => {
                if current_odds <= Decimal::ONE {
                    return Err(BookieError::InvalidOdds(format!(
                        "quoted odds {} must be greater than 1",
                        current_odds
                    )));
                }
                let bound = bookie_codec::min_acceptable_odds(current_odds, slippage_percent)?;
                info!(%current_odds, %slippage_percent, min_odds = %bound, "slippage-protected bet");
                Ok(bound)
            }
            MinOddsPolicy::Unprotected => {
                warn!("minimum odds disabled: bet accepts any odds");
                Ok(U256::ZERO)
            }
        }
    }

    pub fn prepare(&self, network: &NetworkConfig, bettor: Address, now: u64) -> Result<PreparedCalls> {
        if self.selections.is_empty() {
            return Err(BookieError::Other("bet has no selections".into()));
        }

        let amount = bookie_codec::to_fixed_point(&self.stake, network.stake_decimals)?;
        if amount.is_zero() {
            return Err(BookieError::InvalidAmount(format!("{:?}: stake must be positive", self.stake)));
        }

        let (core, data) = if self.is_combo() {
            (network.express_core, bookie_calls::encode_combo_selections(&self.selections)?)
        } else {
            (network.prematch_core, bookie_calls::encode_single_selection(&self.selections[0]))
        };

        let route = match self.route {
            Route::Direct => BetRoute::Direct { pool: network.liquidity_pool },
            Route::Proxy => BetRoute::Proxy {
                proxy: network.proxy_front,
                pool: network.liquidity_pool,
            },
        };

        let extra = BetExtra {
            affiliate: self.affiliate.unwrap_or(network.affiliate),
            min_odds: self.min_odds()?,
            data,
        };
        let expires_at = now.saturating_add(self.deadline_secs);

        let approval = bookie_calls::encode_approval(network.stake_token, route.target(), amount);
        let bet = bookie_calls::encode_bet(&route, bettor, core, amount, expires_at, &extra)?;

        Ok(PreparedCalls {
            calls: vec![approval, bet],
            token_amount: amount,
        })
    }
}

impl RedeemPlan {
    pub fn prepare(&self, network: &NetworkConfig) -> Result<PreparedCalls> {
        let mut calls = Vec::with_capacity(2);
        if let Some(allowance) = &self.fee_allowance {
            let allowance = bookie_codec::to_fixed_point(allowance, network.stake_decimals)?;
            calls.push(bookie_calls::encode_approval(
                network.stake_token,
                network.relay_spender,
                allowance,
            ));
        }
        calls.push(bookie_calls::encode_withdraw(
            network.liquidity_pool,
            network.prematch_core,
            self.bet_id,
        ));

        Ok(PreparedCalls {
            calls,
            token_amount: U256::ZERO,
        })
    }
}

impl Plan {
    pub fn prepare(&self, network: &NetworkConfig, bettor: Address, now: u64) -> Result<PreparedCalls> {
        match self {
            Plan::Bet(bet) => bet.prepare(network, bettor, now),
            Plan::Redeem(redeem) => redeem.prepare(network),
        }
    }

    /// Short label for progress output.
    pub fn describe(&self) -> String {
        match self {
            Plan::Bet(bet) if bet.is_combo() => {
                format!("combo bet ({} legs), stake {}", bet.selections.len(), bet.stake)
            }
            Plan::Bet(bet) => format!("single bet, stake {}", bet.stake),
            Plan::Redeem(redeem) => format!("redeem bet {}", redeem.bet_id),
        }
    }
}
