//! Calldata builders for the betting contracts.
//!
//! - `approve(spender, amount)` on the stable asset
//! - `betFor(...)` on the liquidity pool, or `bet(lp, [...])` on the proxy front
//! - `withdrawPayout(core, betId)` on the liquidity pool
//!
//! Selection payloads come in two shapes that are not interchangeable:
//! a single pick is encoded as two flat words `(uint256, uint64)`, a combo as
//! one dynamic `(uint256, uint64)[]`.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use bookie_types::{BetSelection, BookieError, CallDescriptor, Result};
use tracing::debug;

sol! {
    /// Extra bet data understood by the cores (`IBet.BetData`).
    struct BetExtraData {
        address affiliate;
        uint64 minOdds;
        bytes data;
    }

    /// One bet routed through the proxy front.
    struct ProxyBet {
        address core;
        uint128 amount;
        uint64 expiresAt;
        BetExtraData extraData;
    }

    /// Combo leg, encoded as a tuple inside an array.
    struct ComboLeg {
        uint256 conditionId;
        uint64 outcomeId;
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface ILiquidityPool {
        function betFor(
            address bettor,
            address core,
            uint128 amount,
            uint64 expiresAt,
            BetExtraData calldata betData
        ) external returns (uint256 tokenId);

        function withdrawPayout(address core, uint256 tokenId) external returns (uint128 amount);
    }

    interface IProxyFront {
        function bet(address lp, ProxyBet[] calldata data) external payable;
    }
}

/// Which contract receives the bet call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetRoute {
    /// `betFor` on the liquidity pool.
    Direct { pool: Address },
    /// `bet` on the proxy front, which forwards to `pool`.
    Proxy { proxy: Address, pool: Address },
}

impl BetRoute {
    /// Address the bet call is sent to; also the spender of the stake approval.
    pub fn target(&self) -> Address {
        match self {
            BetRoute::Direct { pool } => *pool,
            BetRoute::Proxy { proxy, .. } => *proxy,
        }
    }
}

/// Affiliate, minimum odds and encoded selections passed along with a bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetExtra {
    pub affiliate: Address,
    /// 12-decimal fixed point; zero disables the check.
    pub min_odds: U256,
    pub data: Bytes,
}

impl BetExtra {
    fn to_sol(&self) -> Result<BetExtraData> {
        let min_odds = u64::try_from(self.min_odds)
            .map_err(|_| BookieError::InvalidOdds(format!("min odds {} exceed uint64", self.min_odds)))?;
        Ok(BetExtraData {
            affiliate: self.affiliate,
            minOdds: min_odds,
            data: self.data.clone(),
        })
    }
}

/// `approve(spender, amount)` on the asset contract.
pub fn encode_approval(asset: Address, spender: Address, amount: U256) -> CallDescriptor {
    let data = IERC20::approveCall { spender, amount }.abi_encode();
    debug!(%asset, %spender, %amount, "encoded approval");
    CallDescriptor::new(asset, data)
}

/// Single pick as two flat values: `abi.encode(uint256 conditionId, uint64 outcomeId)`.
pub fn encode_single_selection(selection: &BetSelection) -> Bytes {
    (selection.condition_id, selection.outcome_id).abi_encode_params().into()
}

/// Combo picks as one tuple array: `abi.encode((uint256, uint64)[])`, order preserved.
pub fn encode_combo_selections(selections: &[BetSelection]) -> Result<Bytes> {
    if selections.is_empty() {
        return Err(BookieError::Other("combo bet needs at least one selection".into()));
    }
    let legs: Vec<ComboLeg> = selections
        .iter()
        .map(|s| ComboLeg {
            conditionId: s.condition_id,
            outcomeId: s.outcome_id,
        })
        .collect();
    Ok(legs.abi_encode().into())
}

/// Place-bet call for either route.
///
/// `bettor` is only part of the direct `betFor` call; through the proxy the
/// sender is the bettor.
pub fn encode_bet(
    route: &BetRoute,
    bettor: Address,
    core: Address,
    amount: U256,
    expires_at: u64,
    extra: &BetExtra,
) -> Result<CallDescriptor> {
    let amount = u128::try_from(amount)
        .map_err(|_| BookieError::InvalidAmount(format!("stake {} exceeds uint128", amount)))?;
    let bet_data = extra.to_sol()?;

    let data = match route {
        BetRoute::Direct { .. } => ILiquidityPool::betForCall {
            bettor,
            core,
            amount,
            expiresAt: expires_at,
            betData: bet_data,
        }
        .abi_encode(),
        BetRoute::Proxy { pool, .. } => IProxyFront::betCall {
            lp: *pool,
            data: vec![ProxyBet {
                core,
                amount,
                expiresAt: expires_at,
                extraData: bet_data,
            }],
        }
        .abi_encode(),
    };

    debug!(target_contract = %route.target(), %core, amount, expires_at, "encoded bet");
    Ok(CallDescriptor::new(route.target(), data))
}

/// `withdrawPayout(core, betId)` on the liquidity pool.
pub fn encode_withdraw(pool: Address, core: Address, bet_id: U256) -> CallDescriptor {
    let data = ILiquidityPool::withdrawPayoutCall { core, tokenId: bet_id }.abi_encode();
    debug!(%pool, %core, %bet_id, "encoded withdraw");
    CallDescriptor::new(pool, data)
}
