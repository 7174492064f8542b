use alloy::primitives::U256;
use bookie_flow::{BetPlan, MinOddsPolicy, NetworkConfig, Plan, RedeemPlan, Route, DEFAULT_DEADLINE_SECS};
use bookie_types::{parse_address, BetSelection, BookieError, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bookie")]
#[command(version)]
#[command(about = "Place and redeem bets through a gasless transaction relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Submit without asking for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bet on one outcome
    Single {
        /// Condition id (decimal)
        #[arg(long)]
        condition: String,

        /// Outcome id within the condition
        #[arg(long)]
        outcome: String,

        #[command(flatten)]
        bet: BetArgs,
    },

    /// Bet on several outcomes as one combo
    Combo {
        /// One leg, repeat for each selection
        #[arg(long = "leg", value_name = "CONDITION:OUTCOME", required = true)]
        legs: Vec<String>,

        #[command(flatten)]
        bet: BetArgs,
    },

    /// Withdraw the payout of a settled bet
    Redeem {
        /// Bet token id
        #[arg(long)]
        bet_id: String,

        /// Stake-token allowance granted to the relay for its fee
        #[arg(long, default_value = "1.0")]
        fee_allowance: String,

        /// Send only the withdraw call
        #[arg(long, conflicts_with = "fee_allowance")]
        no_fee_allowance: bool,
    },
}

#[derive(Args, Debug)]
pub struct BetArgs {
    /// Stake in stake-token units, e.g. 0.1
    #[arg(long, env = "USDT_TO_BET")]
    pub stake: String,

    /// Currently quoted decimal odds
    #[arg(long, required_unless_present = "no_min_odds")]
    pub odds: Option<String>,

    /// Accepted odds drop, in percent
    #[arg(long, default_value = "4")]
    pub slippage: String,

    /// Accept any odds (no slippage protection)
    #[arg(long, conflicts_with = "odds")]
    pub no_min_odds: bool,

    #[arg(long, value_enum, default_value_t = RouteArg::Direct)]
    pub route: RouteArg,

    /// Seconds until the bet offer expires
    #[arg(long, default_value_t = DEFAULT_DEADLINE_SECS)]
    pub deadline_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RouteArg {
    /// Straight to the liquidity pool
    Direct,
    /// Through the proxy front
    Proxy,
}

/// Overrides for the default deployment.
#[derive(Args, Debug, Default)]
pub struct NetworkArgs {
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    #[arg(long, global = true)]
    pub destination_chain: Option<u64>,

    #[arg(long, global = true)]
    pub stake_token: Option<String>,

    #[arg(long, global = true)]
    pub stake_symbol: Option<String>,

    #[arg(long, global = true)]
    pub stake_decimals: Option<u8>,

    #[arg(long, global = true)]
    pub liquidity_pool: Option<String>,

    #[arg(long, global = true)]
    pub prematch_core: Option<String>,

    #[arg(long, global = true)]
    pub express_core: Option<String>,

    #[arg(long, global = true)]
    pub proxy_front: Option<String>,

    #[arg(long, global = true)]
    pub relay_spender: Option<String>,

    #[arg(long, global = true)]
    pub affiliate: Option<String>,
}

impl NetworkArgs {
    pub fn apply(&self, network: &mut NetworkConfig) -> Result<()> {
        if let Some(chain_id) = self.chain_id {
            network.chain_id = chain_id;
        }
        if self.destination_chain.is_some() {
            network.destination_chain = self.destination_chain;
        }
        if let Some(symbol) = &self.stake_symbol {
            network.stake_symbol = symbol.clone();
        }
        if let Some(decimals) = self.stake_decimals {
            network.stake_decimals = decimals;
        }

        let addresses = [
            (&self.stake_token, &mut network.stake_token),
            (&self.liquidity_pool, &mut network.liquidity_pool),
            (&self.prematch_core, &mut network.prematch_core),
            (&self.express_core, &mut network.express_core),
            (&self.proxy_front, &mut network.proxy_front),
            (&self.relay_spender, &mut network.relay_spender),
            (&self.affiliate, &mut network.affiliate),
        ];
        for (arg, slot) in addresses {
            if let Some(value) = arg {
                *slot = parse_address(value)?;
            }
        }
        Ok(())
    }
}

impl BetArgs {
    fn into_plan(self, selections: Vec<BetSelection>) -> Result<Plan> {
        let min_odds = match self.odds {
            Some(odds) if !self.no_min_odds => MinOddsPolicy::Slippage {
                current_odds: bookie_codec::parse_decimal(&odds)?,
                slippage_percent: bookie_codec::parse_decimal(&self.slippage)?,
            },
            _ => MinOddsPolicy::Unprotected,
        };
        let route = match self.route {
            RouteArg::Direct => Route::Direct,
            RouteArg::Proxy => Route::Proxy,
        };
        Ok(Plan::Bet(BetPlan {
            stake: self.stake,
            selections,
            route,
            min_odds,
            affiliate: None,
            deadline_secs: self.deadline_secs,
        }))
    }
}

/// `CONDITION:OUTCOME`
fn parse_leg(leg: &str) -> Result<BetSelection> {
    let (condition, outcome) = leg
        .split_once(':')
        .ok_or_else(|| BookieError::Config(format!("leg {:?} is not CONDITION:OUTCOME", leg)))?;
    BetSelection::parse(condition.trim(), outcome.trim())
}

impl Commands {
    pub fn into_plan(self) -> Result<Plan> {
        match self {
            Commands::Single { condition, outcome, bet } => {
                let selection = BetSelection::parse(&condition, &outcome)?;
                bet.into_plan(vec![selection])
            }
            Commands::Combo { legs, bet } => {
                if legs.len() < 2 {
                    return Err(BookieError::Config("a combo needs at least two legs".into()));
                }
                let selections = legs.iter().map(|l| parse_leg(l)).collect::<Result<Vec<_>>>()?;
                bet.into_plan(selections)
            }
            Commands::Redeem { bet_id, fee_allowance, no_fee_allowance } => {
                let bet_id: U256 = bet_id
                    .trim()
                    .parse()
                    .map_err(|e| BookieError::Config(format!("invalid bet id {:?}: {}", bet_id, e)))?;
                Ok(Plan::Redeem(RedeemPlan {
                    bet_id,
                    fee_allowance: (!no_fee_allowance).then_some(fee_allowance),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const CONDITION: &str = "100100000000000015811616850000000000000263423119";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bookie").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_single_with_slippage() {
        let cli = parse(&[
            "single", "--condition", CONDITION, "--outcome", "2361", "--stake", "0.1", "--odds", "1.835601489481",
        ]);
        assert!(!cli.yes);
        match cli.command.into_plan().unwrap() {
            Plan::Bet(bet) => {
                assert_eq!(bet.stake, "0.1");
                assert_eq!(bet.selections.len(), 1);
                assert_eq!(bet.selections[0].outcome_id, 2361);
                assert_eq!(bet.route, Route::Direct);
                assert_eq!(bet.deadline_secs, DEFAULT_DEADLINE_SECS);
                match bet.min_odds {
                    MinOddsPolicy::Slippage { slippage_percent, .. } => {
                        assert_eq!(slippage_percent.to_string(), "4")
                    }
                    other => panic!("unexpected policy {:?}", other),
                }
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_odds_or_explicit_opt_out_required() {
        let missing = Cli::try_parse_from([
            "bookie", "single", "--condition", CONDITION, "--outcome", "1", "--stake", "1",
        ]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "bookie", "single", "--condition", CONDITION, "--outcome", "1", "--stake", "1", "--odds", "1.5",
            "--no-min-odds",
        ]);
        assert!(both.is_err());

        let cli = parse(&["single", "--condition", CONDITION, "--outcome", "1", "--stake", "1", "--no-min-odds"]);
        match cli.command.into_plan().unwrap() {
            Plan::Bet(bet) => assert!(matches!(bet.min_odds, MinOddsPolicy::Unprotected)),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_combo_legs_keep_order() {
        let cli = parse(&[
            "combo", "--leg", "300:7", "--leg", "200:9", "--stake", "2", "--odds", "3.1", "--route", "proxy", "-y",
        ]);
        assert!(cli.yes);
        match cli.command.into_plan().unwrap() {
            Plan::Bet(bet) => {
                assert!(bet.is_combo());
                assert_eq!(bet.route, Route::Proxy);
                assert_eq!(bet.selections[0].condition_id, U256::from(300u64));
                assert_eq!(bet.selections[1].outcome_id, 9);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_combo_rejects_bad_legs() {
        let one = parse(&["combo", "--leg", "300:7", "--stake", "2", "--odds", "3.1"]);
        assert!(matches!(one.command.into_plan(), Err(BookieError::Config(_))));

        let malformed = parse(&["combo", "--leg", "300:7", "--leg", "200", "--stake", "2", "--odds", "3.1"]);
        assert!(matches!(malformed.command.into_plan(), Err(BookieError::Config(_))));
    }

    #[test]
    fn test_redeem_defaults_and_opt_out() {
        let cli = parse(&["redeem", "--bet-id", "38325"]);
        match cli.command.into_plan().unwrap() {
            Plan::Redeem(redeem) => {
                assert_eq!(redeem.bet_id, U256::from(38325u64));
                assert_eq!(redeem.fee_allowance.as_deref(), Some("1.0"));
            }
            other => panic!("unexpected plan {:?}", other),
        }

        let cli = parse(&["redeem", "--bet-id", "38325", "--no-fee-allowance"]);
        match cli.command.into_plan().unwrap() {
            Plan::Redeem(redeem) => assert!(redeem.fee_allowance.is_none()),
            other => panic!("unexpected plan {:?}", other),
        }

        let cli = parse(&["redeem", "--bet-id", "not-a-number"]);
        assert!(cli.command.into_plan().is_err());
    }

    #[test]
    fn test_network_overrides() {
        let cli = parse(&[
            "--chain-id",
            "80002",
            "--destination-chain",
            "80002",
            "--liquidity-pool",
            "0x0000000000000000000000000000000000000001",
            "redeem",
            "--bet-id",
            "1",
        ]);
        let mut network = NetworkConfig::default();
        cli.network.apply(&mut network).unwrap();
        assert_eq!(network.chain_id, 80002);
        assert_eq!(network.destination_chain, Some(80002));
        assert_eq!(network.liquidity_pool, address!("0x0000000000000000000000000000000000000001"));
        assert_eq!(network.prematch_core, NetworkConfig::default().prematch_core);

        let bad = NetworkArgs {
            proxy_front: Some("0x1234".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad.apply(&mut NetworkConfig::default()),
            Err(BookieError::InvalidAddress(_))
        ));
    }
}
