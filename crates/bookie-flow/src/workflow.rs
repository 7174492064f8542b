//! Workflow driver: one plan, one estimate, at most one execute.
//!
//! Idle → Estimating → AwaitingConfirmation → (Aborted | Signing → Executing → Done).
//! Any error moves to Failed and is returned to the caller.

use std::sync::Arc;

use bookie_relay::{EstimateRequest, ExecutionReceipt, Quote, Relay, SignatureSet};
use bookie_signer::TypedDataSigner;
use bookie_types::{BookieError, Result};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{NetworkConfig, Plan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Estimating,
    AwaitingConfirmation,
    Aborted,
    Signing,
    Executing,
    Done,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Aborted | FlowState::Done | FlowState::Failed)
    }

    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Idle, Estimating)
                | (Estimating, AwaitingConfirmation)
                | (AwaitingConfirmation, Aborted)
                | (AwaitingConfirmation, Signing)
                | (Signing, Executing)
                | (Executing, Done)
                | (Estimating, Failed)
                | (AwaitingConfirmation, Failed)
                | (Signing, Failed)
                | (Executing, Failed)
        )
    }
}

/// Progress notifications for the operator.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    Estimating { plan: String, calls: usize },
    Quoted {
        cost_summary: serde_json::Value,
        total: Decimal,
        symbol: String,
    },
    Aborted,
    Signing { roles: Vec<String> },
    Executing,
    Done { receipt: ExecutionReceipt },
    Failed {
        message: String,
        details: Option<serde_json::Value>,
    },
}

/// Callback type for flow events.
pub type FlowEventHandler = Box<dyn Fn(&FlowEvent) + Send + Sync>;

/// Operator decision point between estimate and execute.
pub trait Confirm: Send + Sync {
    /// `Ok(false)` aborts the flow without error.
    fn confirm(&self, quote: &Quote) -> Result<bool>;
}

/// How a flow that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Aborted,
    Executed(ExecutionReceipt),
}

/// Drives a plan through the relay.
pub struct Workflow {
    network: NetworkConfig,
    relay: Arc<dyn Relay>,
    signer: Arc<dyn TypedDataSigner>,
    confirm: Arc<dyn Confirm>,
    on_event: Option<FlowEventHandler>,
}

impl Workflow {
    pub fn new(
        network: NetworkConfig,
        relay: Arc<dyn Relay>,
        signer: Arc<dyn TypedDataSigner>,
        confirm: Arc<dyn Confirm>,
        on_event: Option<FlowEventHandler>,
    ) -> Self {
        Self { network, relay, signer, confirm, on_event }
    }

    fn emit(&self, event: FlowEvent) {
        if let Some(ref handler) = self.on_event {
            handler(&event);
        }
    }

    fn advance(&self, state: &mut FlowState, next: FlowState) -> Result<()> {
        if !state.can_transition_to(next) {
            return Err(BookieError::Other(format!(
                "invalid flow transition {:?} -> {:?}",
                state, next
            )));
        }
        debug!(from = ?*state, to = ?next, "flow transition");
        *state = next;
        Ok(())
    }

    /// Run the plan once. `now` is the unix time used for the bet deadline.
    pub async fn run(&self, plan: &Plan, now: u64) -> Result<FlowOutcome> {
        let mut state = FlowState::Idle;
        match self.drive(plan, now, &mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if !state.is_terminal() && state.can_transition_to(FlowState::Failed) {
                    state = FlowState::Failed;
                }
                info!(state = ?state, error = %err, "flow failed");
                self.emit(FlowEvent::Failed {
                    message: err.to_string(),
                    details: err.details().cloned(),
                });
                Err(err)
            }
        }
    }

    async fn drive(&self, plan: &Plan, now: u64, state: &mut FlowState) -> Result<FlowOutcome> {
        self.advance(state, FlowState::Estimating)?;
        let user = self.signer.address();
        let prepared = plan.prepare(&self.network, user, now)?;
        self.emit(FlowEvent::Estimating {
            plan: plan.describe(),
            calls: prepared.calls.len(),
        });

        let request = EstimateRequest {
            source_chain: self.network.chain_id,
            destination_chain: self.network.destination_chain,
            source_token: self.network.stake_token,
            user_address: user,
            token_amount: prepared.token_amount.to_string(),
            transactions: prepared.calls,
            expected_erc20_tokens: Vec::new(),
        };
        let quote = self.relay.estimate(&request).await?;
        info!(total = %quote.cost_summary().total_amount, roles = quote.typed_data().len(), "quote received");

        self.advance(state, FlowState::AwaitingConfirmation)?;
        self.emit(FlowEvent::Quoted {
            cost_summary: quote.cost_summary_json().clone(),
            total: quote.cost_summary().total_amount,
            symbol: self.network.stake_symbol.clone(),
        });

        if !self.confirm.confirm(&quote)? {
            self.advance(state, FlowState::Aborted)?;
            info!("operator declined");
            self.emit(FlowEvent::Aborted);
            return Ok(FlowOutcome::Aborted);
        }

        self.advance(state, FlowState::Signing)?;
        let roles: Vec<String> = quote.roles().map(str::to_string).collect();
        self.emit(FlowEvent::Signing { roles });

        let mut signatures = SignatureSet::new();
        for entry in quote.typed_data() {
            let signature = self.signer.sign(&entry.payload)?;
            debug!(role = %entry.role, "typed data signed");
            signatures.insert(&entry.role, signature);
        }
        signatures.ensure_complete(&quote)?;

        self.advance(state, FlowState::Executing)?;
        self.emit(FlowEvent::Executing);
        let receipt = self.relay.execute(&quote, &signatures).await?;

        self.advance(state, FlowState::Done)?;
        info!("bundle submitted");
        self.emit(FlowEvent::Done { receipt: receipt.clone() });
        Ok(FlowOutcome::Executed(receipt))
    }
}
