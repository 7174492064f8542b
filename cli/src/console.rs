//! Terminal side of the workflow: progress output, the y/n prompt, error report.

use std::io::{BufRead, Write};

use bookie_flow::{Confirm, FlowEvent};
use bookie_relay::Quote;
use bookie_types::{BookieError, Result};

const RULE_WIDTH: usize = 60;

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Asks on stdin before anything is signed.
pub struct ConsolePrompt;

impl Confirm for ConsolePrompt {
    fn confirm(&self, _quote: &Quote) -> Result<bool> {
        print!("\nProceed? (y/n): ");
        std::io::stdout()
            .flush()
            .map_err(|e| BookieError::Prompt(e.to_string()))?;

        let mut input = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| BookieError::Prompt(e.to_string()))?;
        Ok(is_yes(&input))
    }
}

fn is_yes(input: &str) -> bool {
    input.trim().to_lowercase() == "y"
}

/// `--yes`: every quote is accepted.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _quote: &Quote) -> Result<bool> {
        Ok(true)
    }
}

pub fn print_event(event: &FlowEvent) {
    match event {
        FlowEvent::Estimating { plan, calls } => {
            println!("\n{}: getting tx estimate for {} calls...", plan, calls);
        }
        FlowEvent::Quoted { cost_summary, total, symbol } => {
            println!("{}", "-".repeat(RULE_WIDTH));
            println!("Cost summary:");
            println!("{}", pretty(cost_summary));
            println!("Total cost (tx amount + gas + fees): {} {}", total, symbol);
            println!("{}", "-".repeat(RULE_WIDTH));
        }
        FlowEvent::Aborted => println!("Cancelled."),
        FlowEvent::Signing { roles } => println!("\nSigning {}...", roles.join(", ")),
        FlowEvent::Executing => println!("\nExecuting transaction..."),
        FlowEvent::Done { receipt } => {
            println!("Transaction submitted:");
            println!("{}", pretty(&receipt.0));
        }
        // Reported by main once the error surfaces.
        FlowEvent::Failed { .. } => {}
    }
}

pub fn report_error(err: &BookieError) {
    eprintln!("We got an error");
    eprintln!("{}", err);
    if let Some(details) = err.details() {
        eprintln!("Error details:");
        eprintln!("{}", pretty(details));
    }
}
