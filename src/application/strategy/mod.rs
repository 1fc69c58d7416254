//! The strategy engine.
//!
//! A pure function of (latest indicator row, position state, config,
//! tick-local prices) to a trade decision, composed of four ordered
//! sub-decisions with short-circuit: the buy-near-high veto, the primary
//! EMA/MACD signals (or the custom points strategy), the exit-trigger
//! rule table, and the trailing entry/exit state machines.

pub mod custom;
pub mod exit_rules;
pub mod signals;
pub mod trailing;

use crate::config::Config;
use crate::domain::position::{Action, Position};
use crate::indicators::IndicatorRow;
use custom::CustomSignals;
use exit_rules::{ExitDecision, ExitInputs, ExitReason};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use signals::SignalInputs;

/// Everything the strategy needs for one tick, precomputed by the control
/// loop.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub row: &'a IndicatorRow,
    pub price: Decimal,
    /// Maximum close of the analyzed window.
    pub close_max: Decimal,
    /// Golden-cross state after the simulation ramp-up override.
    pub goldencross: bool,
    /// Margin of the open position (zero while flat).
    pub margin: Decimal,
    pub change_pcnt_high: Decimal,
    /// Resistance target from the Fibonacci Bollinger band table.
    pub price_exit: Decimal,
    /// Present when the custom points strategy is enabled.
    pub custom: Option<&'a CustomSignals>,
}

/// The strategy's verdict for this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Act now instead of waiting for the candle close.
    pub immediate: bool,
    pub exit_reason: Option<ExitReason>,
    pub trailing_log: String,
}

/// Runs the four sub-decisions for one tick. Mutates the position's
/// trailing and latch state exactly the way acting on the decision
/// requires.
pub fn get_action(config: &Config, position: &mut Position, ctx: &StrategyContext) -> Decision {
    let mut exit_reason = None;

    // primary signals; the custom points strategy replaces the EMA/MACD
    // path but keeps the veto and bull-only gates
    let mut action = if !position.is_long() {
        let buy = match ctx.custom {
            Some(scores) => {
                !signals::near_high_veto(config, ctx.price, ctx.close_max)
                    && (ctx.goldencross || config.disable_bull_only)
                    && scores.buy_signal(config, position)
            }
            None => signals::is_buy_signal(
                config,
                position,
                &SignalInputs {
                    row: ctx.row,
                    price: ctx.price,
                    close_max: ctx.close_max,
                    goldencross: ctx.goldencross,
                },
            ),
        };
        if buy { Action::Buy } else { Action::Wait }
    } else {
        let sell = match ctx.custom {
            Some(scores) => scores.sell_signal(config, position),
            None => signals::is_sell_signal(config, ctx.row),
        };
        if sell { Action::Sell } else { Action::Wait }
    };

    // exit triggers run on any open position, whatever the signal layer
    // said, unless a strong custom buy side holds them back
    if position.is_long() && position.last_buy_size > Decimal::ZERO {
        let held_back = ctx
            .custom
            .map(|scores| scores.holds_exit_triggers(config))
            .unwrap_or(false);
        if !held_back {
            let inputs = ExitInputs {
                price: ctx.price,
                price_exit: ctx.price_exit,
                margin: ctx.margin,
                change_pcnt_high: ctx.change_pcnt_high,
                obv_pc: Decimal::from_f64(ctx.row.obv_pc).unwrap_or(Decimal::ZERO),
                macdltsignal: ctx.row.macdltsignal,
            };
            match exit_rules::evaluate(config, position, &inputs) {
                ExitDecision::Sell(reason) => {
                    action = Action::Sell;
                    exit_reason = Some(reason);
                }
                ExitDecision::Hold { suppressed } => {
                    if suppressed && action == Action::Sell {
                        action = Action::Wait;
                    }
                }
            }
        }
    }

    position.action = action;

    // trailing machines confirm direction before the loop acts
    let mut immediate = false;
    let mut trailing_log = String::new();
    match action {
        Action::Buy => {
            let step = trailing::check_trailing_buy(config, position, ctx.price);
            action = step.action;
            immediate = step.immediate;
            trailing_log = step.log_text;
        }
        Action::Sell => {
            if config.trailing_sell_pcnt != Decimal::ZERO
                || config.trailing_sell_immediate_pcnt.is_some()
                || config.trailing_sell_bailout_pcnt.is_some()
            {
                position.trailing_sell = true;
            }
            let step = trailing::check_trailing_sell(config, position, ctx.price);
            action = step.action;
            immediate = step.immediate;
            trailing_log = step.log_text;
        }
        Action::Wait => {
            // a pending trailing entry or exit keeps chasing the price
            // even without a fresh signal this tick
            if position.trailing_buy && !position.is_long() {
                let step = trailing::check_trailing_buy(config, position, ctx.price);
                action = step.action;
                immediate = step.immediate;
                trailing_log = step.log_text;
            } else if position.trailing_sell && position.is_long() {
                let step = trailing::check_trailing_sell(config, position, ctx.price);
                action = step.action;
                immediate = step.immediate;
                trailing_log = step.log_text;
            }
        }
    }

    position.action = action;
    Decision {
        action,
        immediate,
        exit_reason,
        trailing_log,
    }
}
