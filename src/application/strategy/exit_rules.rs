//! Exit triggers for an open position.
//!
//! The triggers form an ordered rule table. Evaluation walks the table
//! once per tick and short-circuits on the first rule that fires; the
//! suppression rules (no-sell-at-loss, no-sell band) end the walk with a
//! hold that also masks any SELL the signal layer produced this tick.
//! Prevent-loss sits above both suppressions and overrides every other
//! exit.

use crate::config::Config;
use crate::domain::position::Position;
use rust_decimal::Decimal;
use tracing::warn;

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    PreventLoss,
    TrailingStopLoss,
    LowerFailsafe,
    FibonacciFloor,
    ProfitBankUpper,
    ProfitBankReversal,
    SellAtResistance,
}

impl ExitReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ExitReason::PreventLoss => "time to sell before losing funds! Prevent Loss Activated!",
            ExitReason::TrailingStopLoss => "Trailing Stop Loss Triggered",
            ExitReason::LowerFailsafe => "Loss Failsafe Triggered (sell_lower_pcnt)",
            ExitReason::FibonacciFloor => "Loss Failsafe Triggered (Fibonacci Band)",
            ExitReason::ProfitBankUpper => "Profit Bank Triggered (sell_upper_pcnt)",
            ExitReason::ProfitBankReversal => "Profit Bank Triggered (Strong Reversal Detected)",
            ExitReason::SellAtResistance => "Profit Bank Triggered (Selling At Resistance)",
        }
    }
}

/// Tick-local facts the rules consume.
#[derive(Debug, Clone, Copy)]
pub struct ExitInputs {
    pub price: Decimal,
    /// Resistance target from the Fibonacci Bollinger band table.
    pub price_exit: Decimal,
    pub margin: Decimal,
    pub change_pcnt_high: Decimal,
    pub obv_pc: Decimal,
    pub macdltsignal: bool,
}

/// Result of one walk over the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Sell(ExitReason),
    Hold {
        /// A suppression rule matched: any SELL from the signal layer is
        /// downgraded to WAIT for the remainder of this tick.
        suppressed: bool,
    },
}

/// Walks the exit-trigger table for a long position.
pub fn evaluate(config: &Config, position: &mut Position, inputs: &ExitInputs) -> ExitDecision {
    let margin = inputs.margin;

    // 1. prevent-loss: two-phase latch, overrides every other rule. A
    //    trigger of zero skips the latch and watches the margin floor only.
    if config.prevent_loss {
        if !position.prevent_loss && margin > config.prevent_loss_trigger {
            position.prevent_loss = true;
            warn!(
                "reached prevent loss trigger of {}%, watching margin ({}%) to prevent loss",
                config.prevent_loss_trigger, config.prevent_loss_margin
            );
        }
        let latched = position.prevent_loss && margin <= config.prevent_loss_margin;
        let unlatched = config.prevent_loss_trigger.is_zero()
            && margin <= config.prevent_loss_margin;
        if latched || unlatched {
            return ExitDecision::Sell(ExitReason::PreventLoss);
        }
    }

    // 2. no-sell-at-loss veto
    if !config.sell_at_loss && margin <= Decimal::ZERO {
        return ExitDecision::Hold { suppressed: true };
    }

    // 3. no-sell band
    if let (Some(min), Some(max)) = (config.nosell_min_pcnt, config.nosell_max_pcnt)
        && margin >= min
        && margin <= max
    {
        return ExitDecision::Hold { suppressed: true };
    }

    // 4. trailing stop loss
    if let Some(decision) = trailing_stop_loss(config, position, inputs) {
        return decision;
    }

    // 5. loss failsafe at sell_lower_pcnt
    if !config.disable_failsafe_lower_pcnt
        && config.sell_at_loss
        && let Some(lower) = config.sell_lower_pcnt
        && margin < lower
    {
        return ExitDecision::Sell(ExitReason::LowerFailsafe);
    }

    // 6. loss failsafe at the fibonacci floor
    if !config.disable_failsafe_fibonacci_low
        && config.sell_at_loss
        && config.sell_lower_pcnt.is_none()
        && position.fib_low > Decimal::ZERO
        && position.fib_low >= inputs.price
    {
        return ExitDecision::Sell(ExitReason::FibonacciFloor);
    }

    // 7. profit bank at sell_upper_pcnt
    if !config.disable_profit_bank_upper_pcnt
        && let Some(upper) = config.sell_upper_pcnt
        && margin > upper
    {
        return ExitDecision::Sell(ExitReason::ProfitBankUpper);
    }

    // 8. profit bank on a strong reversal
    if !config.disable_profit_bank_reversal
        && margin > Decimal::from(3)
        && inputs.obv_pc < Decimal::ZERO
        && inputs.macdltsignal
    {
        return ExitDecision::Sell(ExitReason::ProfitBankReversal);
    }

    // 9. sell at resistance
    if config.sell_at_resistance
        && margin >= Decimal::from(2)
        && inputs.price > Decimal::ZERO
        && inputs.price >= inputs.price_exit
    {
        return ExitDecision::Sell(ExitReason::SellAtResistance);
    }

    ExitDecision::Hold { suppressed: false }
}

/// Rule 4: fixed or dynamic trailing stop loss. Mutates the position's
/// TSL latches; returns a decision only when the stop fires.
fn trailing_stop_loss(
    config: &Config,
    position: &mut Position,
    inputs: &ExitInputs,
) -> Option<ExitDecision> {
    let tsl_pcnt = position.tsl_pcnt?;

    // the older behaviour gates the stop on the sell-at-loss setting
    if config.tsl_respect_sell_at_loss && !config.sell_at_loss {
        return None;
    }

    let margin = inputs.margin;

    if config.dynamic_tsl {
        let next_trigger = (position.tsl_trigger * config.tsl_trigger_multiplier).round();

        if margin > next_trigger && !position.tsl_max {
            // margin outran the current rung: re-evaluate the ratchet
            position.tsl_triggered = false;
        }

        if !position.tsl_triggered {
            if margin > next_trigger {
                position.tsl_triggered = true;
                position.tsl_trigger = next_trigger;
                let tightened = (tsl_pcnt * config.tsl_multiplier).round_dp(1);
                position.tsl_pcnt = Some(tightened);
                if tightened <= config.tsl_max_pcnt {
                    position.tsl_max = true;
                }
            } else if margin > position.tsl_trigger {
                position.tsl_triggered = true;
            }
        }
    } else if margin > position.tsl_trigger {
        position.tsl_triggered = true;
    }

    let current_pcnt = position.tsl_pcnt.unwrap_or(tsl_pcnt);
    if position.tsl_triggered && inputs.change_pcnt_high < current_pcnt {
        return Some(ExitDecision::Sell(ExitReason::TrailingStopLoss));
    }
    None
}
