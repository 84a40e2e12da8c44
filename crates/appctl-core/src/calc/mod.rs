//! ============================================================================
//! Risk Calculator - Position sizing for a single trade
//! ============================================================================
//! Given capital, risk percentage, entry and stop-loss:
//! - risk amount = capital * risk% / 100
//! - per-share risk = |entry - stop|
//! - quantity = floor(risk amount / per-share risk), 0 when per-share risk is 0
//! - targets at 1:2 through 1:5 reward-to-risk, plus an optional custom ratio
//! ============================================================================

mod save;

pub use save::{CalcSaveClient, SaveError, SaveResponse, SAVE_PATH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default trading capital (20,00,000)
pub const DEFAULT_CAPITAL: f64 = 2_000_000.0;

/// Default risk per trade in percent
pub const DEFAULT_RISK_PERCENT: f64 = 1.0;

/// Reward-to-risk ratios for the standard targets
pub const TARGET_RATIOS: [u32; 4] = [2, 3, 4, 5];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("For Long trades, entry price must be higher than stop loss.")]
    LongStopAboveEntry,

    #[error("For Short trades, entry price must be lower than stop loss.")]
    ShortStopBelowEntry,

    #[error("{field} must be a finite, non-negative number")]
    InvalidAmount { field: &'static str },

    #[error("risk percent must be between 0 and 100")]
    RiskOutOfRange,

    #[error("invalid target ratio '{0}'")]
    InvalidRatio(String),

    #[error("unknown trade direction '{0}'")]
    UnknownDirection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TradeDirection {
    #[default]
    #[serde(rename = "Buy (Long)")]
    Buy,
    #[serde(rename = "Sell (Short)")]
    Sell,
}

impl TradeDirection {
    /// Label used by the calculator form
    pub fn label(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "Buy (Long)",
            TradeDirection::Sell => "Sell (Short)",
        }
    }

    fn target(&self, entry: f64, per_share_risk: f64, ratio: f64) -> f64 {
        match self {
            TradeDirection::Buy => entry + per_share_risk * ratio,
            TradeDirection::Sell => entry - per_share_risk * ratio,
        }
    }
}

impl FromStr for TradeDirection {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" | "buy (long)" => Ok(TradeDirection::Buy),
            "sell" | "short" | "sell (short)" => Ok(TradeDirection::Sell),
            _ => Err(CalcError::UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calculator form inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInput {
    pub capital: f64,
    pub risk_percent: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub direction: TradeDirection,
    /// "10" or "1:10"
    pub custom_ratio: Option<String>,
}

impl Default for RiskInput {
    fn default() -> Self {
        Self {
            capital: DEFAULT_CAPITAL,
            risk_percent: DEFAULT_RISK_PERCENT,
            entry_price: 0.0,
            stop_loss: 0.0,
            direction: TradeDirection::Buy,
            custom_ratio: None,
        }
    }
}

/// One reward-to-risk target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// 1-based position in the target list
    pub index: usize,
    pub ratio: u32,
    pub price: f64,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target {} (1:{}): {:.2}", self.index, self.ratio, self.price)
    }
}

/// Calculator outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPlan {
    pub input: RiskInput,
    pub risk_amount: f64,
    pub per_share_risk: f64,
    pub quantity: u64,
    pub targets: Vec<Target>,
    pub custom_target: Option<f64>,
}

impl RiskPlan {
    /// Targets as newline-separated text, as stored in calculation history
    pub fn targets_text(&self) -> String {
        self.targets
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for RiskPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Direction:       {}", self.input.direction)?;
        writeln!(f, "Risk amount:     {:.2}", self.risk_amount)?;
        writeln!(f, "Per-share risk:  {:.2}", self.per_share_risk)?;
        writeln!(f, "Quantity:        {}", self.quantity)?;
        for target in &self.targets {
            writeln!(f, "  {}", target)?;
        }
        if let Some(custom) = self.custom_target {
            writeln!(f, "Custom target:   {:.2}", custom)?;
        }
        Ok(())
    }
}

/// Parse a custom ratio; the reward side is the last `:`-separated part
pub fn parse_ratio(raw: &str) -> Result<f64, CalcError> {
    let reward = raw.rsplit(':').next().unwrap_or(raw).trim();
    match reward.parse::<f64>() {
        Ok(ratio) if ratio.is_finite() && ratio > 0.0 => Ok(ratio),
        _ => Err(CalcError::InvalidRatio(raw.to_string())),
    }
}

/// Check form inputs the way the server-side form does
pub fn validate(input: &RiskInput) -> Result<(), CalcError> {
    for (field, value) in [
        ("capital", input.capital),
        ("risk percent", input.risk_percent),
        ("entry price", input.entry_price),
        ("stop loss", input.stop_loss),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(CalcError::InvalidAmount { field });
        }
    }
    if input.risk_percent > 100.0 {
        return Err(CalcError::RiskOutOfRange);
    }

    if input.entry_price > 0.0 && input.stop_loss > 0.0 {
        match input.direction {
            TradeDirection::Buy if input.entry_price <= input.stop_loss => {
                return Err(CalcError::LongStopAboveEntry)
            }
            TradeDirection::Sell if input.entry_price >= input.stop_loss => {
                return Err(CalcError::ShortStopBelowEntry)
            }
            _ => {}
        }
    }

    if let Some(raw) = input.custom_ratio.as_deref().filter(|r| !r.trim().is_empty()) {
        parse_ratio(raw)?;
    }
    Ok(())
}

/// Compute the plan without validation, as the live form does on each keystroke.
/// An unparsable custom ratio yields no custom target.
pub fn compute(input: &RiskInput) -> RiskPlan {
    let risk_amount = input.capital * input.risk_percent / 100.0;
    let per_share_risk = (input.entry_price - input.stop_loss).abs();
    let quantity = if per_share_risk > 0.0 {
        (risk_amount / per_share_risk).floor() as u64
    } else {
        0
    };

    let targets = TARGET_RATIOS
        .iter()
        .enumerate()
        .map(|(i, &ratio)| Target {
            index: i + 1,
            ratio,
            price: input
                .direction
                .target(input.entry_price, per_share_risk, f64::from(ratio)),
        })
        .collect();

    let custom_target = input
        .custom_ratio
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .and_then(|r| parse_ratio(r).ok())
        .map(|ratio| input.direction.target(input.entry_price, per_share_risk, ratio));

    RiskPlan {
        input: input.clone(),
        risk_amount,
        per_share_risk,
        quantity,
        targets,
        custom_target,
    }
}

/// Validate, then compute
pub fn plan(input: &RiskInput) -> Result<RiskPlan, CalcError> {
    validate(input)?;
    Ok(compute(input))
}
