//! Plan context. Callers pass the plan with every request; nothing here is global.

use serde::{Deserialize, Serialize};

use crate::drawer::ExplanationMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanContext {
    pub is_enterprise: bool,
    pub explanations_enabled: bool,
    /// Credits left in the current period. Ignored for enterprise plans.
    pub credits_remaining: Option<u32>,
}

impl Default for PlanContext {
    fn default() -> Self {
        Self {
            is_enterprise: false,
            explanations_enabled: true,
            credits_remaining: Some(0),
        }
    }
}

/// Why an explanation action was turned into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BlockReason {
    ExplanationsOff,
    InsufficientCredits { needed: u32, remaining: u32 },
}

impl PlanContext {
    pub fn mode(&self) -> ExplanationMode {
        if !self.explanations_enabled {
            ExplanationMode::Off
        } else if self.is_enterprise {
            ExplanationMode::Full
        } else {
            ExplanationMode::Lite
        }
    }

    pub fn is_metered(&self) -> bool {
        !self.is_enterprise
    }

    /// Checks whether an action needing `needed` explanations may proceed.
    pub fn check(&self, needed: u32) -> Result<(), BlockReason> {
        if self.mode() == ExplanationMode::Off {
            return Err(BlockReason::ExplanationsOff);
        }
        if self.is_metered() {
            let remaining = self.credits_remaining.unwrap_or(0);
            if remaining < needed {
                return Err(BlockReason::InsufficientCredits { needed, remaining });
            }
        }
        Ok(())
    }

    /// Spends credits on metered plans. Saturates at zero.
    pub fn consume(&mut self, n: u32) {
        if self.is_metered() {
            let remaining = self.credits_remaining.unwrap_or(0);
            self.credits_remaining = Some(remaining.saturating_sub(n));
        }
    }
}

#[cfg(test)]
impl PlanContext {
    pub fn enterprise() -> Self {
        Self {
            is_enterprise: true,
            explanations_enabled: true,
            credits_remaining: None,
        }
    }

    pub fn metered(credits: u32) -> Self {
        Self {
            is_enterprise: false,
            explanations_enabled: true,
            credits_remaining: Some(credits),
        }
    }
}
