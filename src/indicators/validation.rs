use crate::indicators::error::IndicatorError;
use crate::models::indicators::{Comparator, IndicatorKind, IndicatorParams};

impl IndicatorParams {
    /// Cross-parameter rules that single-parameter domains cannot express
    pub fn check_consistency(&self) -> Result<(), IndicatorError> {
        match self {
            IndicatorParams::MovingAverageCrossover(p) if p.fast >= p.slow => {
                Err(IndicatorError::Inconsistent {
                    kind: IndicatorKind::MovingAverageCrossover,
                    reason: format!("fast MA ({}) must be shorter than slow MA ({})", p.fast, p.slow),
                })
            }
            IndicatorParams::Macd(p) if p.fast_length >= p.slow_length => {
                Err(IndicatorError::Inconsistent {
                    kind: IndicatorKind::Macd,
                    reason: format!(
                        "fast length ({}) must be shorter than slow length ({})",
                        p.fast_length, p.slow_length
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    /// Re-check every typed value against the declared domains
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let kind = self.kind();
        for (name, value) in self.to_subfields() {
            let def = kind
                .param_def(&name)
                .ok_or_else(|| IndicatorError::UnknownParameter {
                    kind,
                    param: name.clone(),
                })?;
            def.check(&value)?;
        }
        self.check_consistency()
    }
}

pub fn validate_comparator(kind: IndicatorKind, comparator: Comparator) -> Result<(), IndicatorError> {
    if kind.allows(comparator) {
        Ok(())
    } else {
        Err(IndicatorError::UnsupportedComparator { kind, comparator })
    }
}
