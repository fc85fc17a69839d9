//! Per-model pricing for usage cost reporting.

use assistant_core::TokenUsage;

/// Cents per million tokens, input and output.
#[derive(Debug, Clone, Copy)]
struct Rate {
    input: u64,
    output: u64,
}

/// Known model rates. Unknown models fall back to [`DEFAULT_RATE`].
const RATES: &[(&str, Rate)] = &[
    (
        "torque-large",
        Rate {
            input: 300,
            output: 1500,
        },
    ),
    (
        "torque-fast",
        Rate {
            input: 25,
            output: 125,
        },
    ),
    (
        "torque-vision",
        Rate {
            input: 300,
            output: 1500,
        },
    ),
];

const DEFAULT_RATE: Rate = Rate {
    input: 300,
    output: 1500,
};

fn rate_for(model: &str) -> Rate {
    RATES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_RATE)
}

/// Cost of a usage record in cents, rounded up so sub-cent turns are never
/// billed as free.
pub fn cost_cents(model: &str, usage: TokenUsage) -> u32 {
    let rate = rate_for(model);
    let micros = usage.input_tokens * rate.input + usage.output_tokens * rate.output;
    if micros == 0 {
        return 0;
    }
    micros.div_ceil(1_000_000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_usage_is_free() {
        assert_eq!(cost_cents("torque-large", TokenUsage::default()), 0);
    }

    #[test]
    fn test_rounds_up_to_a_cent() {
        let usage = TokenUsage::new(100, 100);
        assert_eq!(cost_cents("torque-large", usage), 1);
    }

    #[test]
    fn test_large_turn() {
        // 1M input + 1M output on torque-large: 300 + 1500 cents.
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        assert_eq!(cost_cents("torque-large", usage), 1800);
    }

    #[test]
    fn test_fast_model_is_cheaper() {
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        assert!(cost_cents("torque-fast", usage) < cost_cents("torque-large", usage));
    }

    #[test]
    fn test_unknown_model_uses_default_rate() {
        let usage = TokenUsage::new(1_000_000, 0);
        assert_eq!(cost_cents("some-new-model", usage), 300);
    }
}
