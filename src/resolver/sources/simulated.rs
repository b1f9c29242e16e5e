//! Simulated value generator
//!
//! Keyword classifier that picks a plausible range for an item when no live
//! source covers it. The band order is a fixed contract: the first band whose
//! keywords match the lower-cased name wins.

use async_trait::async_trait;
use rand::Rng;

use super::ValueSource;
use crate::error::Result;
use crate::types::{round2, MonitoringItem, Tier};

/// Range family selected for an item name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueBand {
    /// Yields, rates, spreads
    Rate,
    /// Ratios, valuation multiples, volatility indices
    Multiple,
    /// Oscillators and sentiment gauges
    Oscillator,
    Default,
}

/// Keywords of one band: long terms match anywhere in the name, short
/// tokens only as whole words.
struct Keywords {
    substrings: &'static [&'static str],
    words: &'static [&'static str],
}

impl Keywords {
    fn matches(&self, lower: &str, words: &[&str]) -> bool {
        self.substrings.iter().any(|k| lower.contains(k))
            || self.words.iter().any(|k| words.contains(k))
    }
}

const RATE_KEYWORDS: Keywords = Keywords {
    substrings: &["yield", "rate", "spread", "殖利率", "利率", "利差"],
    words: &[],
};
const MULTIPLE_KEYWORDS: Keywords = Keywords {
    substrings: &[
        "ratio",
        "p/e",
        "multiple",
        "vix",
        "volatility",
        "本益比",
        "波動",
    ],
    words: &["pe", "cape", "move"],
};
const OSCILLATOR_KEYWORDS: Keywords = Keywords {
    substrings: &[
        "momentum",
        "fear",
        "greed",
        "sentiment",
        "bias",
        "deviation",
        "乖離",
        "恐慌",
        "貪婪",
    ],
    words: &["rsi"],
};

impl ValueBand {
    /// Inclusive range of simulated values
    pub fn range(&self) -> (f64, f64) {
        match self {
            ValueBand::Rate => (1.5, 5.5),
            ValueBand::Multiple => (10.0, 40.0),
            ValueBand::Oscillator => (20.0, 80.0),
            ValueBand::Default => (10.0, 150.0),
        }
    }
}

/// Classify an item name into its simulation band.
pub fn classify(name: &str) -> ValueBand {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if RATE_KEYWORDS.matches(&lower, &words) {
        ValueBand::Rate
    } else if MULTIPLE_KEYWORDS.matches(&lower, &words) {
        ValueBand::Multiple
    } else if OSCILLATOR_KEYWORDS.matches(&lower, &words) {
        ValueBand::Oscillator
    } else {
        ValueBand::Default
    }
}

/// Simulated value for an item, rounded to 2 decimals.
pub fn simulate_value(name: &str) -> f64 {
    simulate_value_with(name, &mut rand::thread_rng())
}

pub fn simulate_value_with<R: Rng + ?Sized>(name: &str, rng: &mut R) -> f64 {
    let (low, high) = classify(name).range();
    round2(rng.gen_range(low..=high))
}

/// Last-resort tier; always produces a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSource;

impl SimulatedSource {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, item: &MonitoringItem) -> f64 {
        simulate_value(&item.name)
    }
}

#[async_trait]
impl ValueSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn tier(&self) -> Tier {
        Tier::Simulated
    }

    async fn resolve(&self, item: &MonitoringItem) -> Result<Option<f64>> {
        Ok(Some(self.generate(item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn classifies_by_keyword_family() {
        assert_eq!(classify("US 10Y Yield"), ValueBand::Rate);
        assert_eq!(classify("Fed Funds Rate"), ValueBand::Rate);
        assert_eq!(classify("High Yield Spread"), ValueBand::Rate);
        assert_eq!(classify("Shiller CAPE"), ValueBand::Multiple);
        assert_eq!(classify("SP500 PE"), ValueBand::Multiple);
        assert_eq!(classify("VIX"), ValueBand::Multiple);
        assert_eq!(classify("Fear & Greed Index"), ValueBand::Oscillator);
        assert_eq!(classify("TAIEX RSI"), ValueBand::Oscillator);
        assert_eq!(classify("台股乖離率"), ValueBand::Oscillator);
        assert_eq!(classify("Gold"), ValueBand::Default);
    }

    #[test]
    fn first_matching_band_wins() {
        // rate beats ratio
        assert_eq!(classify("Yield to PE Ratio"), ValueBand::Rate);
        // volatility beats sentiment
        assert_eq!(classify("VIX Sentiment"), ValueBand::Multiple);
        // "pe" inside a word is not the valuation keyword
        assert_eq!(classify("Copper"), ValueBand::Default);
    }

    #[test]
    fn short_tokens_only_match_whole_words() {
        assert_eq!(classify("Europe Equity Index"), ValueBand::Default);
        assert_eq!(classify("Japan Landscape"), ValueBand::Default);
        assert_eq!(classify("Diversified Fund"), ValueBand::Default);
        assert_eq!(classify("Removed Listings"), ValueBand::Default);
        assert_eq!(classify("Escape Velocity Fund"), ValueBand::Default);

        assert_eq!(classify("sp500_pe"), ValueBand::Multiple);
        assert_eq!(classify("NASDAQ-PE"), ValueBand::Multiple);
        assert_eq!(classify("MOVE Index"), ValueBand::Multiple);
        assert_eq!(classify("Weekly RSI(14)"), ValueBand::Oscillator);
    }

    #[test]
    fn simulated_values_stay_in_band_for_any_seed() {
        let names = ["US 10Y Yield", "VIX", "Fear Greed", "Copper", "Put/Call Ratio"];
        for seed in 0..500u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for name in names {
                let (low, high) = classify(name).range();
                let v = simulate_value_with(name, &mut rng);
                assert!(v >= low && v <= high, "{} -> {} outside [{}, {}]", name, v, low, high);
                assert_eq!(v, round2(v));
            }
        }
    }

    #[tokio::test]
    async fn source_always_resolves() {
        let source = SimulatedSource::new();
        let value = source
            .resolve(&MonitoringItem::new("Anything"))
            .await
            .unwrap();
        assert!(value.is_some());
        assert_eq!(source.tier(), Tier::Simulated);
    }
}
