// =============================================================================
// Signal Engine — indicator scoring and recommendation generation
// =============================================================================
//
// Pipeline, run once per analysis tick:
//   1. Compute SMA(5/10/20) and RSI(14) over the trailing closes
//   2. Score bullish vs bearish points:
//        SMA5 > SMA10 > SMA20          => bullish +3   (reversed => bearish +3)
//        price above SMA20             => bullish +1   (below    => bearish +1)
//        RSI < 30 (oversold)           => bullish +2
//        RSI > 70 (overbought)         => bearish +2
//        otherwise RSI > 50            => bullish +1   (<= 50    => bearish +1)
//   3. BUY if bullish > bearish, SELL if bearish > bullish, HOLD on a tie
//   4. Confidence = min(95, 60 + 8 * |bullish - bearish|); HOLD pins 50
//   5. Target/stop from the volatility constant: ±2×vol target, ∓1×vol stop
//
// The evaluation is a pure function of its inputs — `now` is a parameter and
// there is no hidden state, so identical windows always produce identical
// recommendations (modulo the generated id).
//
// Indicators that lack data are skipped, not errored: a window shorter than
// 20 closes simply scores without the SMA factors.
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::indicators::{calculate_rsi, calculate_sma};
use crate::types::{Action, IndicatorSet, Recommendation};

/// Neutral confidence reported for HOLD recommendations.
const HOLD_CONFIDENCE: f64 = 50.0;

/// RSI look-back period.
const RSI_PERIOD: usize = 14;

pub struct SignalEngine;

impl SignalEngine {
    /// Compute the indicator set for a close window.
    ///
    /// `change_pct` is the move of the latest close vs the previous one
    /// (0 when fewer than two samples).
    pub fn indicators(closes: &[f64]) -> IndicatorSet {
        let change_pct = match closes {
            [.., prev, last] if *prev != 0.0 => (last - prev) / prev * 100.0,
            _ => 0.0,
        };

        IndicatorSet {
            sma_5: calculate_sma(closes, 5),
            sma_10: calculate_sma(closes, 10),
            sma_20: calculate_sma(closes, 20),
            rsi_14: calculate_rsi(closes, RSI_PERIOD),
            change_pct,
            samples: closes.len(),
        }
    }

    /// Evaluate the close window and produce one immutable recommendation.
    pub fn evaluate(
        closes: &[f64],
        current_price: f64,
        pair: &str,
        volatility_pct: f64,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let indicators = Self::indicators(closes);

        let mut bullish = 0u32;
        let mut bearish = 0u32;
        let mut reasons: Vec<&str> = Vec::new();

        // ── Moving average stack ─────────────────────────────────────────
        if let (Some(sma5), Some(sma10), Some(sma20)) =
            (indicators.sma_5, indicators.sma_10, indicators.sma_20)
        {
            if sma5 > sma10 && sma10 > sma20 {
                bullish += 3;
                reasons.push("moving averages stacked bullishly (SMA5 > SMA10 > SMA20)");
            } else if sma5 < sma10 && sma10 < sma20 {
                bearish += 3;
                reasons.push("moving averages stacked bearishly (SMA5 < SMA10 < SMA20)");
            }

            if current_price > sma20 {
                bullish += 1;
                reasons.push("price holding above the 20-period average");
            } else {
                bearish += 1;
                reasons.push("price trading below the 20-period average");
            }
        }

        // ── RSI ──────────────────────────────────────────────────────────
        if let Some(rsi) = indicators.rsi_14 {
            if rsi < 30.0 {
                bullish += 2;
                reasons.push("RSI in oversold territory");
            } else if rsi > 70.0 {
                bearish += 2;
                reasons.push("RSI in overbought territory");
            } else if rsi > 50.0 {
                bullish += 1;
                reasons.push("RSI momentum tilted positive");
            } else {
                bearish += 1;
                reasons.push("RSI momentum tilted negative");
            }
        }

        // ── Classification ───────────────────────────────────────────────
        let action = if bullish > bearish {
            Action::Buy
        } else if bearish > bullish {
            Action::Sell
        } else {
            Action::Hold
        };

        let gap = bullish.abs_diff(bearish) as f64;
        let confidence = match action {
            Action::Hold => HOLD_CONFIDENCE,
            _ => (60.0 + 8.0 * gap).min(95.0),
        };

        // ── Target / stop from the volatility constant ───────────────────
        let vol = volatility_pct / 100.0;
        let (target_price, stop_loss) = match action {
            Action::Buy => (
                current_price * (1.0 + vol * 2.0),
                current_price * (1.0 - vol),
            ),
            Action::Sell => (
                current_price * (1.0 - vol * 2.0),
                current_price * (1.0 + vol),
            ),
            Action::Hold => (current_price, current_price),
        };

        let reasoning = if reasons.is_empty() {
            "Insufficient history for a directional read; holding".to_string()
        } else {
            reasons.join(" | ")
        };

        debug!(
            pair,
            bullish,
            bearish,
            action = %action,
            confidence,
            samples = indicators.samples,
            "signal evaluation complete"
        );

        Recommendation {
            id: uuid::Uuid::new_v4().to_string(),
            pair: pair.to_string(),
            timestamp: now,
            action,
            confidence,
            current_price,
            target_price,
            stop_loss,
            reasoning,
            indicators,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn eval(closes: &[f64], price: f64) -> Recommendation {
        SignalEngine::evaluate(closes, price, "EURUSD", 0.5, Utc::now())
    }

    /// A steadily rising window: SMAs stack bullishly, RSI saturates high.
    fn uptrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.05 + i as f64 * 0.001).collect()
    }

    /// A steadily falling window.
    fn downtrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.20 - i as f64 * 0.001).collect()
    }

    #[test]
    fn short_window_leaves_sma20_undefined() {
        let ind = SignalEngine::indicators(&uptrend(19));
        assert!(ind.sma_20.is_none());
        assert!(ind.sma_5.is_some());
        assert!(ind.sma_10.is_some());
    }

    #[test]
    fn short_window_scores_without_sma_factors() {
        // 19 samples: the SMA block is skipped entirely, only RSI scores.
        // A rising window saturates RSI high => overbought => bearish +2.
        let closes = uptrend(19);
        let rec = eval(&closes, *closes.last().unwrap());
        assert_eq!(rec.action, Action::Sell);
        assert!((rec.confidence - 76.0).abs() < 1e-9); // 60 + 8 * 2
    }

    #[test]
    fn tiny_window_holds_with_neutral_confidence() {
        let closes = uptrend(5);
        let rec = eval(&closes, 1.06);
        assert_eq!(rec.action, Action::Hold);
        assert!((rec.confidence - 50.0).abs() < 1e-9);
        assert_eq!(rec.target_price, rec.current_price);
        assert_eq!(rec.stop_loss, rec.current_price);
    }

    #[test]
    fn downtrend_nets_out_to_sell_despite_oversold_rsi() {
        // Full window, falling prices: SMA stack bearish (+3), price below
        // SMA20 (+1), but RSI reads fully oversold (bullish +2).
        let closes = downtrend(30);
        let rec = eval(&closes, *closes.last().unwrap());
        assert_eq!(rec.action, Action::Sell); // bearish 4 vs bullish 2
        assert!((rec.confidence - 76.0).abs() < 1e-9); // 60 + 8 * 2
    }

    #[test]
    fn confidence_caps_at_95_on_maximum_gap() {
        // Engineer every bearish factor at once: a high old plateau keeps
        // SMA20 elevated, the tail drifts down (bearish stack, price below
        // SMA20), and a single large up-spike early in the RSI window keeps
        // the oscillator overbought. Gap 6 => min(95, 60 + 48) = 95.
        let mut closes = vec![2.0; 10];
        closes.push(1.0);
        closes.push(1.5);
        for i in 0..13 {
            closes.push(1.499 - i as f64 * 0.001);
        }
        let price = *closes.last().unwrap();
        let rec = eval(&closes, price);
        assert_eq!(rec.action, Action::Sell);
        assert!((rec.confidence - 95.0).abs() < 1e-9);
    }

    #[test]
    fn buy_orders_target_above_and_stop_below() {
        // A monotone uptrend scores bullish 4 (stack + price above SMA20)
        // against bearish 2 (saturated RSI) — a definite BUY.
        let closes = uptrend(30);
        let price = *closes.last().unwrap();
        let rec = eval(&closes, price);

        assert_eq!(rec.action, Action::Buy);
        assert!((rec.confidence - 76.0).abs() < 1e-9); // 60 + 8 * 2
        assert!(rec.target_price > rec.current_price);
        assert!(rec.current_price > rec.stop_loss);
        // 0.5% volatility: target +1.0%, stop -0.5%.
        assert!((rec.target_price - price * 1.01).abs() < 1e-9);
        assert!((rec.stop_loss - price * 0.995).abs() < 1e-9);
    }

    #[test]
    fn sell_orders_target_below_and_stop_above() {
        let closes = downtrend(30);
        let price = *closes.last().unwrap();
        let rec = eval(&closes, price);
        assert_eq!(rec.action, Action::Sell);
        assert!(rec.target_price < rec.current_price);
        assert!(rec.current_price < rec.stop_loss);
        assert!((rec.target_price - price * 0.99).abs() < 1e-9);
        assert!((rec.stop_loss - price * 1.005).abs() < 1e-9);
    }

    #[test]
    fn confidence_stays_within_documented_band() {
        for closes in [uptrend(30), downtrend(30), uptrend(19), downtrend(16)] {
            let rec = eval(&closes, *closes.last().unwrap());
            match rec.action {
                Action::Hold => assert!((rec.confidence - 50.0).abs() < 1e-9),
                _ => assert!(
                    (60.0..=95.0).contains(&rec.confidence),
                    "confidence {} out of band",
                    rec.confidence
                ),
            }
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let closes = downtrend(30);
        let now = Utc::now();
        let a = SignalEngine::evaluate(&closes, 1.17, "EURUSD", 0.5, now);
        let b = SignalEngine::evaluate(&closes, 1.17, "EURUSD", 0.5, now);
        assert_eq!(a.action, b.action);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.target_price, b.target_price);
        assert_eq!(a.reasoning, b.reasoning);
    }

    #[test]
    fn change_pct_tracks_last_transition() {
        let ind = SignalEngine::indicators(&[1.0, 1.0, 1.02]);
        assert!((ind.change_pct - 2.0).abs() < 1e-9);

        let ind = SignalEngine::indicators(&[1.0]);
        assert!(ind.change_pct.abs() < 1e-12);
    }
}
