//! Chronological ordering of accepted candles.

use ohlc_core::Candle;

/// Sort ascending by time. Stable: equal timestamps keep their input order.
pub fn sort_candles(candles: &mut [Candle]) {
    candles.sort_by_key(|c| c.time);
}

/// Whether a sequence is non-decreasing in time.
pub fn is_chronological(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].time <= w[1].time)
}
