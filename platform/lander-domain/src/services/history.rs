use crate::value_objects::snapshot::HistorySample;

/// Number of most recent history samples the reward trend looks at.
pub const TREND_WINDOW: usize = 10;

pub fn unzip_history(tail: &[HistorySample]) -> (Vec<u64>, Vec<f64>) {
    tail.iter().map(|s| (s.episode(), s.reward())).unzip()
}

/// Last minus first reward over the most recent `TREND_WINDOW` samples.
pub fn reward_trend(tail: &[HistorySample]) -> f64 {
    let start = tail.len().saturating_sub(TREND_WINDOW);
    let recent = &tail[start..];
    if recent.len() < 2 {
        return 0.0;
    }
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) => last.reward() - first.reward() + 0.0,
        _ => 0.0,
    }
}
