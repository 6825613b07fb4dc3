use crate::domain::price::PriceSeries;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesError {
    Empty,
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::Empty => write!(f, "price series is empty"),
        }
    }
}

impl std::error::Error for SeriesError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation of the prices (divides by N).
    pub volatility: f64,
}

impl SeriesStats {
    pub fn from_series(series: &PriceSeries) -> Result<Self, SeriesError> {
        let current = series.last().ok_or(SeriesError::Empty)?.price;
        let n = series.len() as f64;

        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for p in series.prices() {
            min = min.min(p);
            max = max.max(p);
            sum += p;
        }
        let mean = sum / n;
        let variance = series.prices().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            current,
            min,
            max,
            mean,
            volatility: variance.sqrt(),
        })
    }

    pub fn score(&self) -> Score {
        score(self)
    }
}

/// Sum of three independent votes on where the latest price sits in its window.
///
/// Each vote ranges over its own values, so the total spans -3..=3:
/// 1. below the mean: +1, otherwise -1
/// 2. more than one volatility below the mean: +1, otherwise -1
/// 3. at or below the minimum: +1; at or above the maximum: -1; otherwise 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(i8);

impl Score {
    pub fn value(self) -> i8 {
        self.0
    }

    pub fn tier(self) -> Tier {
        Tier::from(self)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

pub fn score(stats: &SeriesStats) -> Score {
    let SeriesStats {
        current,
        min,
        max,
        mean,
        volatility,
    } = *stats;

    let below_mean = if current < mean { 1 } else { -1 };
    let below_band = if current < mean - volatility { 1 } else { -1 };
    let extreme = if current <= min {
        1
    } else if current >= max {
        -1
    } else {
        0
    };

    Score(below_mean + below_band + extreme)
}

/// Display bucket for a score. This is a colouring heuristic for the history cards,
/// not a validated buy/sell signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Low,
    Neutral,
    High,
}

impl From<Score> for Tier {
    fn from(score: Score) -> Self {
        match score.0 {
            s if s < 0 => Tier::Low,
            s if s >= 2 => Tier::High,
            _ => Tier::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(prices: &[f64]) -> SeriesStats {
        SeriesStats::from_series(&PriceSeries::from_prices(prices)).unwrap()
    }

    #[test]
    fn computes_population_statistics() {
        let s = stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.current, 9.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.volatility - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_series_is_an_error() {
        assert_eq!(
            SeriesStats::from_series(&PriceSeries::default()),
            Err(SeriesError::Empty)
        );
    }

    #[test]
    fn new_low_well_under_the_band_takes_all_three_votes() {
        // mean 10.6, volatility ~1.36, current 8 is below mean - volatility and the minimum.
        let s = stats(&[11.0, 11.0, 12.0, 11.0, 8.0]);
        assert!(s.current < s.mean);
        assert!(s.current < s.mean - s.volatility);
        assert!(s.current <= s.min);
        assert_eq!(s.score().value(), 3);
        assert_eq!(s.score().tier(), Tier::High);
    }

    #[test]
    fn new_high_above_the_band_loses_all_three_votes() {
        let s = stats(&[10.0, 10.0, 11.0, 10.0, 14.0]);
        assert!(s.current >= s.max);
        assert!(s.current >= s.mean + s.volatility);
        assert_eq!(s.score().value(), -3);
        assert_eq!(s.score().tier(), Tier::Low);
    }

    #[test]
    fn below_mean_inside_band_without_extreme_is_neutral() {
        // mean 10.4, volatility ~1.02; current 10 is below the mean but inside the band.
        let s = stats(&[9.0, 12.0, 11.0, 10.0, 10.0]);
        assert!(s.current < s.mean && s.current >= s.mean - s.volatility);
        assert!(s.current > s.min && s.current < s.max);
        assert_eq!(s.score().value(), 0);
        assert_eq!(s.score().tier(), Tier::Neutral);
    }

    #[test]
    fn below_band_but_not_a_new_low_scores_two() {
        let s = stats(&[1.0, 20.0, 20.0, 20.0, 20.0, 20.0, 5.0]);
        assert!(s.current < s.mean - s.volatility);
        assert!(s.current > s.min);
        assert_eq!(s.score().value(), 2);
        assert_eq!(s.score().tier(), Tier::High);
    }

    #[test]
    fn single_point_is_both_min_and_max() {
        // current == mean and volatility 0: votes -1, -1, and the minimum check wins (+1).
        let s = stats(&[10.0]);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.score().value(), -1);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(Tier::from(Score(-1)), Tier::Low);
        assert_eq!(Tier::from(Score(0)), Tier::Neutral);
        assert_eq!(Tier::from(Score(1)), Tier::Neutral);
        assert_eq!(Tier::from(Score(2)), Tier::High);
        assert_eq!(Score(2).to_string(), "+2");
        assert_eq!(Score(-3).to_string(), "-3");
    }
}
