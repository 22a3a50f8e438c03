use crate::band::{band_for, Band};
use crate::models::LeadFields;
use serde::Serialize;

/// Score a record without a score contributes to the health average.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Statuses counted as converted by the conversion proxy.
pub const QUALIFIED_STATUSES: [&str; 2] = ["qualified", "qualificado"];

/// Record count per band, plus a chart normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BandDistribution {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub ice: usize,
    /// `max(1, largest count)`, safe to divide by.
    pub max: usize,
}

impl BandDistribution {
    pub fn get(&self, band: Band) -> usize {
        match band {
            Band::Hot => self.hot,
            Band::Warm => self.warm,
            Band::Cold => self.cold,
            Band::Ice => self.ice,
        }
    }

    /// Sum over all four bands.
    pub fn total(&self) -> usize {
        self.hot + self.warm + self.cold + self.ice
    }

    /// Bar height of a band relative to the largest bar, in `[0, 1]`.
    pub fn share_of_max(&self, band: Band) -> f64 {
        self.get(band) as f64 / self.max as f64
    }

    fn add(&mut self, band: Band) {
        match band {
            Band::Hot => self.hot += 1,
            Band::Warm => self.warm += 1,
            Band::Cold => self.cold += 1,
            Band::Ice => self.ice += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total: usize,
    pub hot: usize,
    pub warm: usize,
    /// Rounded mean score.
    pub health_score: u8,
    /// Qualified-status count over total, in percent with one decimal.
    /// An approximation, not a real CRM conversion metric.
    pub conversion_rate_proxy: f64,
    pub distribution: BandDistribution,
}

/// True when the status counts as qualified for the conversion proxy.
pub fn is_qualified(status: Option<&str>) -> bool {
    status
        .map(|s| {
            let s = s.trim().to_lowercase();
            QUALIFIED_STATUSES.contains(&s.as_str())
        })
        .unwrap_or(false)
}

/// Computes KPIs and band distribution in one pass over `records`.
///
/// Callers pass the full loaded set, never the filtered subset.
pub fn aggregate<T: LeadFields>(records: &[T]) -> Kpis {
    let mut distribution = BandDistribution::default();
    let mut score_sum = 0.0;
    let mut qualified = 0usize;

    for record in records {
        distribution.add(band_for(record.band_score()));
        score_sum += record.score().map(f64::from).unwrap_or(NEUTRAL_SCORE);
        if is_qualified(record.status()) {
            qualified += 1;
        }
    }

    let total = records.len();
    distribution.max = [
        distribution.hot,
        distribution.warm,
        distribution.cold,
        distribution.ice,
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
    .max(1);

    let (health_score, conversion_rate_proxy) = if total == 0 {
        (0, 0.0)
    } else {
        let mean = score_sum / total as f64;
        let rate = qualified as f64 / total as f64;
        (
            mean.round().clamp(0.0, 100.0) as u8,
            (rate * 1000.0).round() / 10.0,
        )
    };

    Kpis {
        total,
        hot: distribution.hot,
        warm: distribution.warm,
        health_score,
        conversion_rate_proxy,
        distribution,
    }
}
