use crate::band::{band_for, Band};
use crate::errors::AppError;
use crate::models::LeadFields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Risk buckets: high `>= 60`, medium `[30, 60)`, low `< 30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn of(risk: f64) -> Self {
        if risk >= 60.0 {
            RiskTier::High
        } else if risk >= 30.0 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "high" | "alto" => Ok(RiskTier::High),
            "medium" | "medio" | "médio" => Ok(RiskTier::Medium),
            "low" | "baixo" => Ok(RiskTier::Low),
            other => Err(format!("unknown risk tier '{}'", other)),
        }
    }
}

/// Conversion probability buckets: `>= 80`, `[60, 80)`, `[40, 60)`, `< 40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionTier {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl ConversionTier {
    pub fn of(probability: f64) -> Self {
        if probability >= 80.0 {
            ConversionTier::VeryHigh
        } else if probability >= 60.0 {
            ConversionTier::High
        } else if probability >= 40.0 {
            ConversionTier::Medium
        } else {
            ConversionTier::Low
        }
    }

    fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "very_high" | "very-high" | "muito_alta" => Ok(ConversionTier::VeryHigh),
            "high" | "alta" => Ok(ConversionTier::High),
            "medium" | "media" | "média" => Ok(ConversionTier::Medium),
            "low" | "baixa" => Ok(ConversionTier::Low),
            other => Err(format!("unknown conversion tier '{}'", other)),
        }
    }
}

/// Filter parameters as they arrive on the query string.
///
/// Every field is optional; `"all"` and blank values mean "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub search: Option<String>,
    pub band: Option<String>,
    pub source: Option<String>,
    pub risk: Option<String>,
    pub conversion: Option<String>,
    pub status: Option<String>,
}

/// The predicate set. `None` fields match every record.
///
/// Set predicates are AND-ed. Filtering never reorders or mutates the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    /// Case-insensitive substring on name or company.
    pub search: Option<String>,
    pub band: Option<Band>,
    /// Exact match on the lead's origin.
    pub source: Option<String>,
    pub risk: Option<RiskTier>,
    pub conversion: Option<ConversionTier>,
    /// Case-insensitive exact match on status.
    pub status: Option<String>,
}

/// Trims a query value and maps blank / `all` to `None`.
fn active(value: &Option<String>) -> Option<String> {
    let value = value.as_deref()?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

impl LeadFilter {
    /// Builds a filter from query parameters, rejecting unknown bucket names.
    pub fn from_query(query: &FilterQuery) -> Result<Self, AppError> {
        let band = active(&query.band)
            .map(|b| b.parse::<Band>())
            .transpose()
            .map_err(AppError::BadRequest)?;
        let risk = active(&query.risk)
            .map(|r| RiskTier::parse(&r.to_lowercase()))
            .transpose()
            .map_err(AppError::BadRequest)?;
        let conversion = active(&query.conversion)
            .map(|c| ConversionTier::parse(&c.to_lowercase()))
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(Self {
            search: active(&query.search),
            band,
            source: active(&query.source),
            risk,
            conversion,
            status: active(&query.status),
        })
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == LeadFilter::default()
    }

    /// Evaluates every active predicate against one record.
    pub fn matches<T: LeadFields + ?Sized>(&self, record: &T) -> bool {
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let hit = |field: Option<&str>| {
                field
                    .map(|v| v.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            };
            if !(hit(record.name()) || hit(record.company())) {
                return false;
            }
        }

        if let Some(band) = self.band {
            if band_for(record.band_score()) != band {
                return false;
            }
        }

        if let Some(source) = &self.source {
            if record.source() != Some(source.as_str()) {
                return false;
            }
        }

        if let Some(tier) = self.risk {
            match record.risk_score() {
                Some(risk) if RiskTier::of(risk) == tier => {}
                _ => return false,
            }
        }

        if let Some(tier) = self.conversion {
            match record.conversion_probability() {
                Some(p) if ConversionTier::of(p) == tier => {}
                _ => return false,
            }
        }

        if let Some(status) = &self.status {
            let same = record
                .status()
                .map(|s| s.trim().to_lowercase() == status.trim().to_lowercase())
                .unwrap_or(false);
            if !same {
                return false;
            }
        }

        true
    }

    /// Clones the matching records, keeping their relative order.
    pub fn apply<T: LeadFields + Clone>(&self, records: &[T]) -> Vec<T> {
        records
            .iter()
            .filter(|r| self.matches(*r))
            .cloned()
            .collect()
    }
}

/// Borrows the matching records, keeping their relative order.
pub fn filter<'a, T: LeadFields>(records: &'a [T], predicates: &LeadFilter) -> Vec<&'a T> {
    records.iter().filter(|r| predicates.matches(*r)).collect()
}

/// Distinct sources present in the set, sorted, for filter pickers.
pub fn available_sources<T: LeadFields>(records: &[T]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.source())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
