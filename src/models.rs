use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============ Tenancy ============

/// Identifier of the organization (tenant) every read is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub Uuid);

impl OrgId {
    /// Parses an organization id, tolerating surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(OrgId)
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller's active organization.
///
/// A session without an organization is a regular input state, not an
/// error: it short-circuits to the missing-context view state and no
/// query is ever issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgScope {
    /// An organization is selected.
    Active(OrgId),
    /// No organization is selected.
    Missing,
}

impl OrgScope {
    /// Returns the active organization, if any.
    pub fn org(&self) -> Option<OrgId> {
        match self {
            OrgScope::Active(org) => Some(*org),
            OrgScope::Missing => None,
        }
    }
}

// ============ Score Records ============

/// One lead's score for one scoring run, as computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Opaque record identifier.
    pub id: String,
    /// Owning tenant.
    pub org_id: OrgId,
    /// Reference to the lead this score belongs to.
    pub lead_id: String,
    /// Composite score, always within `0..=100`.
    pub score: u8,
    /// Explanatory sub-scores.
    pub factors: Factors,
    /// When the score was computed upstream.
    pub generated_at: Option<DateTime<Utc>>,
    /// Denormalized display fields of the lead.
    pub lead_summary: Option<LeadSummary>,
    /// Status of the lead, joined in after both lists are loaded.
    pub status: Option<String>,
    /// Acquisition channel of the lead, joined in like `status`.
    pub source: Option<String>,
    /// Risk score of the lead, joined in like `status`.
    pub risk_score: Option<f64>,
    /// Conversion probability of the lead, joined in like `status`.
    pub conversion_probability: Option<f64>,
}

/// The three named sub-scores, each within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Factors {
    /// Demographic fit.
    pub demographic: f64,
    /// Behavioral signals.
    pub behavior: f64,
    /// Engagement level.
    pub engagement: f64,
}

impl Factors {
    /// Arithmetic mean of the three factors.
    pub fn average(&self) -> f64 {
        (self.demographic + self.behavior + self.engagement) / 3.0
    }
}

/// Display fields copied from the lead. Never required for classification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeadSummary {
    /// Contact name.
    pub name: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

impl LeadSummary {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.company.is_none() && self.email.is_none()
    }
}

// ============ Leads ============

/// A lead as owned by the external lead store. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Opaque lead identifier.
    pub id: String,
    /// Owning tenant.
    pub org_id: OrgId,
    /// Contact name.
    pub name: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Free-text pipeline status (e.g. "novo", "qualified").
    pub status: Option<String>,
    /// Legacy 0-100 score; `None` when the store has none.
    pub score: Option<u8>,
    /// Origin of the lead (campaign, channel, ...).
    pub source: Option<String>,
    /// Risk score, finite.
    pub risk_score: f64,
    /// Conversion probability in percent, finite.
    pub conversion_probability: f64,
    /// Creation timestamp, when provided.
    pub created_at: Option<DateTime<Utc>>,
}

// ============ Shared field access ============

/// Read access to the fields the filter, stager and aggregator look at.
///
/// Implemented by both [`Lead`] and [`ScoreRecord`] so the same predicate
/// set and KPIs apply to either view.
pub trait LeadFields {
    fn name(&self) -> Option<&str>;
    fn company(&self) -> Option<&str>;
    fn score(&self) -> Option<u8>;
    fn status(&self) -> Option<&str>;
    fn source(&self) -> Option<&str>;
    fn risk_score(&self) -> Option<f64>;
    fn conversion_probability(&self) -> Option<f64>;

    /// Score used for band placement. An absent score counts as 0.
    fn band_score(&self) -> f64 {
        self.score().map(f64::from).unwrap_or(0.0)
    }
}

impl LeadFields for Lead {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    fn score(&self) -> Option<u8> {
        self.score
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn risk_score(&self) -> Option<f64> {
        Some(self.risk_score)
    }

    fn conversion_probability(&self) -> Option<f64> {
        Some(self.conversion_probability)
    }
}

impl LeadFields for ScoreRecord {
    fn name(&self) -> Option<&str> {
        self.lead_summary.as_ref().and_then(|s| s.name.as_deref())
    }

    fn company(&self) -> Option<&str> {
        self.lead_summary.as_ref().and_then(|s| s.company.as_deref())
    }

    fn score(&self) -> Option<u8> {
        Some(self.score)
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn risk_score(&self) -> Option<f64> {
        self.risk_score
    }

    fn conversion_probability(&self) -> Option<f64> {
        self.conversion_probability
    }
}

impl<T: LeadFields + ?Sized> LeadFields for &T {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn company(&self) -> Option<&str> {
        (**self).company()
    }

    fn score(&self) -> Option<u8> {
        (**self).score()
    }

    fn status(&self) -> Option<&str> {
        (**self).status()
    }

    fn source(&self) -> Option<&str> {
        (**self).source()
    }

    fn risk_score(&self) -> Option<f64> {
        (**self).risk_score()
    }

    fn conversion_probability(&self) -> Option<f64> {
        (**self).conversion_probability()
    }
}
