use crate::models::{Factors, Lead, LeadSummary, OrgId, ScoreRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Looks up the first present, non-null field among `names`.
fn field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| raw.get(name))
        .find(|v| !v.is_null())
}

/// Coerces a JSON value into a finite number.
///
/// Accepts numbers and numeric strings (with `,` as decimal separator too).
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Rounds and clamps a score into `0..=100`.
pub fn score_from(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn factor(raw: Option<&Value>, names: &[&str]) -> f64 {
    raw.and_then(|f| coerce_number(field(f, names)))
        .map(|v| v.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// Non-empty trimmed text. Numbers are rendered as text.
fn text(raw: &Value, names: &[&str]) -> Option<String> {
    match field(raw, names)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses the timestamp formats the store is known to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f %z")
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
}

fn timestamp(raw: &Value, names: &[&str]) -> Option<DateTime<Utc>> {
    let value = text(raw, names)?;
    let parsed = parse_timestamp(&value);
    if parsed.is_none() {
        tracing::debug!("Ignoring unparsable timestamp '{}'", value);
    }
    parsed
}

/// Checks the row's tenant against the organization that was queried.
///
/// A row without an `org_id` is trusted to the scope of the query that
/// returned it; a row carrying a different or unparsable `org_id` is dropped.
fn owned_by(raw: &Value, expected: OrgId, kind: &str) -> bool {
    match field(raw, &["org_id", "orgId"]) {
        None => true,
        Some(value) => {
            let parsed = value.as_str().and_then(OrgId::parse);
            if parsed == Some(expected) {
                true
            } else {
                tracing::warn!(
                    "Dropping {} row owned by {:?} while loading org {}",
                    kind,
                    value,
                    expected
                );
                false
            }
        }
    }
}

fn lead_summary(raw: &Value) -> Option<LeadSummary> {
    let nested = field(raw, &["lead_summary", "leadSummary", "lead", "leads"]).and_then(|v| {
        // PostgREST embeds to-one relations as objects but some views emit arrays
        match v {
            Value::Array(items) => items.first(),
            other => Some(other),
        }
    });

    let summary = match nested {
        Some(obj) if obj.is_object() => LeadSummary {
            name: text(obj, &["name", "nome"]),
            company: text(obj, &["company", "empresa"]),
            email: text(obj, &["email"]),
        },
        _ => LeadSummary {
            name: text(raw, &["lead_name", "leadName"]),
            company: text(raw, &["lead_company", "leadCompany"]),
            email: text(raw, &["lead_email", "leadEmail"]),
        },
    };

    (!summary.is_empty()).then_some(summary)
}

/// Normalizes one raw score row.
///
/// Returns `None` only when the row belongs to another organization.
pub fn normalize_score_record(raw: &Value, expected_org: OrgId) -> Option<ScoreRecord> {
    if !owned_by(raw, expected_org, "score") {
        return None;
    }

    let score = coerce_number(field(raw, &["score", "total_score", "totalScore"]));
    if score.is_none() {
        tracing::debug!("Score row without numeric score, defaulting to 0");
    }

    let factors_raw = field(raw, &["factors"]);
    let factors = Factors {
        demographic: factor(factors_raw, &["demographic", "demografico"]),
        behavior: factor(factors_raw, &["behavior", "behavioral", "comportamento"]),
        engagement: factor(factors_raw, &["engagement", "engajamento"]),
    };

    Some(ScoreRecord {
        id: text(raw, &["id"]).unwrap_or_default(),
        org_id: expected_org,
        lead_id: text(raw, &["lead_id", "leadId"]).unwrap_or_default(),
        score: score.map(score_from).unwrap_or(0),
        factors,
        generated_at: timestamp(raw, &["generated_at", "generatedAt", "created_at"]),
        lead_summary: lead_summary(raw),
        status: text(raw, &["status"]),
        source: text(raw, &["source", "origem"]),
        risk_score: coerce_number(field(raw, &["risk_score", "riskScore"])),
        conversion_probability: coerce_number(field(
            raw,
            &["conversion_probability", "conversionProbability"],
        )),
    })
}

/// Normalizes one raw lead row.
///
/// Returns `None` only when the row belongs to another organization.
pub fn normalize_lead(raw: &Value, expected_org: OrgId) -> Option<Lead> {
    if !owned_by(raw, expected_org, "lead") {
        return None;
    }

    Some(Lead {
        id: text(raw, &["id"]).unwrap_or_default(),
        org_id: expected_org,
        name: text(raw, &["name", "nome"]),
        company: text(raw, &["company", "empresa"]),
        email: text(raw, &["email"]),
        status: text(raw, &["status"]),
        score: coerce_number(field(raw, &["score"])).map(score_from),
        source: text(raw, &["source", "origem"]),
        risk_score: coerce_number(field(raw, &["risk_score", "riskScore"])).unwrap_or(0.0),
        conversion_probability: coerce_number(field(
            raw,
            &["conversion_probability", "conversionProbability"],
        ))
        .unwrap_or(0.0),
        created_at: timestamp(raw, &["created_at", "createdAt"]),
    })
}

/// Fills each score record's lead-level fields (status, source, risk,
/// conversion and a missing summary) from its lead.
pub fn attach_leads(records: &mut [ScoreRecord], leads: &[Lead]) {
    let by_id: HashMap<&str, &Lead> = leads.iter().map(|l| (l.id.as_str(), l)).collect();

    for record in records.iter_mut() {
        let Some(lead) = by_id.get(record.lead_id.as_str()) else {
            continue;
        };
        if record.status.is_none() {
            record.status = lead.status.clone();
        }
        if record.source.is_none() {
            record.source = lead.source.clone();
        }
        record.risk_score.get_or_insert(lead.risk_score);
        record
            .conversion_probability
            .get_or_insert(lead.conversion_probability);
        if record.lead_summary.is_none() {
            let summary = LeadSummary {
                name: lead.name.clone(),
                company: lead.company.clone(),
                email: lead.email.clone(),
            };
            record.lead_summary = (!summary.is_empty()).then_some(summary);
        }
    }
}

/// Normalizes a full fetch for one organization.
///
/// Everything downstream only sees the shapes built here. The only rows
/// rejected are rows that belong to another organization.
pub fn normalize_snapshot(
    raw_scores: &[Value],
    raw_leads: &[Value],
    org: OrgId,
) -> (Vec<ScoreRecord>, Vec<Lead>) {
    let leads: Vec<Lead> = raw_leads
        .iter()
        .filter_map(|raw| normalize_lead(raw, org))
        .collect();
    let mut records: Vec<ScoreRecord> = raw_scores
        .iter()
        .filter_map(|raw| normalize_score_record(raw, org))
        .collect();
    attach_leads(&mut records, &leads);

    let dropped = (raw_scores.len() - records.len()) + (raw_leads.len() - leads.len());
    if dropped > 0 {
        tracing::warn!("Dropped {} foreign row(s) while loading org {}", dropped, org);
    }

    (records, leads)
}
