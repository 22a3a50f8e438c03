use crate::analytics::{aggregate, Kpis};
use crate::band::{classify, Classification};
use crate::filter::{available_sources, filter, LeadFilter};
use crate::loader::Snapshot;
use crate::models::{Lead, LeadFields, ScoreRecord};
use crate::pipeline::{PipelineStage, PipelineStager};
use crate::radar::{radar, RadarCanvas, RadarGeometry};
use serde::Serialize;

// ============ Lead scoring ============

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecordView {
    #[serde(flatten)]
    pub record: ScoreRecord,
    pub classification: Classification,
    pub radar: RadarGeometry,
    /// Radar vertices ready for an SVG `points` attribute.
    pub radar_points: String,
}

/// Lead-scoring view. KPIs describe the whole snapshot, not the filtered rows.
#[derive(Debug, Clone, Serialize)]
pub struct LeadScoringView {
    pub records: Vec<ScoredRecordView>,
    pub kpis: Kpis,
    pub sources: Vec<String>,
    pub filtered_count: usize,
    pub total_loaded: usize,
}

pub fn lead_scoring_view(
    snapshot: &Snapshot,
    predicates: &LeadFilter,
    canvas: RadarCanvas,
) -> LeadScoringView {
    let records: Vec<ScoredRecordView> = filter(&snapshot.records, predicates)
        .into_iter()
        .map(|record| {
            let geometry = radar(&record.factors, canvas);
            ScoredRecordView {
                classification: classify(record.band_score()),
                radar_points: geometry.svg_points(),
                radar: geometry,
                record: record.clone(),
            }
        })
        .collect();

    LeadScoringView {
        filtered_count: records.len(),
        total_loaded: snapshot.records.len(),
        kpis: aggregate(&snapshot.records),
        sources: available_sources(&snapshot.leads),
        records,
    }
}

// ============ Pipeline ============

#[derive(Debug, Clone, Serialize)]
pub struct LeadRow {
    #[serde(flatten)]
    pub lead: Lead,
    pub classification: Classification,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineView {
    pub leads: Vec<LeadRow>,
    pub stages: Vec<PipelineStage<LeadRow>>,
    pub kpis: Kpis,
    pub sources: Vec<String>,
    pub filtered_count: usize,
    pub total_loaded: usize,
}

fn lead_row(lead: &Lead) -> LeadRow {
    LeadRow {
        classification: classify(lead.band_score()),
        lead: lead.clone(),
    }
}

pub fn pipeline_view(
    snapshot: &Snapshot,
    predicates: &LeadFilter,
    stager: &PipelineStager,
) -> PipelineView {
    let filtered: Vec<&Lead> = filter(&snapshot.leads, predicates);

    let stages = stager
        .stage(&filtered)
        .into_iter()
        .map(|stage| PipelineStage {
            id: stage.id,
            display_name: stage.display_name,
            color_token: stage.color_token,
            leads: stage.leads.into_iter().map(lead_row).collect(),
        })
        .collect();

    PipelineView {
        filtered_count: filtered.len(),
        total_loaded: snapshot.leads.len(),
        leads: filtered.into_iter().map(lead_row).collect(),
        stages,
        kpis: aggregate(&snapshot.leads),
        sources: available_sources(&snapshot.leads),
    }
}
