use crate::models::LeadFields;
use serde::Serialize;
use std::collections::HashMap;

/// One catalog entry: a raw status identifier and the stage it renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDefinition {
    /// Lower-case raw status identifier.
    pub id: &'static str,
    pub display_name: &'static str,
    pub color_token: &'static str,
}

const fn stage(
    id: &'static str,
    display_name: &'static str,
    color_token: &'static str,
) -> StageDefinition {
    StageDefinition {
        id,
        display_name,
        color_token,
    }
}

/// Catalog in funnel order. Aliases of a stage are kept adjacent.
pub const STAGE_CATALOG: &[StageDefinition] = &[
    stage("novo", "Novo", "slate"),
    stage("new", "Novo", "slate"),
    stage("contatado", "Contatado", "blue"),
    stage("contacted", "Contatado", "blue"),
    stage("qualified", "Qualificado", "purple"),
    stage("qualificado", "Qualificado", "purple"),
    stage("proposta", "Proposta", "amber"),
    stage("proposal", "Proposta", "amber"),
    stage("negociacao", "Negociação", "orange"),
    stage("negociação", "Negociação", "orange"),
    stage("negotiation", "Negociação", "orange"),
    stage("ganho", "Ganho", "green"),
    stage("won", "Ganho", "green"),
];

/// A visible pipeline column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStage<T> {
    /// Identifier of the catalog entry that survived deduplication.
    pub id: String,
    pub display_name: String,
    pub color_token: String,
    pub leads: Vec<T>,
}

/// Buckets leads into catalog stages.
///
/// Several raw identifiers may alias to one display stage ("qualified" and
/// "qualificado" both show as "Qualificado"). After bucketing, a single
/// stage per display name survives.
#[derive(Debug, Clone)]
pub struct PipelineStager {
    catalog: &'static [StageDefinition],
    index: HashMap<&'static str, usize>,
}

impl Default for PipelineStager {
    fn default() -> Self {
        Self::new(STAGE_CATALOG)
    }
}

impl PipelineStager {
    /// Builds the identifier lookup once. On duplicate identifiers the first
    /// catalog entry wins.
    pub fn new(catalog: &'static [StageDefinition]) -> Self {
        let mut index = HashMap::with_capacity(catalog.len());
        for (i, def) in catalog.iter().enumerate() {
            index.entry(def.id).or_insert(i);
        }
        Self { catalog, index }
    }

    /// Catalog position for a raw status, if it is a known identifier.
    pub fn lookup(&self, status: &str) -> Option<usize> {
        self.index.get(status.trim().to_lowercase().as_str()).copied()
    }

    /// Buckets `records` into the ordered, deduplicated stage list.
    ///
    /// Records with no status or an unknown status are left out. For each
    /// display name the first non-empty catalog entry survives (or the first
    /// entry when all are empty); leads bucketed under its aliases are merged
    /// into it, in input order.
    pub fn stage<T: LeadFields + Clone>(&self, records: &[T]) -> Vec<PipelineStage<T>> {
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); self.catalog.len()];
        let mut unmatched = 0usize;
        for (pos, record) in records.iter().enumerate() {
            match record.status().and_then(|s| self.lookup(s)) {
                Some(entry) => buckets[entry].push(pos),
                None => unmatched += 1,
            }
        }
        if unmatched > 0 {
            tracing::debug!("{} lead(s) have no known pipeline status", unmatched);
        }

        // display name -> catalog entries sharing it, in catalog order
        let mut groups: Vec<(&'static str, Vec<usize>)> = Vec::new();
        for (i, def) in self.catalog.iter().enumerate() {
            match groups.iter_mut().find(|(name, _)| *name == def.display_name) {
                Some((_, members)) => members.push(i),
                None => groups.push((def.display_name, vec![i])),
            }
        }

        let mut stages: Vec<(usize, PipelineStage<T>)> = groups
            .into_iter()
            .map(|(_, members)| {
                let survivor = members
                    .iter()
                    .copied()
                    .find(|&m| !buckets[m].is_empty())
                    .unwrap_or(members[0]);

                let mut positions: Vec<usize> = members
                    .iter()
                    .flat_map(|&m| buckets[m].iter().copied())
                    .collect();
                positions.sort_unstable();

                let def = self.catalog[survivor];
                let stage = PipelineStage {
                    id: def.id.to_string(),
                    display_name: def.display_name.to_string(),
                    color_token: def.color_token.to_string(),
                    leads: positions.iter().map(|&p| records[p].clone()).collect(),
                };
                (survivor, stage)
            })
            .collect();

        stages.sort_by_key(|(survivor, _)| *survivor);
        stages.into_iter().map(|(_, stage)| stage).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lead, OrgId};
    use uuid::Uuid;

    fn lead(id: &str, status: Option<&str>) -> Lead {
        Lead {
            id: id.to_string(),
            org_id: OrgId(Uuid::nil()),
            name: None,
            company: None,
            email: None,
            status: status.map(str::to_string),
            score: None,
            source: None,
            risk_score: 0.0,
            conversion_probability: 0.0,
            created_at: None,
        }
    }

    fn names<T>(stages: &[PipelineStage<T>]) -> Vec<&str> {
        stages.iter().map(|s| s.display_name.as_str()).collect()
    }

    #[test]
    fn test_empty_input_yields_one_stage_per_display_name() {
        let stages = PipelineStager::default().stage::<Lead>(&[]);
        assert_eq!(
            names(&stages),
            vec!["Novo", "Contatado", "Qualificado", "Proposta", "Negociação", "Ganho"]
        );
        assert!(stages.iter().all(|s| s.leads.is_empty()));
        assert_eq!(stages[2].id, "qualified");
    }

    #[test]
    fn test_aliases_collapse_into_one_stage() {
        let leads = vec![
            lead("1", Some("qualificado")),
            lead("2", Some("Qualified")),
            lead("3", Some("QUALIFICADO")),
        ];
        let stages = PipelineStager::default().stage(&leads);
        let qualified: Vec<_> = stages
            .iter()
            .filter(|s| s.display_name == "Qualificado")
            .collect();
        assert_eq!(qualified.len(), 1);
        let ids: Vec<&str> = qualified[0].leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(qualified[0].id, "qualified");
    }

    #[test]
    fn test_first_non_empty_alias_survives() {
        let leads = vec![lead("1", Some("qualificado"))];
        let stages = PipelineStager::default().stage(&leads);
        let qualified = stages
            .iter()
            .find(|s| s.display_name == "Qualificado")
            .unwrap();
        assert_eq!(qualified.id, "qualificado");
        assert_eq!(qualified.leads.len(), 1);
    }

    #[test]
    fn test_unknown_status_is_omitted() {
        let leads = vec![
            lead("1", Some("perdido")),
            lead("2", None),
            lead("3", Some(" novo ")),
        ];
        let stages = PipelineStager::default().stage(&leads);
        let total: usize = stages.iter().map(|s| s.leads.len()).sum();
        assert_eq!(total, 1);
        assert_eq!(stages[0].leads[0].id, "3");
        assert_eq!(stages.len(), 6);
    }

    #[test]
    fn test_stage_order_follows_catalog_and_leads_follow_input() {
        let leads = vec![
            lead("a", Some("won")),
            lead("b", Some("new")),
            lead("c", Some("ganho")),
            lead("d", Some("novo")),
        ];
        let stages = PipelineStager::default().stage(&leads);
        assert_eq!(stages[0].display_name, "Novo");
        let novo: Vec<&str> = stages[0].leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(novo, vec!["b", "d"]);
        let ganho = stages.last().unwrap();
        assert_eq!(ganho.display_name, "Ganho");
        let won: Vec<&str> = ganho.leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(won, vec!["a", "c"]);
    }

    #[test]
    fn test_custom_catalog_duplicate_identifier_first_wins() {
        static CATALOG: &[StageDefinition] = &[
            stage("open", "Aberto", "slate"),
            stage("open", "Outro", "red"),
        ];
        let stager = PipelineStager::new(CATALOG);
        assert_eq!(stager.lookup("OPEN"), Some(0));
        let stages = stager.stage(&[lead("1", Some("open"))]);
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].leads.len(), 1);
        assert!(stages[1].leads.is_empty());
    }
}
