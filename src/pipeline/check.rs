// src/pipeline/check.rs

//! Checkpoint audit.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::models::UnitKey;
use crate::storage::CheckpointStore;

#[derive(Debug, Default)]
pub struct CheckpointAudit {
    /// Units with a readable, non-empty checkpoint.
    pub complete: usize,
    pub missing: Vec<UnitKey>,
    pub unreadable: Vec<(UnitKey, String)>,
    pub empty: Vec<UnitKey>,
    /// Row count -> number of units with that many rows.
    pub histogram: BTreeMap<usize, usize>,
}

impl CheckpointAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unreadable.is_empty() && self.empty.is_empty()
    }
}

impl fmt::Display for CheckpointAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} complete, {} missing, {} unreadable, {} empty",
            self.complete,
            self.missing.len(),
            self.unreadable.len(),
            self.empty.len()
        )?;
        for (rows, units) in &self.histogram {
            writeln!(f, "  {rows:>3} rows: {units} units")?;
        }
        Ok(())
    }
}

/// Load every checkpoint in `units` and classify it.
pub async fn audit_checkpoints(
    checkpoints: &dyn CheckpointStore,
    units: &[UnitKey],
) -> Result<CheckpointAudit> {
    let mut audit = CheckpointAudit::default();

    for unit in units {
        if !checkpoints.exists(unit).await? {
            audit.missing.push(unit.clone());
            continue;
        }
        match checkpoints.load(unit).await {
            Ok(checkpoint) if checkpoint.rows.is_empty() => audit.empty.push(unit.clone()),
            Ok(checkpoint) => {
                audit.complete += 1;
                *audit.histogram.entry(checkpoint.rows.len()).or_default() += 1;
            }
            Err(e) => {
                log::warn!("Checkpoint for {} unreadable: {}", unit, e);
                audit.unreadable.push((unit.clone(), e.to_string()));
            }
        }
    }

    Ok(audit)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Checkpoint, CollectedRow};
    use crate::storage::LocalCheckpointStore;

    fn rows(n: usize) -> Vec<CollectedRow> {
        (0..n)
            .map(|i| CollectedRow {
                home: "MIA".into(),
                away: "BOS".into(),
                home_score: 100,
                away_score: 90 + i as u32,
                win: true,
                date: format!("2016-01-{:02}", i + 1),
                officials: vec!["A. Smith".into()],
            })
            .collect()
    }

    #[tokio::test]
    async fn test_audit_classifies_units() {
        let tmp = TempDir::new().unwrap();
        let store = LocalCheckpointStore::new(tmp.path());
        let units: Vec<UnitKey> = (2013..=2017).map(|p| UnitKey::new("MIA", p)).collect();

        store.save(&Checkpoint::new(units[0].clone(), rows(82))).await.unwrap();
        store.save(&Checkpoint::new(units[1].clone(), rows(82))).await.unwrap();
        store.save(&Checkpoint::new(units[2].clone(), rows(66))).await.unwrap();
        store.save(&Checkpoint::new(units[3].clone(), Vec::new())).await.unwrap();
        tokio::fs::write(tmp.path().join("MIA_2017.json"), b"{ not json")
            .await
            .unwrap();

        let audit = audit_checkpoints(&store, &units).await.unwrap();
        assert_eq!(audit.complete, 3);
        assert_eq!(audit.empty, vec![units[3].clone()]);
        assert_eq!(audit.unreadable.len(), 1);
        assert_eq!(audit.unreadable[0].0, units[4]);
        assert_eq!(audit.histogram.get(&82), Some(&2));
        assert_eq!(audit.histogram.get(&66), Some(&1));
        assert!(!audit.is_clean());
    }

    #[tokio::test]
    async fn test_audit_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let store = LocalCheckpointStore::new(tmp.path());
        let units = vec![UnitKey::new("LAL", 2016)];

        let audit = audit_checkpoints(&store, &units).await.unwrap();
        assert_eq!(audit.missing, units);
        assert_eq!(audit.complete, 0);
    }
}
