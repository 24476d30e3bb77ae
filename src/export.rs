use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::db::{Store, UpsertOutcome};
use crate::model::{canonical_profile_url, ConnectionRecord};

/// Write every stored record as one pretty-printed JSON array.
pub fn export_json(store: &Store, path: &Path) -> Result<usize> {
    let records = store.fetch_all(None)?;
    write_json(&records, path)?;
    info!("Exported {} connections to {}", records.len(), path.display());
    Ok(records.len())
}

pub fn write_json(records: &[ConnectionRecord], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<Vec<ConnectionRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid export file {}", path.display()))
}

/// Merge a previous export back into the store. Timestamps are the store's
/// own; everything else in the file overwrites the stored keys.
pub fn import_json(store: &Store, path: &Path) -> Result<ImportCounts> {
    let mut counts = ImportCounts::default();
    for record in read_json(path)? {
        let url = canonical_profile_url(&record.profile_url);
        if url.is_empty() {
            counts.skipped += 1;
            continue;
        }
        let Value::Object(mut fields) = serde_json::to_value(&record)? else {
            counts.skipped += 1;
            continue;
        };
        for key in ["profile_url", "scraped_date", "last_updated"] {
            fields.remove(key);
        }
        match store.upsert(&url, &fields)? {
            UpsertOutcome::Created => counts.created += 1,
            UpsertOutcome::Updated => counts.updated += 1,
        }
    }
    info!(
        "Imported {} new and {} merged records from {}",
        counts.created,
        counts.updated,
        path.display()
    );
    Ok(counts)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn export_reparses_with_iso_timestamps() {
        let store = Store::open_in_memory().unwrap();
        let url = "https://www.linkedin.com/in/jane-doe";
        store
            .upsert(url, json!({"full_name": "Jane Doe"}).as_object().unwrap())
            .unwrap();
        store
            .upsert(url, json!({"skills": ["Rust", "SQL"]}).as_object().unwrap())
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/linkedin_connections.json");
        assert_eq!(export_json(&store, &path).unwrap(), 1);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &raw[0];
        assert!(first.get("id").is_none());
        let scraped = first["scraped_date"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(scraped).is_ok());
        assert_eq!(first["contact_info"]["social_links"], json!([]));

        let back = read_json(&path).unwrap();
        assert_eq!(back, store.fetch_all(None).unwrap());
        assert_eq!(back[0].skills, vec!["Rust", "SQL"]);
    }

    fn has_null(v: &Value) -> bool {
        match v {
            Value::Null => true,
            Value::Array(items) => items.iter().any(has_null),
            Value::Object(map) => map.values().any(has_null),
            _ => false,
        }
    }

    #[test]
    fn single_write_exports_no_nulls() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert(
                "https://www.linkedin.com/in/sam-lee",
                json!({"full_name": "Sam Lee"}).as_object().unwrap(),
            )
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("once.json");
        export_json(&store, &path).unwrap();
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!has_null(&raw));
        assert!(raw[0].get("last_updated").is_none());
        assert!(raw[0]["scraped_date"].is_string());
        assert!(read_json(&path).unwrap()[0].last_updated.is_none());
    }

    #[test]
    fn import_merges_into_existing_store() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup.json");
        std::fs::write(
            &path,
            r#"[
              {"profile_url": "https://www.linkedin.com/in/ada-park/?trk=x", "full_name": "Ada Park",
               "skills": ["Go"], "scraped_date": "2020-01-01T00:00:00Z"},
              {"profile_url": "https://www.linkedin.com/in/new-person", "headline": "CTO"},
              {"profile_url": "  ", "full_name": "nobody"}
            ]"#,
        )
        .unwrap();

        let store = Store::open_in_memory().unwrap();
        store
            .upsert(
                "https://www.linkedin.com/in/ada-park",
                json!({"full_name": "Ada", "session_id": "s1"}).as_object().unwrap(),
            )
            .unwrap();

        let counts = import_json(&store, &path).unwrap();
        assert_eq!(counts, ImportCounts { created: 1, updated: 1, skipped: 1 });

        let ada = store.get("https://www.linkedin.com/in/ada-park").unwrap().unwrap();
        assert_eq!(ada.full_name, "Ada Park");
        assert_eq!(ada.skills, vec!["Go"]);
        assert_ne!(ada.scraped_date.unwrap().to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(store.fetch_all(None).unwrap().len(), 2);
    }
}
