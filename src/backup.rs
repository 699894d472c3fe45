//! Whole-state export and restore.
//!
//! An export carries every collection plus settings under its own key. A
//! restore replaces only the collections whose key is present, and only
//! after the whole document has parsed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::academy::Academy;
use crate::error::{AcademyError, Result};
use crate::models::{
    AcademySettings, AppState, CashTransaction, Collection, MatchSquad, Payment, Student, Teacher,
    User,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Student>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Vec<Teacher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_flow: Option<Vec<CashTransaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchSquad>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AcademySettings>,
}

impl ExportDocument {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            students: Some(state.students.clone()),
            teachers: Some(state.teachers.clone()),
            payments: Some(state.payments.clone()),
            cash_flow: Some(state.cash_flow.clone()),
            matches: Some(state.matches.clone()),
            users: Some(state.users.clone()),
            settings: Some(state.settings.clone()),
        }
    }

    /// Parse without touching any state.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| AcademyError::Import(e.to_string()))?;
        if !value.is_object() {
            return Err(AcademyError::Import("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| AcademyError::Import(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Replace the collections present in `doc`; returns which ones.
pub async fn apply(academy: &mut Academy, doc: ExportDocument) -> Result<Vec<Collection>> {
    let mut applied = Vec::new();
    if let Some(rows) = doc.students {
        academy.replace(rows).await?;
        applied.push(Collection::Students);
    }
    if let Some(rows) = doc.teachers {
        academy.replace(rows).await?;
        applied.push(Collection::Teachers);
    }
    if let Some(rows) = doc.payments {
        academy.replace(rows).await?;
        applied.push(Collection::Payments);
    }
    if let Some(rows) = doc.cash_flow {
        academy.replace(rows).await?;
        applied.push(Collection::CashFlow);
    }
    if let Some(rows) = doc.matches {
        academy.replace(rows).await?;
        applied.push(Collection::Matches);
    }
    if let Some(rows) = doc.users {
        academy.replace(rows).await?;
        applied.push(Collection::Users);
    }
    if let Some(settings) = doc.settings {
        academy.update_settings(settings).await?;
        applied.push(Collection::Settings);
    }
    info!(collections = applied.len(), "Imported backup");
    Ok(applied)
}

pub fn default_export_path(data_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    data_dir.join("backups").join(format!("academy-{stamp}.json"))
}

pub fn export_to(academy: &Academy, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = ExportDocument::from_state(academy.state()).to_json()?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(std::fs::metadata(path)?.len())
}

pub async fn import_from(academy: &mut Academy, path: &Path) -> Result<Vec<Collection>> {
    let text = std::fs::read_to_string(path)?;
    let doc = ExportDocument::parse(&text)?;
    apply(academy, doc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LocalStore, SqliteStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn test_academy() -> (tempfile::TempDir, Arc<SqliteStore>, Academy) {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(SqliteStore::open(&dir.path().join("test.db")).unwrap());
        let academy = Academy::new(Arc::clone(&local) as Arc<dyn LocalStore>, None);
        (dir, local, academy)
    }

    fn student(name: &str) -> Student {
        Student::new(name, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "Sub-10")
    }

    async fn seeded() -> (tempfile::TempDir, Arc<SqliteStore>, Academy) {
        let (dir, local, mut academy) = test_academy();
        academy.save(student("Ana")).await.unwrap();
        academy
            .save(Teacher {
                id: "t1".to_string(),
                name: "Marta".to_string(),
                specialty: None,
                salary: 400.0,
                phone: None,
            })
            .await
            .unwrap();
        academy.record_fee("Ana", 0, 2024, Some(30.0), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), "admin")
            .await
            .unwrap();
        (dir, local, academy)
    }

    #[tokio::test]
    async fn test_partial_import_leaves_other_collections() {
        let (_dir, local, mut academy) = seeded().await;
        let doc = ExportDocument::parse(&format!(
            r#"{{"students": [{}]}}"#,
            serde_json::to_string(&student("Beto")).unwrap()
        ))
        .unwrap();
        let applied = apply(&mut academy, doc).await.unwrap();

        assert_eq!(applied, vec![Collection::Students]);
        assert_eq!(academy.state().students.len(), 1);
        assert_eq!(academy.state().students[0].name, "Beto");
        assert_eq!(academy.state().teachers.len(), 1);
        assert_eq!(academy.state().payments.len(), 1);
        assert_eq!(academy.state().cash_flow.len(), 1);
        assert_eq!(local.get_all("students").unwrap()[0]["name"], "Beto");
    }

    #[tokio::test]
    async fn test_malformed_import_changes_nothing() {
        let (_dir, _local, academy) = seeded().await;
        let before = academy.state().clone();
        assert!(matches!(
            ExportDocument::parse(r#"{"students": [{"id": 1}]}"#),
            Err(AcademyError::Import(_))
        ));
        assert!(matches!(ExportDocument::parse("not json"), Err(AcademyError::Import(_))));
        assert!(matches!(ExportDocument::parse("[]"), Err(AcademyError::Import(_))));
        assert_eq!(academy.state(), &before);
    }

    #[tokio::test]
    async fn test_export_then_restore_into_empty_academy() {
        let (dir, _local, academy) = seeded().await;
        let path = dir.path().join("backup.json");
        let size = export_to(&academy, &path).unwrap();
        assert!(size > 0);

        let (_dir2, _local2, mut fresh) = test_academy();
        let applied = import_from(&mut fresh, &path).await.unwrap();
        assert_eq!(applied.len(), Collection::COUNT);
        assert_eq!(fresh.state(), academy.state());
    }

    #[test]
    fn test_export_uses_camel_case_keys() {
        let json = ExportDocument::from_state(&AppState::default()).to_json().unwrap();
        assert!(json.contains("\"cashFlow\""));
        assert!(json.contains("\"settings\""));
    }

    #[test]
    fn test_default_export_path() {
        let path = default_export_path(Path::new("/data"));
        assert!(path.starts_with("/data/backups"));
        assert_eq!(path.extension().unwrap(), "json");
    }
}
