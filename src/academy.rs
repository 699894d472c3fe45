//! The academy session: owns the in-memory collections and routes every
//! mutation through the sync coordinator.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::db::{LocalStore, SqliteStore};
use crate::error::{AcademyError, Result};
use crate::ledger::{self, fee_description, StudentDebt};
use crate::models::{
    new_id, AcademySettings, AppState, CashTransaction, Collection, Direction, Listed, Payment,
    PaymentKind, Record, Student, Teacher, SETTINGS_ID,
};
use crate::remote::{RemoteStore, RestRemote};
use crate::settings::Settings;
use crate::sync::{RemoteMirror, SyncCoordinator, SyncOutcome};

pub struct Academy {
    state: AppState,
    sync: SyncCoordinator,
    pending: Vec<JoinHandle<()>>,
}

impl Academy {
    /// Build a session over the given stores and load the local state.
    pub fn new(local: Arc<dyn LocalStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        let sync = SyncCoordinator::new(local, remote);
        let state = sync.load();
        Self {
            state,
            sync,
            pending: Vec::new(),
        }
    }

    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = settings.db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let local: Arc<dyn LocalStore> = Arc::new(SqliteStore::open(&db_path)?);
        let remote = RestRemote::from_settings(settings)?
            .map(|r| Arc::new(r) as Arc<dyn RemoteStore>);
        Ok(Self::new(local, remote))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    fn track(&mut self, outcome: SyncOutcome) {
        if !outcome.persisted {
            warn!("Mutation arrived before the initial load; not persisted");
        }
        if let RemoteMirror::Spawned(handle) = outcome.remote {
            self.pending.push(handle);
        }
    }

    /// Wait for background mirror passes started by this session.
    pub async fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Remote mirror task aborted");
            }
        }
    }

    async fn persist<R: Listed>(&mut self) -> Result<()> {
        let outcome = self.sync.persist_and_sync(R::list(&self.state)).await?;
        self.track(outcome);
        Ok(())
    }

    /// Append a new record, or replace the one with the same id.
    pub async fn save<R: Listed>(&mut self, record: R) -> Result<()> {
        let list = R::list_mut(&mut self.state);
        match list.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => list.push(record),
        }
        self.persist::<R>().await
    }

    pub async fn remove<R: Listed>(&mut self, id: &str) -> Result<()> {
        let list = R::list_mut(&mut self.state);
        let before = list.len();
        list.retain(|r| r.id() != id);
        if list.len() == before {
            return Err(AcademyError::UnknownRecord {
                collection: R::COLLECTION.store_name(),
                id: id.to_string(),
            });
        }
        self.persist::<R>().await
    }

    /// Replace a whole collection at once.
    pub async fn replace<R: Listed>(&mut self, rows: Vec<R>) -> Result<()> {
        *R::list_mut(&mut self.state) = rows;
        self.persist::<R>().await
    }

    /// Store the settings singleton under its sentinel id, whatever id it
    /// arrived with.
    pub async fn update_settings(&mut self, mut settings: AcademySettings) -> Result<()> {
        settings.id = SETTINGS_ID.to_string();
        self.state.settings = settings;
        let outcome = self.sync.persist_settings(&self.state.settings).await?;
        self.track(outcome);
        Ok(())
    }

    /// Look a student up by id, or by case-insensitive name.
    pub fn find_student(&self, key: &str) -> Result<&Student> {
        self.state
            .students
            .iter()
            .find(|s| s.id == key)
            .or_else(|| {
                self.state
                    .students
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| AcademyError::UnknownStudent(key.to_string()))
    }

    pub fn find_teacher(&self, key: &str) -> Result<&Teacher> {
        self.state
            .teachers
            .iter()
            .find(|t| t.id == key || t.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| AcademyError::UnknownRecord {
                collection: Collection::Teachers.store_name(),
                id: key.to_string(),
            })
    }

    /// A payment and its cash entry. The payment's mirror pass holds the
    /// busy flag, so it is settled before the cash entry is saved.
    async fn save_pair(&mut self, payment: Payment, cash: CashTransaction) -> Result<()> {
        self.save(payment).await?;
        self.flush().await;
        self.save(cash).await
    }

    /// Record a monthly fee and the matching cash income. The amount
    /// defaults to the student's fee, then to the academy default.
    pub async fn record_fee(
        &mut self,
        student_key: &str,
        month_index: u32,
        year: i32,
        amount: Option<f64>,
        date: NaiveDate,
        recorded_by: &str,
    ) -> Result<Payment> {
        if month_index > 11 {
            return Err(AcademyError::Other(format!("month out of range: {}", month_index + 1)));
        }
        let student = self.find_student(student_key)?;
        let amount = amount.unwrap_or(if student.monthly_fee > 0.0 {
            student.monthly_fee
        } else {
            self.state.settings.default_monthly_fee
        });
        let description = fee_description(month_index, year);
        let payment = Payment {
            id: new_id(),
            date,
            amount,
            kind: PaymentKind::StudentFee,
            target_id: Some(student.id.clone()),
            description: description.clone(),
        };
        let cash = CashTransaction {
            id: new_id(),
            date,
            direction: Direction::Income,
            amount,
            description: format!("{description} ({})", student.name),
            recorded_by: recorded_by.to_string(),
        };
        info!(student = %student.name, month = month_index + 1, year, "Recorded monthly fee");
        self.save_pair(payment.clone(), cash).await?;
        Ok(payment)
    }

    /// Pay a teacher: a payroll payment plus the matching cash outcome.
    pub async fn pay_teacher(
        &mut self,
        teacher_key: &str,
        amount: Option<f64>,
        date: NaiveDate,
        recorded_by: &str,
    ) -> Result<Payment> {
        let teacher = self.find_teacher(teacher_key)?;
        let amount = amount.unwrap_or(teacher.salary);
        let description = format!("Sueldo - {}", teacher.name);
        let payment = Payment {
            id: new_id(),
            date,
            amount,
            kind: PaymentKind::TeacherPayroll,
            target_id: Some(teacher.id.clone()),
            description: description.clone(),
        };
        let cash = CashTransaction {
            id: new_id(),
            date,
            direction: Direction::Outcome,
            amount,
            description,
            recorded_by: recorded_by.to_string(),
        };
        self.save_pair(payment.clone(), cash).await?;
        Ok(payment)
    }

    pub async fn record_cash(
        &mut self,
        direction: Direction,
        amount: f64,
        description: &str,
        date: NaiveDate,
        recorded_by: &str,
    ) -> Result<CashTransaction> {
        let entry = CashTransaction {
            id: new_id(),
            date,
            direction,
            amount,
            description: description.to_string(),
            recorded_by: recorded_by.to_string(),
        };
        self.save(entry.clone()).await?;
        Ok(entry)
    }

    /// Cash on hand: income minus outcome.
    pub fn cash_balance(&self) -> f64 {
        self.state.cash_flow.iter().map(|c| c.signed_amount()).sum()
    }

    pub fn debts(&self, category: Option<&str>, year: i32, today: NaiveDate) -> Vec<StudentDebt> {
        ledger::category_report(&self.state.students, category, year, &self.state.payments, today)
    }

    /// Recompute the cached `paid_up` flag of every student. Returns how
    /// many students owe at least one month.
    pub async fn refresh_paid_up(&mut self, year: i32, today: NaiveDate) -> Result<usize> {
        let mut changed = false;
        let mut owing = 0;
        for student in self.state.students.iter_mut() {
            let statuses = ledger::monthly_status(Some(&*student), year, &self.state.payments, today);
            let paid_up = ledger::months_owed(&statuses) == 0;
            if !paid_up {
                owing += 1;
            }
            if student.paid_up != paid_up {
                student.paid_up = paid_up;
                changed = true;
            }
        }
        if changed {
            self.persist::<Student>().await?;
        }
        Ok(owing)
    }

    pub async fn download_all(&mut self) -> Result<Vec<(Collection, usize)>> {
        self.sync.download_all(&mut self.state).await
    }

    pub async fn upload_all(&self) -> Result<Vec<(Collection, usize)>> {
        self.sync.upload_all(&self.state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MemoryRemote;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_academy(remote: Option<Arc<MemoryRemote>>) -> (tempfile::TempDir, Arc<SqliteStore>, Academy) {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(SqliteStore::open(&dir.path().join("test.db")).unwrap());
        let academy = Academy::new(
            Arc::clone(&local) as Arc<dyn LocalStore>,
            remote.map(|r| r as Arc<dyn RemoteStore>),
        );
        (dir, local, academy)
    }

    fn student(name: &str, enrolled: NaiveDate) -> Student {
        let mut s = Student::new(name, enrolled, "Sub-10");
        s.monthly_fee = 30.0;
        s
    }

    #[tokio::test]
    async fn test_save_appends_then_replaces() {
        let (_dir, local, mut academy) = test_academy(None);
        let mut s = student("Ana", date(2024, 1, 1));
        academy.save(s.clone()).await.unwrap();
        s.category = "Sub-12".to_string();
        academy.save(s.clone()).await.unwrap();
        assert_eq!(academy.state().students.len(), 1);
        assert_eq!(academy.state().students[0].category, "Sub-12");
        let stored = local.get_all("students").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["category"], "Sub-12");
    }

    #[tokio::test]
    async fn test_remove_filters_by_id() {
        let (_dir, local, mut academy) = test_academy(None);
        let a = student("Ana", date(2024, 1, 1));
        let b = student("Beto", date(2024, 1, 1));
        academy.save(a.clone()).await.unwrap();
        academy.save(b.clone()).await.unwrap();
        academy.remove::<Student>(&a.id).await.unwrap();
        assert_eq!(academy.state().students, vec![b]);
        assert_eq!(local.get_all("students").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_id() {
        let (_dir, _local, mut academy) = test_academy(None);
        let err = academy.remove::<Teacher>("nope").await.unwrap_err();
        assert!(matches!(err, AcademyError::UnknownRecord { .. }));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let local = Arc::new(SqliteStore::open(&path).unwrap());
            let mut academy = Academy::new(local, None);
            academy.save(student("Ana", date(2024, 1, 1))).await.unwrap();
        }
        let local = Arc::new(SqliteStore::open(&path).unwrap());
        let academy = Academy::new(local, None);
        assert_eq!(academy.state().students[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_record_fee_marks_month_paid() {
        let (_dir, _local, mut academy) = test_academy(None);
        academy.save(student("Ana", date(2024, 2, 1))).await.unwrap();
        let payment = academy
            .record_fee("ana", 1, 2024, None, date(2024, 2, 5), "admin")
            .await
            .unwrap();
        assert_eq!(payment.amount, 30.0);
        assert_eq!(payment.description, "Mensualidad - febrero de 2024");
        assert_eq!(academy.cash_balance(), 30.0);

        let debts = academy.debts(None, 2024, date(2024, 4, 15));
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].pending_months, vec!["marzo", "abril"]);
    }

    #[tokio::test]
    async fn test_record_fee_unknown_student() {
        let (_dir, _local, mut academy) = test_academy(None);
        let err = academy
            .record_fee("ghost", 0, 2024, Some(10.0), date(2024, 1, 5), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::UnknownStudent(_)));
    }

    #[tokio::test]
    async fn test_record_fee_falls_back_to_academy_default() {
        let (_dir, _local, mut academy) = test_academy(None);
        let mut s = student("Ana", date(2024, 1, 1));
        s.monthly_fee = 0.0;
        academy.save(s).await.unwrap();
        let settings = AcademySettings {
            default_monthly_fee: 45.0,
            ..AcademySettings::default()
        };
        academy.update_settings(settings).await.unwrap();
        let p = academy
            .record_fee("Ana", 0, 2024, None, date(2024, 1, 5), "admin")
            .await
            .unwrap();
        assert_eq!(p.amount, 45.0);
    }

    #[tokio::test]
    async fn test_pay_teacher_reduces_cash() {
        let (_dir, _local, mut academy) = test_academy(None);
        academy
            .save(Teacher {
                id: new_id(),
                name: "Marta".to_string(),
                specialty: Some("Porteros".to_string()),
                salary: 400.0,
                phone: None,
            })
            .await
            .unwrap();
        academy
            .record_cash(Direction::Income, 1000.0, "Torneo", date(2024, 3, 1), "admin")
            .await
            .unwrap();
        let p = academy.pay_teacher("marta", None, date(2024, 3, 31), "admin").await.unwrap();
        assert_eq!(p.kind, PaymentKind::TeacherPayroll);
        assert_eq!(academy.cash_balance(), 600.0);
    }

    #[tokio::test]
    async fn test_refresh_paid_up() {
        let (_dir, local, mut academy) = test_academy(None);
        let a = student("Ana", date(2024, 3, 1));
        let b = student("Beto", date(2024, 3, 1));
        academy.save(a).await.unwrap();
        academy.save(b).await.unwrap();
        academy.record_fee("Ana", 2, 2024, None, date(2024, 3, 2), "admin").await.unwrap();
        let owing = academy.refresh_paid_up(2024, date(2024, 3, 20)).await.unwrap();
        assert_eq!(owing, 1);
        assert!(academy.find_student("Ana").unwrap().paid_up);
        assert!(!academy.find_student("Beto").unwrap().paid_up);
        let stored = local.get_all("students").unwrap();
        assert_eq!(stored[0]["paid_up"], true);
    }

    #[tokio::test]
    async fn test_flush_waits_for_mirrors() {
        let remote = Arc::new(MemoryRemote::default());
        let (_dir, _local, mut academy) = test_academy(Some(Arc::clone(&remote)));
        academy.save(student("Ana", date(2024, 1, 1))).await.unwrap();
        academy.flush().await;
        assert_eq!(remote.rows("students").len(), 1);
        assert!(!academy.sync().is_busy());
    }

    #[tokio::test]
    async fn test_local_first_when_remote_down() {
        let remote = Arc::new(MemoryRemote {
            fail_upsert: true,
            ..Default::default()
        });
        let (_dir, local, mut academy) = test_academy(Some(remote));
        academy.save(student("Ana", date(2024, 1, 1))).await.unwrap();
        academy.flush().await;
        academy.save(student("Beto", date(2024, 1, 1))).await.unwrap();
        academy.flush().await;
        assert_eq!(local.get_all("students").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fee_and_cash_entry_both_reach_remote() {
        let remote = Arc::new(MemoryRemote::default());
        let (_dir, _local, mut academy) = test_academy(Some(Arc::clone(&remote)));
        academy.save(student("Ana", date(2024, 1, 1))).await.unwrap();
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
        academy.flush().await;

        academy.record_fee("Ana", 0, 2024, None, date(2024, 1, 5), "admin").await.unwrap();
        academy.flush().await;
        assert_eq!(remote.rows("payments").len(), 1);
        assert_eq!(remote.rows("cash_flow").len(), 1);

        academy.pay_teacher("Marta", None, date(2024, 1, 31), "admin").await.unwrap();
        academy.flush().await;
        assert_eq!(remote.rows("payments").len(), 2);
        assert_eq!(remote.rows("cash_flow").len(), 2);
    }

    #[tokio::test]
    async fn test_imported_settings_keep_one_remote_row() {
        let remote = Arc::new(MemoryRemote::default());
        let (_dir, _local, mut academy) = test_academy(Some(Arc::clone(&remote)));
        let settings = AcademySettings {
            id: "imported".to_string(),
            academy_name: "Academia Norte".to_string(),
            ..AcademySettings::default()
        };
        academy.update_settings(settings).await.unwrap();
        academy.flush().await;
        assert_eq!(academy.state().settings.id, SETTINGS_ID);

        academy.upload_all().await.unwrap();
        let rows = remote.rows("academy_settings");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], SETTINGS_ID);
        assert_eq!(rows[0]["academy_name"], "Academia Norte");
    }
}
