use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Sentinel id of the settings singleton.
pub const SETTINGS_ID: &str = "main";

/// Every entity kind the academy keeps, with its local store name and the
/// remote table it mirrors to (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Teachers,
    Payments,
    CashFlow,
    Matches,
    Users,
    Settings,
}

impl Collection {
    pub const COUNT: usize = 7;

    pub const ALL: [Collection; Self::COUNT] = [
        Collection::Students,
        Collection::Teachers,
        Collection::Payments,
        Collection::CashFlow,
        Collection::Matches,
        Collection::Users,
        Collection::Settings,
    ];

    pub fn store_name(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Teachers => "teachers",
            Collection::Payments => "payments",
            Collection::CashFlow => "cashFlow",
            Collection::Matches => "matches",
            Collection::Users => "users",
            Collection::Settings => "settings",
        }
    }

    /// Users never leave the machine.
    pub fn remote_table(self) -> Option<&'static str> {
        match self {
            Collection::Students => Some("students"),
            Collection::Teachers => Some("teachers"),
            Collection::Payments => Some("payments"),
            Collection::CashFlow => Some("cash_flow"),
            Collection::Matches => Some("match_squads"),
            Collection::Users => None,
            Collection::Settings => Some("academy_settings"),
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A record held in one of the in-memory collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub enrollment_date: NaiveDate,
    pub category: String,
    /// Cached summary; the ledger is authoritative.
    #[serde(default)]
    pub paid_up: bool,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub guardian: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub monthly_fee: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Student {
    pub fn new(name: &str, enrollment_date: NaiveDate, category: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            enrollment_date,
            category: category.to_string(),
            paid_up: false,
            birth_date: None,
            guardian: None,
            phone: None,
            monthly_fee: 0.0,
            active: true,
        }
    }
}

impl Record for Student {
    const COLLECTION: Collection = Collection::Students;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Record for Teacher {
    const COLLECTION: Collection = Collection::Teachers;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    StudentFee,
    TeacherPayroll,
    Expense,
    Income,
}

/// Immutable once created. Several records may cover the same month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: PaymentKind,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Record for Payment {
    const COLLECTION: Collection = Collection::Payments;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Income,
    Outcome,
}

/// Cash-on-hand entry. Related to payments by convention only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recorded_by: String,
}

impl CashTransaction {
    /// Amount with the sign of its direction.
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            Direction::Income => self.amount,
            Direction::Outcome => -self.amount,
        }
    }
}

impl Record for CashTransaction {
    const COLLECTION: Collection = Collection::CashFlow;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSquad {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub match_date: Option<NaiveDate>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub player_ids: Vec<String>,
}

impl Record for MatchSquad {
    const COLLECTION: Collection = Collection::Matches;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: String,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademySettings {
    #[serde(default = "settings_id")]
    pub id: String,
    #[serde(default)]
    pub academy_name: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub default_monthly_fee: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn settings_id() -> String {
    SETTINGS_ID.to_string()
}

fn default_categories() -> Vec<String> {
    ["Sub-8", "Sub-10", "Sub-12", "Sub-14", "Sub-16", "Sub-18", "Senior"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_currency() -> String {
    "$".to_string()
}

impl Default for AcademySettings {
    fn default() -> Self {
        Self {
            id: settings_id(),
            academy_name: String::new(),
            categories: default_categories(),
            default_monthly_fee: 0.0,
            currency: default_currency(),
        }
    }
}

impl Record for AcademySettings {
    const COLLECTION: Collection = Collection::Settings;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Everything the academy holds in memory during a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
    pub payments: Vec<Payment>,
    pub cash_flow: Vec<CashTransaction>,
    pub matches: Vec<MatchSquad>,
    pub users: Vec<User>,
    pub settings: AcademySettings,
}

/// A record kind stored as an ordered list inside [`AppState`].
pub trait Listed: Record {
    fn list(state: &AppState) -> &Vec<Self>;
    fn list_mut(state: &mut AppState) -> &mut Vec<Self>;
}

macro_rules! listed {
    ($ty:ty, $field:ident) => {
        impl Listed for $ty {
            fn list(state: &AppState) -> &Vec<Self> {
                &state.$field
            }

            fn list_mut(state: &mut AppState) -> &mut Vec<Self> {
                &mut state.$field
            }
        }
    };
}

listed!(Student, students);
listed!(Teacher, teachers);
listed!(Payment, payments);
listed!(CashTransaction, cash_flow);
listed!(MatchSquad, matches);
listed!(User, users);
