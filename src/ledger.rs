use chrono::{Datelike, NaiveDate};

use crate::models::{Payment, PaymentKind, Student};

/// Month names as they appear in recorded fee descriptions.
pub const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthStatus {
    /// 0 = January.
    pub month_index: u32,
    pub is_paid: bool,
    pub is_before_enrollment: bool,
    pub is_future: bool,
}

impl MonthStatus {
    pub fn is_owed(&self) -> bool {
        !self.is_paid && !self.is_before_enrollment && !self.is_future
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.month_index as usize]
    }
}

/// Canonical description written when a fee is recorded, e.g.
/// `Mensualidad - febrero de 2024`.
pub fn fee_description(month_index: u32, year: i32) -> String {
    format!("Mensualidad - {} de {year}", MONTH_NAMES[month_index as usize % 12])
}

fn first_of_month(year: i32, month0: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// A fee covers month `m` of `year` if its description names the month and
/// the year, or if it was taken during that month.
fn covers_month(payment: &Payment, student_id: &str, month0: u32, year: i32) -> bool {
    if payment.kind != PaymentKind::StudentFee
        || payment.target_id.as_deref() != Some(student_id)
    {
        return false;
    }
    let desc = payment.description.to_lowercase();
    let by_text = desc.contains(MONTH_NAMES[month0 as usize]) && desc.contains(&year.to_string());
    let by_date = payment.date.year() == year && payment.date.month0() == month0;
    by_text || by_date
}

/// Liability status of each month of `year` for `student`. `today` bounds
/// the months that are due.
pub fn monthly_status(
    student: Option<&Student>,
    year: i32,
    payments: &[Payment],
    today: NaiveDate,
) -> Vec<MonthStatus> {
    let Some(student) = student else {
        return Vec::new();
    };
    let enrolled = month_start(student.enrollment_date);
    let current = month_start(today);

    (0..12u32)
        .filter_map(|m| {
            let start = first_of_month(year, m)?;
            Some(MonthStatus {
                month_index: m,
                is_paid: payments.iter().any(|p| covers_month(p, &student.id, m, year)),
                is_before_enrollment: start < enrolled,
                is_future: start > current,
            })
        })
        .collect()
}

pub fn months_owed(statuses: &[MonthStatus]) -> usize {
    statuses.iter().filter(|s| s.is_owed()).count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentDebt {
    pub student_id: String,
    pub name: String,
    pub category: String,
    pub months_owed: usize,
    pub pending_months: Vec<&'static str>,
    pub amount_due: f64,
}

impl StudentDebt {
    pub fn pending_summary(&self) -> String {
        self.pending_months.join(", ")
    }
}

pub fn student_debt(
    student: &Student,
    year: i32,
    payments: &[Payment],
    today: NaiveDate,
) -> StudentDebt {
    let statuses = monthly_status(Some(student), year, payments, today);
    let pending_months: Vec<&'static str> = statuses
        .iter()
        .filter(|s| s.is_owed())
        .map(|s| s.month_name())
        .collect();
    StudentDebt {
        student_id: student.id.clone(),
        name: student.name.clone(),
        category: student.category.clone(),
        months_owed: pending_months.len(),
        amount_due: pending_months.len() as f64 * student.monthly_fee,
        pending_months,
    }
}

/// Students that owe at least one month, most months first. Students with
/// the same count keep their roster order.
pub fn category_report(
    students: &[Student],
    category: Option<&str>,
    year: i32,
    payments: &[Payment],
    today: NaiveDate,
) -> Vec<StudentDebt> {
    let mut debts: Vec<StudentDebt> = students
        .iter()
        .filter(|s| category.map_or(true, |c| s.category == c))
        .map(|s| student_debt(s, year, payments, today))
        .filter(|d| d.months_owed > 0)
        .collect();
    // sort_by is stable
    debts.sort_by(|a, b| b.months_owed.cmp(&a.months_owed));
    debts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn student(id: &str, enrolled: NaiveDate) -> Student {
        let mut s = Student::new(id, enrolled, "Sub-10");
        s.id = id.to_string();
        s
    }

    fn fee(student_id: &str, on: NaiveDate, description: &str) -> Payment {
        Payment {
            id: crate::models::new_id(),
            date: on,
            amount: 30.0,
            kind: PaymentKind::StudentFee,
            target_id: Some(student_id.to_string()),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_missing_student_yields_nothing() {
        let statuses = monthly_status(None, 2024, &[], date(2024, 6, 1));
        assert!(statuses.is_empty());
        assert_eq!(months_owed(&statuses), 0);
    }

    #[test]
    fn test_february_enrollment_example() {
        let s = student("s1", date(2024, 2, 1));
        // Paid in December so only the text path can match February.
        let payments = vec![fee("s1", date(2023, 12, 20), "Mensualidad - febrero de 2024")];
        let today = date(2024, 6, 15);
        let st = monthly_status(Some(&s), 2024, &payments, today);

        assert_eq!(st.len(), 12);
        assert!(st[0].is_before_enrollment);
        assert!(!st[0].is_owed());
        assert!(st[1].is_paid);
        for m in 2..=5 {
            assert!(!st[m].is_paid);
            assert!(st[m].is_owed(), "month {m} should be owed");
        }
        for m in 6..12 {
            assert!(st[m].is_future);
        }
        assert_eq!(months_owed(&st), 4);
    }

    #[test]
    fn test_text_match_is_case_insensitive() {
        let s = student("s1", date(2024, 1, 1));
        let payments = vec![fee("s1", date(2024, 9, 1), "PAGO MARZO 2024")];
        let st = monthly_status(Some(&s), 2024, &payments, date(2024, 12, 1));
        assert!(st[2].is_paid);
    }

    #[test]
    fn test_text_match_requires_year() {
        let s = student("s1", date(2023, 1, 1));
        let payments = vec![fee("s1", date(2024, 9, 1), "Mensualidad - marzo de 2023")];
        let st = monthly_status(Some(&s), 2024, &payments, date(2024, 12, 1));
        assert!(!st[2].is_paid);
    }

    #[test]
    fn test_date_match_without_description() {
        let s = student("s1", date(2024, 1, 1));
        let payments = vec![fee("s1", date(2024, 4, 30), "")];
        let st = monthly_status(Some(&s), 2024, &payments, date(2024, 12, 1));
        assert!(st[3].is_paid);
        assert_eq!(months_owed(&st), 11);
    }

    #[test]
    fn test_other_kinds_and_students_ignored() {
        let s = student("s1", date(2024, 1, 1));
        let mut payroll = fee("s1", date(2024, 1, 10), "enero 2024");
        payroll.kind = PaymentKind::TeacherPayroll;
        let other = fee("s2", date(2024, 1, 10), "enero 2024");
        let st = monthly_status(Some(&s), 2024, &[payroll, other], date(2024, 1, 20));
        assert!(!st[0].is_paid);
        assert_eq!(months_owed(&st), 1);
    }

    #[test]
    fn test_before_enrollment_excluded_even_if_paid() {
        let s = student("s1", date(2024, 5, 10));
        let payments = vec![fee("s1", date(2024, 2, 1), "")];
        let st = monthly_status(Some(&s), 2024, &payments, date(2024, 5, 20));
        assert!(st[1].is_paid);
        assert!(st[1].is_before_enrollment);
        assert_eq!(months_owed(&st), 1);
    }

    #[test]
    fn test_future_year_owes_nothing() {
        let s = student("s1", date(2020, 1, 1));
        let st = monthly_status(Some(&s), 2031, &[], date(2026, 3, 1));
        assert!(st.iter().all(|m| m.is_future));
        assert_eq!(months_owed(&st), 0);
    }

    #[test]
    fn test_past_year_fully_eligible() {
        let s = student("s1", date(2020, 1, 1));
        let st = monthly_status(Some(&s), 2022, &[], date(2026, 3, 1));
        assert!(st.iter().all(|m| !m.is_future));
        assert_eq!(months_owed(&st), 12);
    }

    #[test]
    fn test_duplicates_do_not_double_count() {
        let s = student("s1", date(2024, 1, 1));
        let payments = vec![
            fee("s1", date(2024, 1, 5), "Mensualidad - enero de 2024"),
            fee("s1", date(2024, 1, 6), "Mensualidad - enero de 2024"),
        ];
        let st = monthly_status(Some(&s), 2024, &payments, date(2024, 2, 1));
        assert_eq!(st.iter().filter(|m| m.is_paid).count(), 1);
        assert_eq!(months_owed(&st), 1);
    }

    #[test]
    fn test_monthly_status_is_pure() {
        let s = student("s1", date(2024, 2, 1));
        let payments = vec![fee("s1", date(2024, 3, 3), "")];
        let today = date(2024, 8, 1);
        assert_eq!(
            monthly_status(Some(&s), 2024, &payments, today),
            monthly_status(Some(&s), 2024, &payments, today)
        );
    }

    #[test]
    fn test_category_report_sorts_and_filters() {
        let today = date(2024, 3, 15);
        // owes Jan-Mar = 3
        let a = student("a", date(2024, 1, 1));
        // owes nothing
        let b = student("b", date(2024, 3, 1));
        // owes Mar only = 1
        let c = student("c", date(2024, 2, 1));
        let payments = vec![fee("b", date(2024, 3, 2), ""), fee("c", date(2024, 2, 2), "")];
        let report = category_report(&[c, b, a], None, 2024, &payments, today);
        let owed: Vec<usize> = report.iter().map(|d| d.months_owed).collect();
        assert_eq!(owed, vec![3, 1]);
        assert_eq!(report[0].student_id, "a");
    }

    #[test]
    fn test_category_report_ties_keep_roster_order() {
        let today = date(2024, 2, 15);
        let x = student("x", date(2024, 1, 1));
        let y = student("y", date(2024, 1, 1));
        let report = category_report(&[y, x], None, 2024, &[], today);
        let ids: Vec<&str> = report.iter().map(|d| d.student_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x"]);
    }

    #[test]
    fn test_category_filter() {
        let today = date(2024, 2, 15);
        let mut senior = student("sr", date(2024, 1, 1));
        senior.category = "Senior".to_string();
        let junior = student("jr", date(2024, 1, 1));
        let report = category_report(&[senior, junior], Some("Senior"), 2024, &[], today);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].student_id, "sr");
    }

    #[test]
    fn test_student_debt_summary_and_amount() {
        let mut s = student("s1", date(2024, 3, 1));
        s.monthly_fee = 25.0;
        let debt = student_debt(&s, 2024, &[], date(2024, 4, 10));
        assert_eq!(debt.pending_summary(), "marzo, abril");
        assert_eq!(debt.amount_due, 50.0);
    }

    #[test]
    fn test_fee_description_matches_text_path() {
        let s = student("s1", date(2024, 1, 1));
        let p = fee("s1", date(2023, 11, 1), &fee_description(6, 2024));
        let st = monthly_status(Some(&s), 2024, &[p], date(2024, 12, 1));
        assert!(st[6].is_paid);
        assert_eq!(fee_description(1, 2024), "Mensualidad - febrero de 2024");
    }
}
