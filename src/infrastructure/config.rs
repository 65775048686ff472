use std::env;
use std::time::Duration;

use chrono::{Days, NaiveDate};

use crate::models::BookType;

/// Hard ceiling on any loan period, whatever the configuration says
pub const MAX_LOAN_DAYS_CEILING: u32 = 365;

/// Circulation rules applied when loans are opened or renewed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoanPolicy {
    /// Maximum number of open loans a patron may hold at once
    pub max_open_loans: u32,
    pub physical_loan_days: u32,
    pub digital_loan_days: u32,
    /// Upper bound for the distance between loan date and estimated return date,
    /// capped at `MAX_LOAN_DAYS_CEILING`
    pub max_loan_days: u32,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_open_loans: 5,
            physical_loan_days: 14,
            digital_loan_days: 7,
            max_loan_days: 365,
        }
    }
}

impl LoanPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_open_loans: parse_var("MAX_OPEN_LOANS").unwrap_or(defaults.max_open_loans),
            physical_loan_days: parse_var("PHYSICAL_LOAN_DAYS")
                .unwrap_or(defaults.physical_loan_days),
            digital_loan_days: parse_var("DIGITAL_LOAN_DAYS").unwrap_or(defaults.digital_loan_days),
            max_loan_days: parse_var("MAX_LOAN_DAYS")
                .unwrap_or(defaults.max_loan_days)
                .min(MAX_LOAN_DAYS_CEILING),
        }
    }

    /// Loan window actually enforced
    pub fn effective_max_loan_days(&self) -> u32 {
        self.max_loan_days.min(MAX_LOAN_DAYS_CEILING)
    }

    pub fn loan_days(&self, book_type: BookType) -> u32 {
        match book_type {
            BookType::Physical => self.physical_loan_days,
            BookType::Digital => self.digital_loan_days,
        }
    }

    /// Default estimated return date for a loan starting on `loan_date`
    pub fn default_return_date(&self, book_type: BookType, loan_date: NaiveDate) -> Option<NaiveDate> {
        loan_date.checked_add_days(Days::new(u64::from(self.loan_days(book_type))))
    }

    /// Latest estimated return date allowed for a loan starting on `loan_date`
    pub fn latest_return_date(&self, loan_date: NaiveDate) -> Option<NaiveDate> {
        loan_date.checked_add_days(Days::new(u64::from(self.effective_max_loan_days())))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub profile: String,
    pub max_connections: u32,
    /// How long a transaction waits for a connection or a SQLite lock
    pub lock_timeout: Duration,
    pub loan_policy: LoanPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::for_profile(profile)
    }

    pub fn for_profile(profile: String) -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://bibliocore.db?mode=rwc".to_string()
            } else {
                format!("sqlite://bibliocore_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            profile,
            max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(5),
            lock_timeout: Duration::from_millis(parse_var("DB_LOCK_TIMEOUT_MS").unwrap_or(2000)),
            loan_policy: LoanPolicy::from_env(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_window_depends_on_book_type() {
        let policy = LoanPolicy::default();
        let loan_date = date(2024, 11, 1);
        assert_eq!(
            policy.default_return_date(BookType::Physical, loan_date),
            Some(date(2024, 11, 15))
        );
        assert_eq!(
            policy.default_return_date(BookType::Digital, loan_date),
            Some(date(2024, 11, 8))
        );
        assert_eq!(policy.latest_return_date(loan_date), Some(date(2025, 11, 1)));
    }

    #[test]
    #[serial]
    fn policy_reads_overrides_from_env() {
        // SAFETY: serialized with the other env tests, nothing else reads these keys
        unsafe {
            env::set_var("MAX_OPEN_LOANS", "3");
            env::set_var("PHYSICAL_LOAN_DAYS", "not-a-number");
        }
        let policy = LoanPolicy::from_env();
        unsafe {
            env::remove_var("MAX_OPEN_LOANS");
            env::remove_var("PHYSICAL_LOAN_DAYS");
        }

        assert_eq!(policy.max_open_loans, 3);
        assert_eq!(policy.physical_loan_days, 14);
    }

    #[test]
    #[serial]
    fn loan_window_never_exceeds_a_year() {
        unsafe {
            env::set_var("MAX_LOAN_DAYS", "500");
        }
        let policy = LoanPolicy::from_env();
        unsafe {
            env::remove_var("MAX_LOAN_DAYS");
        }
        assert_eq!(policy.max_loan_days, 365);

        let generous = LoanPolicy {
            max_loan_days: 500,
            ..LoanPolicy::default()
        };
        assert_eq!(
            generous.latest_return_date(date(2024, 1, 1)),
            Some(date(2024, 12, 31))
        );
    }

    #[test]
    #[serial]
    fn profile_selects_database_file() {
        unsafe {
            env::remove_var("DATABASE_URL");
        }
        let config = Config::for_profile("staging".to_string());
        assert_eq!(config.database_url, "sqlite://bibliocore_staging.db?mode=rwc");
        assert_eq!(config.lock_timeout, Duration::from_millis(2000));
    }
}
