/// Student Service Module
///
/// Student service with the legacy calling conventions.
///
/// Callers of the old layer never saw errors: failed inserts reported `0`,
/// failed searches an empty list and failed lookups nothing at all. This
/// facade keeps that contract on top of [`StudentDao`] and logs every
/// swallowed error. Bound values are never logged.
use crate::core::LegacyError;
use crate::students::dao::StudentDao;
use crate::students::model::{
    EligibleQuery, EligibleStudent, GeneralSearch, NewStudent, Student, StudentSearch,
    StudentSearchResult,
};
use crate::students::validation;
use tracing::error;

fn log_failure(operation: &'static str, err: &LegacyError) {
    match err.failure_kind() {
        Some(failure) => error!(operation, failure = %failure, error = %err, "student operation failed"),
        None => error!(operation, error = %err, "student operation failed"),
    }
}

/// Student operations that degrade to empty results instead of failing.
#[derive(Debug, Clone)]
pub struct StudentService {
    dao: StudentDao,
}

impl StudentService {
    pub fn new(dao: StudentDao) -> Self {
        StudentService { dao }
    }

    pub fn dao(&self) -> &StudentDao {
        &self.dao
    }

    /// `1` when the student was listed, `0` otherwise.
    pub fn insert(&self, student: &NewStudent, client_ip: &str, operation: &str) -> u8 {
        match self.dao.insert(student, client_ip, operation) {
            Ok(rows) if rows > 0 => 1,
            Ok(_) => 0,
            Err(e) => {
                log_failure("insert", &e);
                0
            }
        }
    }

    pub fn search(&self, search: &StudentSearch) -> Vec<StudentSearchResult> {
        self.dao.search(search).unwrap_or_else(|e| {
            log_failure("search", &e);
            Vec::new()
        })
    }

    pub fn search_general(&self, search: &GeneralSearch) -> Option<StudentSearchResult> {
        self.dao.search_general(search).unwrap_or_else(|e| {
            log_failure("search_general", &e);
            None
        })
    }

    pub fn find_by_code(&self, code: &str, school_code: &str) -> Option<Student> {
        self.dao.find_by_code(code, school_code).unwrap_or_else(|e| {
            log_failure("find_by_code", &e);
            None
        })
    }

    pub fn list_eligible(&self, query: &EligibleQuery) -> Vec<EligibleStudent> {
        self.dao.list_eligible(query).unwrap_or_else(|e| {
            log_failure("list_eligible", &e);
            Vec::new()
        })
    }

    /// Affected rows, `0` on failure.
    pub fn mark_excluded(&self, codes: &str, school_code: &str) -> u64 {
        self.dao.mark_excluded(codes, school_code).unwrap_or_else(|e| {
            log_failure("mark_excluded", &e);
            0
        })
    }

    pub fn list_by_codes(&self, codes: &str) -> Vec<EligibleStudent> {
        self.dao.list_by_codes(codes).unwrap_or_else(|e| {
            log_failure("list_by_codes", &e);
            Vec::new()
        })
    }

    pub fn verify_cpf(&self, cpf: &str) -> bool {
        validation::verify_cpf(cpf)
    }

    pub fn verify_birth_date(&self, value: &str) -> bool {
        validation::verify_birth_date_now(value)
    }
}
