/// Student Model Module
///
/// Student records and query inputs.
///
/// Birth dates are carried as `dd/mm/yyyy` display strings, the way the
/// legacy queries return them; only insert input holds a typed date.
use crate::students::normalize::{normalize, normalize_upper, upper};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity document (RG) and CPF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Identity {
    pub cpf: Option<String>,
    pub rg: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
}

impl Identity {
    pub fn set_cpf(&mut self, cpf: Option<&str>) {
        self.cpf = normalize(cpf);
    }

    pub fn set_rg(&mut self, rg: Option<&str>) {
        self.rg = normalize(rg);
    }

    /// Normalized and upper-cased.
    pub fn set_issuing_authority(&mut self, authority: Option<&str>) {
        self.issuing_authority = normalize_upper(authority);
    }
}

/// Birth certificate. Every field is stored upper-cased.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Certificate {
    pub number: Option<String>,
    pub book: Option<String>,
    pub sheet: Option<String>,
    pub birth_registration: Option<String>,
}

impl Certificate {
    /// Certificate identified by number, book and sheet.
    pub fn with_book_entry(number: Option<&str>, book: Option<&str>, sheet: Option<&str>) -> Self {
        let mut cert = Certificate::default();
        cert.set_number(number);
        cert.set_book(book);
        cert.set_sheet(sheet);
        cert
    }

    /// Certificate identified by its birth registration number only.
    pub fn with_registration(registration: Option<&str>) -> Self {
        let mut cert = Certificate::default();
        cert.set_birth_registration(registration);
        cert
    }

    pub fn set_number(&mut self, number: Option<&str>) {
        self.number = upper(number);
    }

    pub fn set_book(&mut self, book: Option<&str>) {
        self.book = upper(book);
    }

    pub fn set_sheet(&mut self, sheet: Option<&str>) {
        self.sheet = upper(sheet);
    }

    pub fn set_birth_registration(&mut self, registration: Option<&str>) {
        self.birth_registration = upper(registration);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub identity: Identity,
    pub certificate: Certificate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub street: Option<String>,
    pub complement: Option<String>,
    pub number: Option<String>,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

/// Full student record as returned by a lookup by code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Student {
    pub code: String,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub document: Document,
    pub address: Address,
    pub series: Option<String>,
    pub grade: Option<String>,
    pub shift: Option<String>,
    pub enrollment: Option<String>,
}

/// Row of a name or general search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentSearchResult {
    pub code: String,
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub cpf: Option<String>,
    pub rg: Option<String>,
    pub mother_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Student eligible for (or already on) a school's list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EligibleStudent {
    pub code: String,
    pub enrollment: Option<String>,
    pub name: Option<String>,
    pub birth_date: Option<String>,
}

/// Input of a list insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub code: Option<String>,
    pub name: Option<String>,
    pub enrollment: Option<String>,
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
}

/// Filters of a search by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentSearch {
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub cpf: Option<String>,
    pub mother_name: Option<String>,
}

/// Filters of a general search; the first matching row wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneralSearch {
    pub rg: Option<String>,
    pub certificate_number: Option<String>,
    pub birth_registration: Option<String>,
    pub cpf: Option<String>,
    pub mother_name: Option<String>,
    pub name: Option<String>,
    pub birth_date: Option<String>,
}

/// Filters of the eligible-students listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EligibleQuery {
    pub initials: Vec<String>,
    pub school_code: String,
    pub year: String,
    pub birth_date: Option<String>,
}

impl EligibleQuery {
    /// Splits a comma-separated list of name initials.
    pub fn parse_initials(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
