/// Row Mapper Module
///
/// Row to record mapping.
///
/// Mapping is pure: it reads the columns of one row and never touches the
/// connection. Column names match case-insensitively.
use crate::core::db::Row;
use crate::core::{LegacyError, Result};
use crate::students::model::{
    Address, Certificate, Document, EligibleStudent, Identity, Student, StudentSearchResult,
};
use crate::students::normalize::normalize;
use chrono::NaiveDate;
use tracing::warn;

/// Builds a record from one result row.
pub trait RowMapper: Sized {
    fn map_row(row: &Row) -> Result<Self>;

    fn map_rows(rows: &[Row]) -> Result<Vec<Self>> {
        rows.iter().map(Self::map_row).collect()
    }
}

fn required(row: &Row, column: &str) -> Result<String> {
    row.get_str(column)
        .ok_or_else(|| LegacyError::Mapping(format!("column {} is missing or null", column)))
}

/// Parses a `dd/mm/yyyy` display date.
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").ok()
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |s| !s.is_empty())
}

/// Identity and certificate columns of a dependent row.
pub fn map_document(row: &Row) -> Document {
    let mut identity = Identity::default();
    identity.set_rg(row.get_str("dpd_num_identid").as_deref());
    identity.set_cpf(row.get_str("dpd_num_cpf").as_deref());
    identity.set_issuing_authority(row.get_str("dpd_orgao_exp").as_deref());
    identity.issue_date = match row.get_str("dpd_data_exp_identid") {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = parse_display_date(&raw);
            if parsed.is_none() {
                warn!(column = "dpd_data_exp_identid", "unparseable identity issue date dropped");
            }
            parsed
        }
        _ => None,
    };

    let number = row.get_str("dpd_certidao_num");
    let book = row.get_str("dpd_certidao_livro");
    let sheet = row.get_str("dpd_certidao_folha");
    let registration = row.get_str("dpd_matricula_nascimento");

    let certificate = if non_empty(&number) && non_empty(&book) && non_empty(&sheet) {
        let mut cert =
            Certificate::with_book_entry(number.as_deref(), book.as_deref(), sheet.as_deref());
        cert.set_birth_registration(registration.as_deref());
        cert
    } else {
        Certificate::with_registration(registration.as_deref())
    };

    Document {
        identity,
        certificate,
    }
}

impl RowMapper for Student {
    fn map_row(row: &Row) -> Result<Self> {
        Ok(Student {
            code: required(row, "dpd_cod_dependente")?,
            name: row.get_str("dpd_nome_dependente"),
            sex: row.get_str("dpd_sexo_dependente"),
            mother_name: row.get_str("dpd_filiacao_mae"),
            father_name: row.get_str("dpd_filiacao_pai"),
            birth_date: row.get_str("dpd_data_nasc"),
            phone: row.get_str("dpd_num_telefone_dependente"),
            email: row.get_str("dpd_email_dependente"),
            document: map_document(row),
            address: Address {
                street: row.get_str("dpd_end_nome_logradouro"),
                complement: row.get_str("dpd_end_complemento"),
                number: row.get_str("dpd_end_numero"),
                district: row.get_str("dpd_end_bairro"),
                postal_code: row.get_str("dpd_end_cep"),
                city: row.get_str("mun_desc_municipio"),
            },
            ..Student::default()
        })
    }
}

impl Student {
    /// Applies schooling rows: the last row sets series, grade and shift,
    /// the first non-null enrollment is kept.
    pub fn apply_schooling(&mut self, rows: &[Row]) {
        for row in rows {
            self.series = row.get_str("des_serie_periodo");
            self.grade = row.get_str("des_grau_estudante");
            self.shift = row.get_str("des_turno");
            if self.enrollment.is_none() {
                self.enrollment = row.get_str("des_matricula_estudante");
            }
        }
    }
}

impl RowMapper for StudentSearchResult {
    fn map_row(row: &Row) -> Result<Self> {
        Ok(StudentSearchResult {
            code: required(row, "dpd_cod_dependente")?,
            name: row.get_str("dpd_nome_dependente"),
            birth_date: row.get_str("dpd_data_nasc"),
            cpf: normalize(row.get_str("dpd_num_cpf").as_deref()),
            rg: normalize(row.get_str("dpd_num_identid").as_deref()),
            mother_name: row.get_str("dpd_filiacao_mae"),
            phone: row.get_str("dpd_num_telefone_dependente"),
            email: row.get_str("dpd_email_dependente"),
        })
    }
}

impl RowMapper for EligibleStudent {
    fn map_row(row: &Row) -> Result<Self> {
        Ok(EligibleStudent {
            code: required(row, "cod_dependente")?,
            enrollment: row.get_str("mt_aluno"),
            name: row.get_str("nome_dependente"),
            birth_date: row.get_str("data_nascimento"),
        })
    }
}
