/// Student DAO Module
///
/// Student queries against the legacy database.
///
/// Every operation opens its own `LegacyDao` session on the configured
/// database kind and releases it before returning, on success and on error.
use crate::config::Config;
use crate::core::db::{
    parse_code_list, BuiltQuery, ConnectionFactory, DatabaseKind, Dialect, LegacyDao,
    QueryBuilder, Row, Session, Value,
};
use crate::core::{LegacyError, Result};
use crate::students::mapper::RowMapper;
use crate::students::model::{
    EligibleQuery, EligibleStudent, GeneralSearch, NewStudent, Student, StudentSearch,
    StudentSearchResult,
};
use std::sync::Arc;
use tracing::debug;

const DEPENDENTS: &str = "tpu_dependentes_dpd";
const MUNICIPALITIES: &str = "tpu_municipios_mun";
const HOLDER_DEPENDENTS: &str = "tpu_dependentes_tit_dpt";
const STUDENT_DEPENDENTS: &str = "tpu_depend_estudante_des";

const INSERT_LISTED: &str = "insert into alu_lista_alunos (cod_dependente, nome_dependente, mt_aluno, \
     nome_mae, nome_pai, data_nascimento, email, ip_solicitante, funcao_origem_site) \
     values (?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Data access for student records.
#[derive(Debug, Clone)]
pub struct StudentDao {
    factory: Arc<ConnectionFactory>,
    kind: DatabaseKind,
    schema: Option<String>,
    test_school_code: String,
    test_marker: String,
}

impl StudentDao {
    pub fn new(factory: Arc<ConnectionFactory>, config: &Config) -> Self {
        let kind = config.students_kind();
        StudentDao {
            factory,
            kind,
            schema: config.schema_for(kind).map(str::to_string),
            test_school_code: config.students.test_school_code.trim().to_string(),
            test_marker: config.students.test_marker.replace('\'', "''"),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    fn table(&self, dialect: Dialect, table: &str) -> String {
        dialect.qualify(self.schema.as_deref(), table)
    }

    fn with_session<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T>,
    {
        let mut dao = LegacyDao::new(Arc::clone(&self.factory));
        let mut session = dao.session_kind(self.kind)?;
        let out = f(&mut session)?;
        Ok(out)
    }

    fn fetch(session: &mut Session<'_>, query: &BuiltQuery) -> Result<Vec<Row>> {
        Ok(session.query(&query.sql, &query.params)?)
    }

    /// Hides records whose name carries the test marker, except for the
    /// school that owns them.
    fn exclude_test_records(&self, builder: QueryBuilder, column: &str, school_code: &str) -> QueryBuilder {
        if school_code.trim() == self.test_school_code || self.test_marker.is_empty() {
            builder
        } else {
            builder.raw(format!("{} not like '%{}%'", column, self.test_marker))
        }
    }

    /// Full record of one student, with the latest schooling data.
    pub fn find_by_code(&self, code: &str, school_code: &str) -> Result<Option<Student>> {
        let code: i64 = code
            .trim()
            .parse()
            .map_err(|_| LegacyError::Validation(format!("student code '{}' is not a number", code.trim())))?;

        self.with_session(|session| {
            let dialect = session.dialect();
            let base = format!(
                "select dpd.dpd_cod_dependente, dpd.dpd_nome_dependente, dpd.dpd_sexo_dependente, \
                 dpd.dpd_filiacao_mae, dpd.dpd_filiacao_pai, {} dpd_data_nasc, \
                 dpd.dpd_num_telefone_dependente, dpd.dpd_email_dependente, dpd.dpd_num_cpf, \
                 dpd.dpd_num_identid, {} dpd_data_exp_identid, dpd.dpd_orgao_exp, \
                 dpd.dpd_certidao_num, dpd.dpd_certidao_folha, dpd.dpd_certidao_livro, \
                 dpd.dpd_matricula_nascimento, dpd.dpd_end_nome_logradouro, dpd.dpd_end_complemento, \
                 dpd.dpd_end_numero, dpd.dpd_end_bairro, dpd.dpd_end_cep, mun.mun_desc_municipio \
                 from {} dpd left join {} mun on dpd.mun_cod_municipio = mun.mun_cod_municipio",
                dialect.format_date("dpd.dpd_data_nasc"),
                dialect.format_date("dpd.dpd_data_exp_identid"),
                self.table(dialect, DEPENDENTS),
                self.table(dialect, MUNICIPALITIES),
            );
            let builder = QueryBuilder::new(dialect, base).condition("dpd.dpd_cod_dependente = ?", code);
            let detail = self
                .exclude_test_records(builder, "dpd.dpd_nome_dependente", school_code)
                .build()?;

            let rows = Self::fetch(session, &detail)?;
            let mut student = match rows.first() {
                Some(row) => Student::map_row(row)?,
                None => {
                    debug!(code, "student not found");
                    return Ok(None);
                }
            };

            let schooling = QueryBuilder::new(
                dialect,
                format!(
                    "select des.des_serie_periodo, des.des_grau_estudante, des.des_turno, \
                     des.des_matricula_estudante from {} dpt join {} des \
                     on dpt.dpt_cod_dpd_tit = des.dpt_cod_dpd_tit",
                    self.table(dialect, HOLDER_DEPENDENTS),
                    self.table(dialect, STUDENT_DEPENDENTS),
                ),
            )
            .condition("dpt.dpd_cod_dependente = ?", code)
            .order_by("des.des_cod_estudante")
            .build()?;
            student.apply_schooling(&Self::fetch(session, &schooling)?);

            Ok(Some(student))
        })
    }

    fn search_base(&self, dialect: Dialect, extra_columns: &str) -> String {
        format!(
            "select dpd.dpd_cod_dependente, dpd.dpd_nome_dependente, {} dpd_data_nasc, \
             dpd.dpd_num_cpf, dpd.dpd_filiacao_mae{} from {} dpd",
            dialect.format_date("dpd.dpd_data_nasc"),
            extra_columns,
            self.table(dialect, DEPENDENTS),
        )
    }

    /// Students matching every given filter, ordered by name.
    pub fn search(&self, search: &StudentSearch) -> Result<Vec<StudentSearchResult>> {
        self.with_session(|session| {
            let dialect = session.dialect();
            let query = QueryBuilder::new(
                dialect,
                self.search_base(
                    dialect,
                    ", dpd.dpd_num_telefone_dependente, dpd.dpd_email_dependente",
                ),
            )
            .contains("dpd.dpd_nome_dependente", search.name.as_deref())
            .date_equals("dpd.dpd_data_nasc", search.birth_date.as_deref())
            .filter("dpd.dpd_num_cpf = ?", search.cpf.as_deref().map(str::trim))
            .contains("dpd.dpd_filiacao_mae", search.mother_name.as_deref())
            .order_by("dpd.dpd_nome_dependente")
            .build()?;

            let results = StudentSearchResult::map_rows(&Self::fetch(session, &query)?)?;
            debug!(rows = results.len(), "student search finished");
            Ok(results)
        })
    }

    /// First student matching every given document or name filter.
    pub fn search_general(&self, search: &GeneralSearch) -> Result<Option<StudentSearchResult>> {
        self.with_session(|session| {
            let dialect = session.dialect();
            let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).map(str::to_string);
            let query = QueryBuilder::new(dialect, self.search_base(dialect, ", dpd.dpd_num_identid"))
                .filter("dpd.dpd_num_identid = ?", trimmed(&search.rg))
                .filter("dpd.dpd_certidao_num = ?", trimmed(&search.certificate_number))
                .filter("dpd.dpd_matricula_nascimento = ?", trimmed(&search.birth_registration))
                .filter("dpd.dpd_num_cpf = ?", trimmed(&search.cpf))
                .contains("dpd.dpd_filiacao_mae", search.mother_name.as_deref())
                .contains("dpd.dpd_nome_dependente", search.name.as_deref())
                .date_equals("dpd.dpd_data_nasc", search.birth_date.as_deref())
                .limit(1)
                .build()?;

            let rows = Self::fetch(session, &query)?;
            rows.first().map(StudentSearchResult::map_row).transpose()
        })
    }

    /// Active students of a school and year whose names start with one of
    /// the given initials.
    pub fn list_eligible(&self, query: &EligibleQuery) -> Result<Vec<EligibleStudent>> {
        self.with_session(|session| {
            let dialect = session.dialect();
            let built = QueryBuilder::new(
                dialect,
                format!(
                    "select alu.cod_dependente, alu.mt_aluno, alu.nome_dependente, {} data_nascimento \
                     from alu_aluno_apto alu",
                    dialect.format_date("alu.data_nascimento"),
                ),
            )
            .raw("alu.ativo = 'S'")
            .condition("alu.cod_titular = ?", query.school_code.trim())
            .condition("alu.ano_vigencia = ?", query.year.trim())
            .starts_with_any("alu.nome_dependente", &query.initials)
            .date_equals("alu.data_nascimento", query.birth_date.as_deref())
            .order_by("alu.nome_dependente")
            .build()?;

            EligibleStudent::map_rows(&Self::fetch(session, &built)?)
        })
    }

    /// Registers a student on the school list; returns the affected rows.
    pub fn insert(&self, student: &NewStudent, client_ip: &str, operation: &str) -> Result<u64> {
        let text = |v: &Option<String>| Value::text(v.as_deref().map(str::trim));
        let params = [
            text(&student.code),
            text(&student.name),
            text(&student.enrollment),
            text(&student.mother_name),
            text(&student.father_name),
            Value::date(student.birth_date),
            text(&student.email),
            Value::from(client_ip.trim()),
            Value::from(operation.trim()),
        ];

        self.with_session(|session| {
            session.prepare_insert(INSERT_LISTED)?;
            session.bind_all(&params)?;
            let rows = session.execute_update()?;
            debug!(rows, operation, "student listed");
            Ok(rows)
        })
    }

    /// Marks the listed students of a school as no longer eligible.
    ///
    /// `codes` is a hyphen- or comma-joined list; an empty list changes
    /// nothing and opens no connection.
    pub fn mark_excluded(&self, codes: &str, school_code: &str) -> Result<u64> {
        let codes = parse_code_list(codes);
        if codes.is_empty() {
            debug!("no student codes to exclude");
            return Ok(0);
        }

        self.with_session(|session| {
            let query = QueryBuilder::new(session.dialect(), "update alu_aluno_apto set ativo = 'N'")
                .condition("cod_titular = ?", school_code.trim())
                .any_of("cod_dependente", codes.iter().map(String::as_str))
                .build()?;

            session.prepare_update(&query.sql)?;
            session.bind_all(&query.params)?;
            let rows = session.execute_update()?;
            debug!(rows, codes = codes.len(), "students excluded");
            Ok(rows)
        })
    }

    /// Listed students whose code is in `codes`, ordered by name.
    pub fn list_by_codes(&self, codes: &str) -> Result<Vec<EligibleStudent>> {
        let codes = parse_code_list(codes);
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        self.with_session(|session| {
            let dialect = session.dialect();
            let query = QueryBuilder::new(
                dialect,
                format!(
                    "select cod_dependente, mt_aluno, nome_dependente, {} data_nascimento \
                     from alu_lista_alunos",
                    dialect.format_date("data_nascimento"),
                ),
            )
            .any_of("cod_dependente", codes.iter().map(String::as_str))
            .order_by("nome_dependente")
            .build()?;

            EligibleStudent::map_rows(&Self::fetch(session, &query)?)
        })
    }
}
