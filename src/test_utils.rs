/// # Test Utilities Module
///
/// Shared testing infrastructure for the data-access layer:
/// - `MockDriver`: a recording driver whose handles log every open, prepare,
///   execute and close, and can be told to fail at each step
/// - `LegacyFixture`: an embedded database file with the legacy schema and
///   a small set of sample students
use crate::config::Config;
use crate::core::db::dialect::{placeholder_positions, Dialect};
use crate::core::db::driver::{
    Connection, Driver, DriverResult, MemoryResultSet, ParameterSlots, ResultSet, Statement,
};
use crate::core::db::schema::apply_schema;
use crate::core::db::{ConnectionFactory, SqliteDriver, Value};
use crate::core::error::DriverError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Failure injection for `MockDriver`.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub fail_connect: bool,
    pub fail_prepare: bool,
    pub fail_execute: bool,
    /// Every close reports an error (the event is still recorded)
    pub fail_close: bool,
    /// Sleep before every execute
    pub execute_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: AtomicUsize,
    events: Mutex<Vec<String>>,
    executions: Mutex<Vec<(String, Vec<Value>)>>,
    result: Mutex<Option<(Vec<String>, Vec<Vec<Value>>)>>,
}

impl MockState {
    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Driver that records what the lifecycle manager does with its handles.
///
/// Clones share the event log and the connection counter, so one driver can
/// be registered for several kinds and connection ids stay unique.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    behavior: MockBehavior,
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        MockDriver::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        MockDriver {
            behavior,
            state: Arc::default(),
        }
    }

    /// Rows every query returns.
    pub fn with_result(self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        if let Ok(mut result) = self.state.result.lock() {
            *result = Some((columns.iter().map(|c| c.to_string()).collect(), rows));
        }
        self
    }

    /// Events in the order they happened, e.g. `open#1`, `close_stmt#1`.
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of times `event` was recorded.
    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    /// SQL and bound values of every execution.
    pub fn executions(&self) -> Vec<(String, Vec<Value>)> {
        self.state
            .executions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl Driver for MockDriver {
    fn open(&self) -> DriverResult<Box<dyn Connection>> {
        if self.behavior.fail_connect {
            self.state.record("open_failed".to_string());
            return Err(DriverError::Other("connection refused".to_string()));
        }
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.record(format!("open#{}", id));
        Ok(Box::new(MockConnection {
            id,
            behavior: self.behavior.clone(),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockConnection {
    id: usize,
    behavior: MockBehavior,
    state: Arc<MockState>,
    closed: bool,
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement>> {
        if self.closed {
            return Err(DriverError::Closed("connection"));
        }
        if self.behavior.fail_prepare {
            self.state.record(format!("prepare_failed#{}", self.id));
            return Err(DriverError::Other("syntax error".to_string()));
        }
        self.state.record(format!("prepare#{}", self.id));
        Ok(Box::new(MockStatement {
            id: self.id,
            sql: sql.to_string(),
            params: ParameterSlots::new(placeholder_positions(sql).len()),
            behavior: self.behavior.clone(),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.state.record(format!("close_conn#{}", self.id));
        close_result(&self.behavior)
    }
}

struct MockStatement {
    id: usize,
    sql: String,
    params: ParameterSlots,
    behavior: MockBehavior,
    state: Arc<MockState>,
    closed: bool,
}

impl MockStatement {
    fn execute(&mut self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed("statement"));
        }
        if let Some(delay) = self.behavior.execute_delay {
            std::thread::sleep(delay);
        }
        if self.behavior.fail_execute {
            self.state.record(format!("execute_failed#{}", self.id));
            return Err(DriverError::Other("execution failed".to_string()));
        }
        let values = self.params.values()?;
        self.state.record(format!("execute#{}", self.id));
        if let Ok(mut executions) = self.state.executions.lock() {
            executions.push((self.sql.clone(), values));
        }
        Ok(())
    }
}

impl Statement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn bind(&mut self, index: usize, value: Value) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed("statement"));
        }
        self.params.set(index, value)
    }

    fn clear_parameters(&mut self) {
        self.params.clear();
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>> {
        self.execute()?;
        let (columns, rows) = self
            .state
            .result
            .lock()
            .ok()
            .and_then(|r| r.clone())
            .unwrap_or_default();
        Ok(Box::new(MockResultSet {
            id: self.id,
            inner: MemoryResultSet::new(columns, rows),
            behavior: self.behavior.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.execute()?;
        Ok(1)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.state.record(format!("close_stmt#{}", self.id));
        close_result(&self.behavior)
    }
}

struct MockResultSet {
    id: usize,
    inner: MemoryResultSet,
    behavior: MockBehavior,
    state: Arc<MockState>,
}

impl ResultSet for MockResultSet {
    fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    fn next(&mut self) -> DriverResult<Option<crate::core::db::Row>> {
        self.inner.next()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.inner.close()?;
        self.state.record(format!("close_rs#{}", self.id));
        close_result(&self.behavior)
    }
}

fn close_result(behavior: &MockBehavior) -> DriverResult<()> {
    if behavior.fail_close {
        Err(DriverError::Other("close failed".to_string()))
    } else {
        Ok(())
    }
}

/// School code of the sample eligible students.
pub const SAMPLE_SCHOOL: &str = "1001";
pub const SAMPLE_YEAR: &str = "2024";

const SAMPLE_DATA: &str = "
INSERT INTO tpu_municipios_mun VALUES (1, 'RECIFE'), (2, 'OLINDA');

INSERT INTO tpu_dependentes_dpd (
    dpd_cod_dependente, dpd_nome_dependente, dpd_sexo_dependente, dpd_filiacao_mae,
    dpd_filiacao_pai, dpd_data_nasc, dpd_num_telefone_dependente, dpd_email_dependente,
    dpd_num_cpf, dpd_num_identid, dpd_data_exp_identid, dpd_orgao_exp,
    dpd_certidao_num, dpd_certidao_folha, dpd_certidao_livro, dpd_matricula_nascimento,
    dpd_end_nome_logradouro, dpd_end_complemento, dpd_end_numero, dpd_end_bairro,
    dpd_end_cep, mun_cod_municipio
) VALUES
    (101, 'JOAO DA SILVA', 'M', 'MARIA DA SILVA', 'JOSE DA SILVA', '2012-03-15',
     '8133330000', 'joao@example.com', '12345678901', '1234''567', '2020-01-10', 'sds-pe',
     'c101', 'f1', 'l1', 'm101', 'RUA A', 'APTO 1', '10', 'CENTRO', '50000000', 1),
    (102, 'ANA SILVA', 'F', 'CLARA SILVA', NULL, '2013-07-01',
     NULL, NULL, NULL, '7654321', NULL, NULL,
     NULL, NULL, NULL, 'm102', NULL, NULL, NULL, NULL, NULL, 2),
    (103, 'PEDRO SOUZA', 'M', 'LUCIA SOUZA', NULL, '2012-03-15',
     NULL, NULL, '98765432100', NULL, NULL, NULL,
     NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, 1),
    (104, 'ALUNO TESTE', 'M', 'MAE TESTE', NULL, '2011-05-05',
     NULL, NULL, NULL, NULL, NULL, NULL,
     NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL);

INSERT INTO tpu_dependentes_tit_dpt VALUES (1, 101), (2, 102);

INSERT INTO tpu_depend_estudante_des (
    dpt_cod_dpd_tit, des_serie_periodo, des_grau_estudante, des_turno, des_matricula_estudante
) VALUES
    (1, '5', 'FUNDAMENTAL', 'MANHA', 'E-101'),
    (1, '6', 'FUNDAMENTAL', 'TARDE', NULL);

INSERT INTO alu_aluno_apto (
    cod_dependente, mt_aluno, nome_dependente, data_nascimento, ativo, cod_titular, ano_vigencia
) VALUES
    ('101', 'MT1', 'JOAO DA SILVA', '2012-03-15', 'S', '1001', '2024'),
    ('102', 'MT2', 'ANA SILVA', '2013-07-01', 'S', '1001', '2024'),
    ('103', 'MT3', 'PEDRO SOUZA', '2012-03-15', 'S', '1001', '2024'),
    ('105', 'MT5', 'BRUNO LIMA', '2012-01-01', 'N', '1001', '2024'),
    ('106', 'MT6', 'BEATRIZ COSTA', '2012-02-02', 'S', '2002', '2024');
";

/// Embedded database file with the legacy schema and sample students.
///
/// The file lives in a temporary directory removed on drop.
pub struct LegacyFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl LegacyFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("legacy.db");
        let fixture = LegacyFixture { _dir: dir, path };

        let conn = fixture.driver().open_native().expect("open fixture database");
        apply_schema(&conn).expect("apply legacy schema");
        conn.execute_batch(SAMPLE_DATA).expect("load sample data");
        fixture
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn driver(&self) -> SqliteDriver {
        SqliteDriver::new(self.path.to_string_lossy().to_string())
    }

    /// Factory whose default database is the fixture file.
    pub fn factory(&self) -> Arc<ConnectionFactory> {
        Arc::new(ConnectionFactory::new(self.driver()))
    }

    /// Configuration pointing the default database at the fixture file.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.default.path = self.path.to_string_lossy().to_string();
        config
    }

    /// Runs a scalar count query directly against the fixture file.
    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.driver().open_native().expect("open fixture database");
        conn.query_row(sql, [], |row| row.get(0)).expect("count query")
    }
}

impl Default for LegacyFixture {
    fn default() -> Self {
        LegacyFixture::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_driver_numbers_connections() {
        let driver = MockDriver::new();
        let mut first = driver.open().unwrap();
        let _second = driver.clone().open().unwrap();
        first.close().unwrap();
        assert_eq!(driver.events(), vec!["open#1", "open#2", "close_conn#1"]);
    }

    #[test]
    fn test_mock_statement_records_bound_values() {
        let driver = MockDriver::new().with_result(&["a"], vec![vec![Value::Integer(7)]]);
        let mut conn = driver.open().unwrap();
        let mut stmt = conn.prepare("select a from t where b = ?").unwrap();
        assert!(matches!(
            stmt.execute_query(),
            Err(DriverError::UnboundParameter { index: 1 })
        ));

        stmt.bind(1, Value::from("x")).unwrap();
        let mut rs = stmt.execute_query().unwrap();
        let row = rs.next().unwrap().unwrap();
        assert_eq!(row.get_str("a"), Some("7".to_string()));
        assert_eq!(
            driver.executions(),
            vec![("select a from t where b = ?".to_string(), vec![Value::from("x")])]
        );
    }

    #[test]
    fn test_fixture_has_sample_data() {
        let fixture = LegacyFixture::new();
        assert_eq!(fixture.count("select count(*) from tpu_dependentes_dpd"), 4);
        assert_eq!(fixture.count("select count(*) from alu_aluno_apto where ativo = 'S'"), 4);
        assert_eq!(fixture.count("select count(*) from alu_lista_alunos"), 0);
    }
}
