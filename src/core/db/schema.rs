/// Embedded Schema Module
///
/// DDL for the legacy student tables on the embedded default database and
/// a small amount of introspection to check that they are in place.
///
/// Oracle and SQL Server own these tables already; this schema only mirrors
/// the columns the data-access layer reads and writes.
use crate::core::db::driver::DriverResult;
use rusqlite::Connection;

/// Tables the student queries depend on.
pub const LEGACY_TABLES: [&str; 6] = [
    "tpu_municipios_mun",
    "tpu_dependentes_dpd",
    "tpu_dependentes_tit_dpt",
    "tpu_depend_estudante_des",
    "alu_aluno_apto",
    "alu_lista_alunos",
];

pub const LEGACY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tpu_municipios_mun (
    mun_cod_municipio INTEGER PRIMARY KEY,
    mun_desc_municipio TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tpu_dependentes_dpd (
    dpd_cod_dependente INTEGER PRIMARY KEY,
    dpd_nome_dependente TEXT NOT NULL,
    dpd_sexo_dependente TEXT,
    dpd_filiacao_mae TEXT,
    dpd_filiacao_pai TEXT,
    dpd_data_nasc DATE,
    dpd_num_telefone_dependente TEXT,
    dpd_email_dependente TEXT,
    dpd_num_cpf TEXT,
    dpd_num_identid TEXT,
    dpd_data_exp_identid DATE,
    dpd_orgao_exp TEXT,
    dpd_certidao_num TEXT,
    dpd_certidao_folha TEXT,
    dpd_certidao_livro TEXT,
    dpd_matricula_nascimento TEXT,
    dpd_end_nome_logradouro TEXT,
    dpd_end_complemento TEXT,
    dpd_end_numero TEXT,
    dpd_end_bairro TEXT,
    dpd_end_cep TEXT,
    mun_cod_municipio INTEGER REFERENCES tpu_municipios_mun (mun_cod_municipio)
);

CREATE TABLE IF NOT EXISTS tpu_dependentes_tit_dpt (
    dpt_cod_dpd_tit INTEGER PRIMARY KEY,
    dpd_cod_dependente INTEGER NOT NULL REFERENCES tpu_dependentes_dpd (dpd_cod_dependente)
);

CREATE TABLE IF NOT EXISTS tpu_depend_estudante_des (
    des_cod_estudante INTEGER PRIMARY KEY AUTOINCREMENT,
    dpt_cod_dpd_tit INTEGER NOT NULL REFERENCES tpu_dependentes_tit_dpt (dpt_cod_dpd_tit),
    des_serie_periodo TEXT,
    des_grau_estudante TEXT,
    des_turno TEXT,
    des_matricula_estudante TEXT
);

CREATE TABLE IF NOT EXISTS alu_aluno_apto (
    cod_dependente TEXT NOT NULL,
    mt_aluno TEXT,
    nome_dependente TEXT NOT NULL,
    data_nascimento DATE,
    ativo TEXT NOT NULL DEFAULT 'S',
    cod_titular TEXT NOT NULL,
    ano_vigencia TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alu_lista_alunos (
    cod_dependente TEXT,
    nome_dependente TEXT,
    mt_aluno TEXT,
    nome_mae TEXT,
    nome_pai TEXT,
    data_nascimento DATE,
    email TEXT,
    ip_solicitante TEXT,
    funcao_origem_site TEXT
);

CREATE INDEX IF NOT EXISTS idx_dpd_nome ON tpu_dependentes_dpd (dpd_nome_dependente);
CREATE INDEX IF NOT EXISTS idx_apto_titular ON alu_aluno_apto (cod_titular, ano_vigencia);
";

/// Creates the legacy tables that do not exist yet.
pub fn apply_schema(conn: &Connection) -> DriverResult<()> {
    conn.execute_batch(LEGACY_SCHEMA)?;
    Ok(())
}

/// Lists the legacy tables missing from the database.
pub fn missing_tables(conn: &Connection) -> DriverResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(LEGACY_TABLES
        .iter()
        .filter(|t| !existing.iter().any(|e| e.eq_ignore_ascii_case(t)))
        .map(|t| t.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(missing_tables(&conn).unwrap().len(), LEGACY_TABLES.len());

        apply_schema(&conn).unwrap();
        assert!(missing_tables(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO tpu_municipios_mun VALUES (1, 'RECIFE')",
            [],
        )
        .unwrap();

        apply_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tpu_municipios_mun", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_tables_reports_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE alu_lista_alunos (cod_dependente TEXT);")
            .unwrap();
        let missing = missing_tables(&conn).unwrap();
        assert_eq!(missing.len(), LEGACY_TABLES.len() - 1);
        assert!(!missing.contains(&"alu_lista_alunos".to_string()));
    }
}
