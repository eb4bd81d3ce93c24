use clap::{Parser, Subcommand};
use legacy_dao::config::{default_config_path, load_config, Config};
use legacy_dao::core::db::schema::{apply_schema, missing_tables};
use legacy_dao::core::db::{ConnectionFactory, SqliteDriver};
use legacy_dao::core::{LegacyError, Result};
use legacy_dao::students::mapper::parse_display_date;
use legacy_dao::students::{
    EligibleQuery, GeneralSearch, NewStudent, StudentDao, StudentSearch, StudentService,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "legacy-dao")]
#[command(about = "Student lookups against the legacy registration database")]
#[command(version)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Embedded database file, overriding `[default] path`
    #[arg(long, env = "LEGACY_DAO_DB")]
    db: Option<String>,

    /// Database used for student queries: oracle, sqlserver or default
    #[arg(long)]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the legacy tables on the embedded database
    InitDb,

    /// Search students by name, birth date, CPF or mother's name
    Search {
        #[arg(long)]
        name: Option<String>,
        /// Birth date as dd/mm/yyyy
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        mother: Option<String>,
    },

    /// First student matching any document or name filters
    General {
        #[arg(long)]
        rg: Option<String>,
        #[arg(long)]
        certificate: Option<String>,
        #[arg(long)]
        registration: Option<String>,
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        mother: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        birth_date: Option<String>,
    },

    /// Active students of a school and year
    Eligible {
        #[arg(long)]
        school: String,
        #[arg(long)]
        year: String,
        /// Comma-separated name initials
        #[arg(long, default_value = "")]
        initials: String,
        #[arg(long)]
        birth_date: Option<String>,
    },

    /// Full record of one student
    Show {
        code: String,
        #[arg(long)]
        school: String,
    },

    /// Register a student on the school list
    Insert {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        enrollment: Option<String>,
        #[arg(long)]
        mother: Option<String>,
        #[arg(long)]
        father: Option<String>,
        /// Birth date as dd/mm/yyyy
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
        #[arg(long, default_value = "cli")]
        operation: String,
    },

    /// Mark students as no longer eligible (codes joined by '-' or ',')
    Exclude {
        codes: String,
        #[arg(long)]
        school: String,
    },

    /// Listed students by code (codes joined by '-' or ',')
    Codes { codes: String },

    /// Check the shape of a CPF number
    CheckCpf { cpf: String },

    /// Check a dd/mm/yyyy birth date
    CheckDate { date: String },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_config(path)?,
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                config
            }
        },
    };
    if let Some(db) = &cli.db {
        config.default.path = db.clone();
    }
    if let Some(source) = &cli.source {
        config.students.source = source.clone();
    }
    Ok(config)
}

fn setup_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date_arg(value: Option<String>) -> Result<Option<chrono::NaiveDate>> {
    match value {
        None => Ok(None),
        Some(raw) => parse_display_date(&raw)
            .map(Some)
            .ok_or_else(|| LegacyError::Validation(format!("'{}' is not a dd/mm/yyyy date", raw))),
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    setup_logging(&config);
    debug!(?config, "configuration loaded");

    let factory = Arc::new(ConnectionFactory::from_config(&config));
    let dao = StudentDao::new(Arc::clone(&factory), &config);
    let service = StudentService::new(dao.clone());

    match cli.command {
        Commands::InitDb => {
            let conn = SqliteDriver::new(config.default.path.clone())
                .open_native()
                .map_err(|e| LegacyError::Config(format!("cannot open {}: {}", config.default.path, e)))?;
            apply_schema(&conn).map_err(|e| LegacyError::Config(e.to_string()))?;
            let missing = missing_tables(&conn).map_err(|e| LegacyError::Config(e.to_string()))?;
            info!(path = %config.default.path, "legacy schema applied");
            print_json(&json!({ "path": config.default.path, "missing_tables": missing }))
        }
        Commands::Search {
            name,
            birth_date,
            cpf,
            mother,
        } => {
            let search = StudentSearch {
                name,
                birth_date,
                cpf,
                mother_name: mother,
            };
            print_json(&dao.search(&search)?)
        }
        Commands::General {
            rg,
            certificate,
            registration,
            cpf,
            mother,
            name,
            birth_date,
        } => {
            let search = GeneralSearch {
                rg,
                certificate_number: certificate,
                birth_registration: registration,
                cpf,
                mother_name: mother,
                name,
                birth_date,
            };
            print_json(&dao.search_general(&search)?)
        }
        Commands::Eligible {
            school,
            year,
            initials,
            birth_date,
        } => {
            let query = EligibleQuery {
                initials: EligibleQuery::parse_initials(&initials),
                school_code: school,
                year,
                birth_date,
            };
            print_json(&dao.list_eligible(&query)?)
        }
        Commands::Show { code, school } => print_json(&dao.find_by_code(&code, &school)?),
        Commands::Insert {
            code,
            name,
            enrollment,
            mother,
            father,
            birth_date,
            email,
            ip,
            operation,
        } => {
            let student = NewStudent {
                code: Some(code),
                name: Some(name),
                enrollment,
                mother_name: mother,
                father_name: father,
                birth_date: parse_date_arg(birth_date)?,
                email,
            };
            print_json(&json!({ "result": service.insert(&student, &ip, &operation) }))
        }
        Commands::Exclude { codes, school } => {
            print_json(&json!({ "updated": dao.mark_excluded(&codes, &school)? }))
        }
        Commands::Codes { codes } => print_json(&dao.list_by_codes(&codes)?),
        Commands::CheckCpf { cpf } => {
            print_json(&json!({ "cpf": cpf, "valid": service.verify_cpf(&cpf) }))
        }
        Commands::CheckDate { date } => {
            print_json(&json!({ "date": date, "valid": service.verify_birth_date(&date) }))
        }
    }
}
