/// Students Module
///
/// Student records of the legacy registration system: models, row mapping,
/// input validation, the student DAO and the legacy-compatible service.

pub mod dao;
pub mod mapper;
pub mod model;
/// Legacy text normalization. Accented vowels and `Ç` fold to their plain
/// upper-case letters and apostrophes are removed; lower-case accented
/// letters are left alone.
pub mod normalize;
pub mod service;
pub mod validation;

pub use dao::StudentDao;
pub use mapper::RowMapper;
pub use model::{
    Address, Certificate, Document, EligibleQuery, EligibleStudent, GeneralSearch, Identity,
    NewStudent, Student, StudentSearch, StudentSearchResult,
};
pub use service::StudentService;
