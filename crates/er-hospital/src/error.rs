use thiserror::Error;

use er_core::HospitalId;

#[derive(Debug, Error)]
pub enum HospitalError {
    #[error("invalid hospital record: {0}")]
    InvalidRecord(String),

    #[error("hospital id {0} appears more than once")]
    DuplicateId(HospitalId),

    #[error("unknown hospital {0}")]
    UnknownHospital(HospitalId),

    #[error("hospital CSV parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HospitalResult<T> = Result<T, HospitalError>;
