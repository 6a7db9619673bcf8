//! Case records
//!
//! Patient case schema, the JSON case log and the upload directory.

pub mod case;
pub mod store;
pub mod upload;

pub use case::{
    compute_bmi, CaseRecord, Gender, PatientInfo, ValveSet, ValveSite, DATE_FORMAT, VALVE_COUNT,
};
pub use store::CaseStore;
pub use upload::{UploadDirectory, RECORDING_FILE};
