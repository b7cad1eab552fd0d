//! Domain models
//!
//! In-memory record / result shapes carried by every transport

mod company;
mod enrichment;
mod quota;
mod run;

pub use company::{guess_website, CompanyRecord};

pub use enrichment::{
    EnrichmentData,
    EnrichmentResult,
    EnrichmentStatus,
};

pub use quota::QuotaState;
pub use run::RunReport;
