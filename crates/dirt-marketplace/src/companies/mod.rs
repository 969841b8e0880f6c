//! Directory of partner companies.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{Company, CompanyId, NewCompany};
pub use repository::CompanyRepository;
pub use router::{company_error_response, company_router, CompanyEndpoints};
pub use service::{CompanyError, CompanyService};
