//! Material listings: posting, search by distance, completion and the
//! owner dashboard.

pub mod analytics;
pub mod completion;
pub mod domain;
pub mod filter;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use analytics::{summarize, ListingAnalytics, MonthlyMoved, PartnerTally};
pub use completion::{apply_completion, CompletionError, QUANTITY_TOLERANCE};
pub use domain::{
    CompletedTransaction, CompletionKind, CompletionOutcome, CompletionRequest, Listing,
    ListingId, ListingStatus, ListingUpdate, Material, MeasurementUnit, NewListing, StatusChange,
    TransactionType,
};
pub use filter::{FilterError, ListingFilter, ListingQuery, QuantityRange};
pub use repository::{ListingRepository, ListingScope};
pub use router::{listing_error_response, listing_router, ListingEndpoints};
pub use service::{ListingService, ListingServiceError};
