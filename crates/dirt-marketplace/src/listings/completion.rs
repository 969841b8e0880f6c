use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{
    CompletedTransaction, CompletionKind, CompletionOutcome, Listing, ListingId, ListingStatus,
};

/// Quantities closer than this are treated as equal.
pub const QUANTITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("only active listings can be completed (listing is {0})")]
    NotActive(ListingStatus),
    #[error("quantity moved must be greater than zero")]
    NonPositiveQuantity,
    #[error("quantity moved ({requested}) exceeds remaining quantity ({remaining})")]
    ExceedsRemaining { requested: f64, remaining: f64 },
    #[error("partner company is required")]
    MissingPartner,
}

/// Applies a hand-off of `quantity_moved` units to `partner` against `listing`.
///
/// Moving everything that remains closes the listing. Moving less keeps the
/// listing active with a reduced quantity and spawns a completed record that
/// carries the moved amount and points back at its parent. Nothing is
/// persisted here; the caller commits both records together.
pub fn apply_completion(
    listing: &Listing,
    quantity_moved: f64,
    partner: &str,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, CompletionError> {
    if listing.status != ListingStatus::Active {
        return Err(CompletionError::NotActive(listing.status));
    }
    if !quantity_moved.is_finite() || quantity_moved <= 0.0 {
        return Err(CompletionError::NonPositiveQuantity);
    }
    if quantity_moved > listing.quantity + QUANTITY_TOLERANCE {
        return Err(CompletionError::ExceedsRemaining {
            requested: quantity_moved,
            remaining: listing.quantity,
        });
    }
    let partner = partner.trim();
    if partner.is_empty() {
        return Err(CompletionError::MissingPartner);
    }

    let mut updated = listing.clone();
    updated.updated_at = now;

    if (listing.quantity - quantity_moved).abs() <= QUANTITY_TOLERANCE {
        updated.status = ListingStatus::Completed;
        updated.quantity_moved += listing.quantity;
        updated.quantity = 0.0;
        updated.partner_company = Some(partner.to_string());
        updated.completed_at = Some(now);
        updated
            .completed_transactions
            .push(transaction(listing.quantity, partner, CompletionKind::Full, now));
        return Ok(CompletionOutcome {
            updated_listing: updated,
            new_completed_listing: None,
        });
    }

    updated.quantity = listing.quantity - quantity_moved;
    updated
        .completed_transactions
        .push(transaction(quantity_moved, partner, CompletionKind::Partial, now));

    let spawned = Listing {
        id: ListingId::generate(),
        quantity: quantity_moved,
        quantity_moved,
        status: ListingStatus::Completed,
        partner_company: Some(partner.to_string()),
        completed_from: Some(listing.id.clone()),
        completed_transactions: Vec::new(),
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
        version: 0,
        ..listing.clone()
    };

    Ok(CompletionOutcome {
        updated_listing: updated,
        new_completed_listing: Some(spawned),
    })
}

fn transaction(
    quantity_moved: f64,
    partner: &str,
    kind: CompletionKind,
    now: DateTime<Utc>,
) -> CompletedTransaction {
    CompletedTransaction {
        id: Uuid::new_v4().to_string(),
        quantity_moved,
        partner_company: partner.to_string(),
        kind,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::UserId;
    use crate::listings::domain::{Material, MeasurementUnit, TransactionType};

    fn listing(quantity: f64) -> Listing {
        let now = Utc::now();
        Listing {
            id: ListingId("listing-1".into()),
            user_id: UserId("owner".into()),
            user_name: "Pat Owner".into(),
            user_email: "pat@example.com".into(),
            user_phone: None,
            site_name: "North Pit".into(),
            material: Material::Topsoil,
            quantity,
            quantity_moved: 0.0,
            unit: MeasurementUnit::CubicYards,
            address: "1 Main St".into(),
            latitude: Some(39.0),
            longitude: Some(-98.0),
            status: ListingStatus::Active,
            transaction_type: TransactionType::Export,
            partner_company: None,
            completed_from: None,
            completed_transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 3,
        }
    }

    #[test]
    fn moving_everything_closes_the_listing() {
        let outcome = apply_completion(&listing(100.0), 100.0, "Acme Hauling", Utc::now())
            .expect("completes");

        let updated = outcome.updated_listing;
        assert_eq!(updated.status, ListingStatus::Completed);
        assert_eq!(updated.quantity, 0.0);
        assert_eq!(updated.quantity_moved, 100.0);
        assert_eq!(updated.partner_company.as_deref(), Some("Acme Hauling"));
        assert!(updated.completed_at.is_some());
        assert_eq!(updated.completed_transactions.len(), 1);
        assert_eq!(updated.completed_transactions[0].kind, CompletionKind::Full);
        assert!(outcome.new_completed_listing.is_none());
    }

    #[test]
    fn float_noise_still_counts_as_full() {
        let outcome = apply_completion(&listing(0.3), 0.1 + 0.2, "Acme", Utc::now())
            .expect("completes");
        assert_eq!(outcome.updated_listing.status, ListingStatus::Completed);
    }

    #[test]
    fn partial_move_spawns_completed_child() {
        let parent = listing(100.0);
        let outcome = apply_completion(&parent, 40.0, " Acme Hauling ", Utc::now())
            .expect("completes");

        let updated = outcome.updated_listing;
        assert_eq!(updated.status, ListingStatus::Active);
        assert_eq!(updated.quantity, 60.0);
        assert_eq!(updated.quantity_moved, 0.0);
        assert_eq!(updated.version, parent.version);
        assert_eq!(updated.completed_transactions[0].kind, CompletionKind::Partial);
        assert_eq!(updated.completed_transactions[0].quantity_moved, 40.0);

        let child = outcome.new_completed_listing.expect("child spawned");
        assert_ne!(child.id, parent.id);
        assert_eq!(child.status, ListingStatus::Completed);
        assert_eq!(child.quantity, 40.0);
        assert_eq!(child.quantity_moved, 40.0);
        assert_eq!(child.completed_from, Some(parent.id.clone()));
        assert_eq!(child.partner_company.as_deref(), Some("Acme Hauling"));
        assert_eq!(child.user_id, parent.user_id);
        assert_eq!(child.material, parent.material);
    }

    #[test]
    fn rejects_invalid_requests() {
        let active = listing(50.0);
        assert_eq!(
            apply_completion(&active, 0.0, "Acme", Utc::now()),
            Err(CompletionError::NonPositiveQuantity)
        );
        assert!(matches!(
            apply_completion(&active, 50.5, "Acme", Utc::now()),
            Err(CompletionError::ExceedsRemaining { .. })
        ));
        assert_eq!(
            apply_completion(&active, 10.0, "   ", Utc::now()),
            Err(CompletionError::MissingPartner)
        );

        let mut inactive = listing(50.0);
        inactive.status = ListingStatus::Inactive;
        assert_eq!(
            apply_completion(&inactive, 10.0, "Acme", Utc::now()),
            Err(CompletionError::NotActive(ListingStatus::Inactive))
        );
    }
}
