use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::domain::{Listing, ListingStatus};

const TOP_PARTNERS: usize = 3;
const MONTH_WINDOW: i32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerTally {
    pub name: String,
    pub completed_listings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMoved {
    /// `YYYY-MM`
    pub month: String,
    pub by_material: BTreeMap<String, f64>,
    pub total: f64,
}

/// Dashboard figures over one user's listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingAnalytics {
    pub total_listings: usize,
    pub active_listings: usize,
    pub completed_listings: usize,
    pub total_moved: f64,
    pub top_partners: Vec<PartnerTally>,
    pub monthly_moved: Vec<MonthlyMoved>,
}

fn month_index(at: DateTime<Utc>) -> i32 {
    at.year() * 12 + at.month0() as i32
}

/// Deleted listings are left out of every figure.
pub fn summarize(listings: &[Listing], now: DateTime<Utc>) -> ListingAnalytics {
    let live: Vec<&Listing> = listings
        .iter()
        .filter(|listing| listing.status != ListingStatus::Deleted)
        .collect();

    let count = |status: ListingStatus| live.iter().filter(|l| l.status == status).count();
    let total_moved = live.iter().map(|listing| listing.quantity_moved).sum();

    let mut partners: HashMap<&str, usize> = HashMap::new();
    for listing in live.iter().filter(|l| l.status == ListingStatus::Completed) {
        if let Some(partner) = listing.partner_company.as_deref() {
            *partners.entry(partner).or_default() += 1;
        }
    }
    let mut top_partners: Vec<PartnerTally> = partners
        .into_iter()
        .map(|(name, completed_listings)| PartnerTally {
            name: name.to_string(),
            completed_listings,
        })
        .collect();
    top_partners.sort_by(|a, b| {
        b.completed_listings
            .cmp(&a.completed_listings)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_partners.truncate(TOP_PARTNERS);

    let newest = month_index(now);
    let mut months: BTreeMap<String, MonthlyMoved> = BTreeMap::new();
    for listing in &live {
        let Some(completed_at) = listing.completed_at else {
            continue;
        };
        let index = month_index(completed_at);
        if index > newest || newest - index >= MONTH_WINDOW || listing.quantity_moved <= 0.0 {
            continue;
        }
        let key = completed_at.format("%Y-%m").to_string();
        let entry = months.entry(key.clone()).or_insert_with(|| MonthlyMoved {
            month: key,
            by_material: BTreeMap::new(),
            total: 0.0,
        });
        *entry
            .by_material
            .entry(listing.material.label().to_string())
            .or_default() += listing.quantity_moved;
        entry.total += listing.quantity_moved;
    }

    ListingAnalytics {
        total_listings: live.len(),
        active_listings: count(ListingStatus::Active),
        completed_listings: count(ListingStatus::Completed),
        total_moved,
        top_partners,
        monthly_moved: months.into_values().collect(),
    }
}
