use crate::infra::{parse_coordinates, Marketplace};
use chrono::Duration;
use clap::Args;
use dirt_marketplace::accounts::{Role, SignupRequest, UserProfile};
use dirt_marketplace::companies::NewCompany;
use dirt_marketplace::error::AppError;
use dirt_marketplace::geo::{haversine_miles, Coordinates, StaticGeocoder};
use dirt_marketplace::listings::{
    CompletionRequest, ListingQuery, Material, NewListing, TransactionType,
};

#[derive(Args, Debug)]
pub(crate) struct DistanceArgs {
    /// Starting point as LAT,LON
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub(crate) from: Coordinates,
    /// End point as LAT,LON
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub(crate) to: Coordinates,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Zip code of the contractor browsing for material
    #[arg(long, default_value = "66952")]
    pub(crate) zip: String,
    /// Only show listings within this many miles
    #[arg(long)]
    pub(crate) max_distance: Option<f64>,
}

pub(crate) fn run_distance(args: DistanceArgs) {
    let miles = haversine_miles(args.from, args.to);
    println!(
        "({:.4}, {:.4}) -> ({:.4}, {:.4}): {:.2} miles",
        args.from.latitude, args.from.longitude, args.to.latitude, args.to.longitude, miles
    );
}

const HAYS_YARD: &str = "2700 Vine St, Hays, KS";

fn demo_geocoder() -> StaticGeocoder {
    StaticGeocoder::central_us().with_address(HAYS_YARD, Coordinates::new(38.8986, -99.3187))
}

fn demo_user(first: &str, email: &str, zip: &str, company: &str, role: Role) -> SignupRequest {
    SignupRequest {
        first_name: Some(first.to_string()),
        last_name: Some("Demo".to_string()),
        email: Some(email.to_string()),
        password: Some("demo-password".to_string()),
        phone: Some("555-0100".to_string()),
        zip_code: Some(zip.to_string()),
        company_name: Some(company.to_string()),
        role: Some(role),
        contact_preference: None,
    }
}

fn demo_listings() -> Vec<NewListing> {
    let at = |site: &str,
              material: Material,
              quantity: f64,
              point: Option<Coordinates>,
              address: &str| {
        NewListing {
            site_name: Some(site.to_string()),
            material: Some(material),
            quantity: Some(quantity),
            unit: None,
            address: Some(address.to_string()),
            latitude: point.map(|p| p.latitude),
            longitude: point.map(|p| p.longitude),
            transaction_type: Some(TransactionType::Export),
        }
    };
    vec![
        at("Vine Street Cut", Material::Topsoil, 400.0, None, HAYS_YARD),
        at(
            "Crossroads Garage Dig",
            Material::StructuralFill,
            1200.0,
            Some(Coordinates::new(39.0910, -94.5780)),
            "1800 Grand Blvd, Kansas City, MO",
        ),
        at(
            "Union Station Demo",
            Material::Concrete,
            300.0,
            Some(Coordinates::new(39.7530, -104.9999)),
            "1701 Wynkoop St, Denver, CO",
        ),
        at(
            "Riverfront Grading",
            Material::Gravel,
            650.0,
            Some(Coordinates::new(41.2565, -95.9345)),
            "Riverfront Dr, Omaha, NE",
        ),
    ]
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { zip, max_distance } = args;
    let marketplace = Marketplace::in_memory(demo_geocoder(), Duration::hours(1));

    println!("Dirt marketplace demo");
    let seller = match marketplace.accounts.signup(demo_user(
        "Morgan",
        "morgan@prairie-earthworks.example",
        "67601",
        "Prairie Earthworks",
        Role::SiteManager,
    )) {
        Ok(profile) => profile,
        Err(err) => {
            println!("  Seller signup rejected: {}", err);
            return Ok(());
        }
    };
    let buyer = match marketplace.accounts.signup(demo_user(
        "Riley",
        "riley@flint-hills-civil.example",
        &zip,
        "Flint Hills Civil",
        Role::ProjectManager,
    )) {
        Ok(profile) => profile,
        Err(err) => {
            println!("  Buyer signup rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Registered {} ({}) and {} ({})",
        seller.display_name(),
        seller.zip_code,
        buyer.display_name(),
        buyer.zip_code
    );

    let mut posted = Vec::new();
    for request in demo_listings() {
        match marketplace.listings.create(&seller, request).await {
            Ok(listing) => posted.push(listing),
            Err(err) => println!("  Listing rejected: {}", err),
        }
    }
    println!("- {} posted {} listings", seller.display_name(), posted.len());

    if let Err(err) = marketplace.companies.create(NewCompany {
        name: Some("Sunflower Hauling".to_string()),
    }) {
        println!("  Company directory unavailable: {}", err);
    }

    if let Some(first) = posted.first() {
        match marketplace.listings.complete(
            &seller,
            &first.id,
            CompletionRequest {
                quantity_moved: Some(150.0),
                partner_company: Some("Sunflower Hauling".to_string()),
            },
        ) {
            Ok(outcome) => println!(
                "- Moved 150 {} from {} to Sunflower Hauling; {} {} remain",
                outcome.updated_listing.unit.label(),
                outcome.updated_listing.site_name,
                outcome.updated_listing.quantity,
                outcome.updated_listing.unit.label()
            ),
            Err(err) => println!("  Completion rejected: {}", err),
        }
    }

    print_nearby(&marketplace, &buyer, max_distance).await;
    print_analytics(&marketplace, &seller);
    Ok(())
}

async fn print_nearby(
    marketplace: &Marketplace<StaticGeocoder>,
    buyer: &UserProfile,
    max_distance: Option<f64>,
) {
    let query = ListingQuery {
        distance: max_distance.map(|miles| miles.to_string()),
        ..ListingQuery::default()
    };
    let results = match marketplace.listings.nearby(buyer, &query).await {
        Ok(results) => results,
        Err(err) => {
            println!("\nNearby listings unavailable: {}", err);
            return;
        }
    };

    match max_distance {
        Some(miles) => println!("\nActive listings within {miles} miles of {}", buyer.zip_code),
        None => println!("\nActive listings near {}", buyer.zip_code),
    }
    if results.is_empty() {
        println!("  (none)");
    }
    for entry in &results {
        let distance = entry
            .distance_miles
            .map(|miles| format!("{miles:.1} mi"))
            .unwrap_or_else(|| "distance unknown".to_string());
        println!(
            "  - {} | {} {} {} | {}",
            entry.item.site_name,
            entry.item.quantity,
            entry.item.unit.label(),
            entry.item.material.label(),
            distance
        );
    }
}

fn print_analytics(marketplace: &Marketplace<StaticGeocoder>, seller: &UserProfile) {
    let summary = match marketplace.listings.analytics(seller) {
        Ok(summary) => summary,
        Err(err) => {
            println!("\nAnalytics unavailable: {}", err);
            return;
        }
    };
    println!("\nDashboard for {}", seller.display_name());
    println!(
        "- {} listings | {} active | {} completed | {} units moved",
        summary.total_listings,
        summary.active_listings,
        summary.completed_listings,
        summary.total_moved
    );
    for partner in &summary.top_partners {
        println!(
            "  - partner {}: {} completed",
            partner.name, partner.completed_listings
        );
    }
    for month in &summary.monthly_moved {
        println!("  - {}: {} moved", month.month, month.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_runs_against_the_static_table() {
        run_demo(DemoArgs {
            zip: "66952".to_string(),
            max_distance: Some(250.0),
        })
        .await
        .expect("demo completes");
    }

    #[test]
    fn demo_listings_cover_several_materials() {
        let listings = demo_listings();
        assert_eq!(listings.len(), 4);
        assert!(listings.iter().all(|l| l.quantity.is_some_and(|q| q > 0.0)));
    }
}
