use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;
const MILES_PER_KM: f64 = 0.621371;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds coordinates only when both halves are present and within range.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                let point = Self::new(latitude, longitude);
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_miles(&self, other: &Coordinates) -> f64 {
        haversine_miles(*self, *other)
    }
}

/// Great-circle distance between two points in statute miles.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c * MILES_PER_KM
}

/// Something that may or may not know where it is.
pub trait Located {
    fn coordinates(&self) -> Option<Coordinates>;
}

/// An item paired with its distance from an origin, when both ends are known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithDistance<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_miles: Option<f64>,
}

pub fn annotate<T: Located>(origin: Option<Coordinates>, items: Vec<T>) -> Vec<WithDistance<T>> {
    items
        .into_iter()
        .map(|item| {
            let distance_miles = match (origin, item.coordinates()) {
                (Some(origin), Some(point)) => Some(haversine_miles(origin, point)),
                _ => None,
            };
            WithDistance {
                item,
                distance_miles,
            }
        })
        .collect()
}

/// Keeps items within `max_miles`. Items without a known distance are dropped
/// whenever a limit is given.
pub fn within<T>(items: Vec<WithDistance<T>>, max_miles: Option<f64>) -> Vec<WithDistance<T>> {
    match max_miles {
        None => items,
        Some(limit) => items
            .into_iter()
            .filter(|entry| entry.distance_miles.is_some_and(|d| d <= limit))
            .collect(),
    }
}

/// Stable ascending sort; unknown distances trail in their original order.
pub fn sort_by_distance<T>(items: &mut [WithDistance<T>]) {
    items.sort_by(|a, b| match (a.distance_miles, b.distance_miles) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
