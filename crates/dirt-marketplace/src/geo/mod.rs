//! Geographic helpers: great-circle distance and forward geocoding.

pub mod distance;
pub mod geocoder;

pub use distance::{
    annotate, haversine_miles, sort_by_distance, within, Coordinates, Located, WithDistance,
};
pub use geocoder::{
    ConfiguredGeocoder, GeocodeError, Geocoder, MapboxGeocoder, StaticGeocoder,
};
