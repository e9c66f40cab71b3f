// simulation_engine/intersections.rs
// Static intersection catalog: built-in Kolkata junctions or a JSON file.

use crate::error::{Result, TrafficError};
use crate::global_variables::{HOURS_PER_DAY, MAX_QUEUE_COUNT};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Hourly baselines are drawn from `0..PROFILE_CEILING` when a catalog does not supply them.
const PROFILE_CEILING: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntersectionId(pub u32);

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw latitude / longitude pair. Distances are taken on the raw degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPosition {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lng - other.lng).powi(2)).sqrt()
    }
}

/// A catalogued intersection. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intersection {
    /// Unique identifier for the intersection.
    pub id: IntersectionId,
    /// Human readable name, used in notifications.
    pub name: String,
    pub position: GeoPosition,
    /// Parking capacity. Always positive.
    pub parking_spots: u32,
    /// Queue length an intersection starts with when it enters the working set.
    pub baseline_queue: u32,
    /// Free parking an intersection starts with when it enters the working set.
    pub baseline_parking: u32,
    /// Expected arrivals for each hour of the day.
    pub hourly_profile: [u32; HOURS_PER_DAY],
}

impl Intersection {
    pub fn new(
        id: u32,
        name: &str,
        position: GeoPosition,
        parking_spots: u32,
        baseline_queue: u32,
        baseline_parking: u32,
        hourly_profile: [u32; HOURS_PER_DAY],
    ) -> Self {
        Self {
            id: IntersectionId(id),
            name: name.to_string(),
            position,
            parking_spots,
            baseline_queue: baseline_queue.min(MAX_QUEUE_COUNT),
            baseline_parking: baseline_parking.min(parking_spots),
            hourly_profile,
        }
    }

    /// Mean of this hour's and the next hour's baseline, rounded down. Hour 23 wraps to 0.
    pub fn predicted_next_hour(&self, hour: usize) -> u32 {
        let current = self.hourly_profile[hour % HOURS_PER_DAY];
        let next = self.hourly_profile[(hour + 1) % HOURS_PER_DAY];
        (current + next) / 2
    }
}

/// One record of a JSON intersection catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub parking_spots: u32,
    #[serde(default)]
    pub queue_count: u32,
    /// Defaults to the full capacity.
    #[serde(default)]
    pub parking_available: Option<u32>,
    /// Randomized when absent.
    #[serde(default)]
    pub hourly_profile: Option<Vec<u32>>,
}

impl CatalogEntry {
    fn into_intersection<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Intersection> {
        let invalid = |reason: String| TrafficError::InvalidCatalog {
            id: self.id,
            reason,
        };

        if self.parking_spots == 0 {
            return Err(invalid("parking capacity must be positive".to_string()));
        }
        if self.queue_count > MAX_QUEUE_COUNT {
            return Err(invalid(format!(
                "queue count {} exceeds the maximum of {}",
                self.queue_count, MAX_QUEUE_COUNT
            )));
        }
        let parking_available = self.parking_available.unwrap_or(self.parking_spots);
        if parking_available > self.parking_spots {
            return Err(invalid(format!(
                "{} spots available but capacity is {}",
                parking_available, self.parking_spots
            )));
        }
        let hourly_profile = match &self.hourly_profile {
            Some(values) => <[u32; HOURS_PER_DAY]>::try_from(values.as_slice()).map_err(|_| {
                invalid(format!(
                    "hourly profile has {} values, expected {}",
                    values.len(),
                    HOURS_PER_DAY
                ))
            })?,
            None => random_profile(rng),
        };

        Ok(Intersection::new(
            self.id,
            &self.name,
            GeoPosition::new(self.lat, self.lng),
            self.parking_spots,
            self.queue_count,
            parking_available,
            hourly_profile,
        ))
    }
}

fn random_profile<R: Rng + ?Sized>(rng: &mut R) -> [u32; HOURS_PER_DAY] {
    let mut profile = [0; HOURS_PER_DAY];
    for value in profile.iter_mut() {
        *value = rng.random_range(0..PROFILE_CEILING);
    }
    profile
}

/// Static catalog of every intersection the simulator knows about.
#[derive(Debug, Clone)]
pub struct IntersectionRegistry {
    intersections: Vec<Intersection>,
}

impl IntersectionRegistry {
    pub fn new(intersections: Vec<Intersection>) -> Result<Self> {
        let mut seen = HashSet::new();
        for intersection in &intersections {
            if !seen.insert(intersection.id) {
                return Err(TrafficError::DuplicateIntersection(intersection.id.0));
            }
            if intersection.parking_spots == 0 {
                return Err(TrafficError::InvalidCatalog {
                    id: intersection.id.0,
                    reason: "parking capacity must be positive".to_string(),
                });
            }
        }
        Ok(Self { intersections })
    }

    pub fn from_entries<R: Rng + ?Sized>(entries: Vec<CatalogEntry>, rng: &mut R) -> Result<Self> {
        let intersections = entries
            .into_iter()
            .map(|entry| entry.into_intersection(rng))
            .collect::<Result<Vec<_>>>()?;
        Self::new(intersections)
    }

    pub fn from_json<R: Rng + ?Sized>(json: &str, rng: &mut R) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, rng)
    }

    /// The built-in city catalog.
    pub fn kolkata<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            intersections: create_intersections(rng),
        }
    }

    pub fn get(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.iter().find(|i| i.id == id)
    }

    pub fn hourly_profile(&self, id: IntersectionId) -> Option<[u32; HOURS_PER_DAY]> {
        self.get(id).map(|i| i.hourly_profile)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.iter()
    }

    pub fn len(&self) -> usize {
        self.intersections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intersections.is_empty()
    }
}

/// (id, name, lat, lng, parking spots, baseline queue, baseline parking)
const KOLKATA: [(u32, &str, f64, f64, u32, u32, u32); 12] = [
    (1, "Park Street-Chowringhee", 22.5551, 88.3489, 120, 15, 80),
    (2, "Esplanade", 22.5558, 88.3519, 150, 25, 100),
    (3, "Dharmatala", 22.5604, 88.3502, 80, 30, 45),
    (4, "Park Circus", 22.5397, 88.3693, 100, 20, 60),
    (5, "Shyambazar", 22.5957, 88.3732, 90, 10, 50),
    (6, "Gariahat", 22.5174, 88.3679, 110, 18, 70),
    (7, "Sealdah", 22.5676, 88.3675, 130, 22, 85),
    (8, "Howrah Bridge", 22.5839, 88.3437, 200, 35, 140),
    (9, "Ultadanga", 22.5895, 88.3889, 95, 28, 55),
    (10, "Jadavpur", 22.4977, 88.3714, 85, 15, 40),
    (11, "Salt Lake", 22.5697, 88.4115, 160, 20, 110),
    (12, "Behala", 22.4843, 88.3113, 75, 12, 35),
];

pub fn create_intersections<R: Rng + ?Sized>(rng: &mut R) -> Vec<Intersection> {
    KOLKATA
        .iter()
        .map(|&(id, name, lat, lng, spots, queue, parking)| {
            Intersection::new(
                id,
                name,
                GeoPosition::new(lat, lng),
                spots,
                queue,
                parking,
                random_profile(rng),
            )
        })
        .collect()
}
