use geo::Point;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A geographic point with an associated timestamp.
///
/// The atomic observation of a 2D moving object: where it was and when.
///
/// # Examples
///
/// ```
/// use tessel_types::point::TemporalPoint;
/// use geo::Point;
/// use std::time::SystemTime;
///
/// let observed = TemporalPoint::new(Point::new(-74.0060, 40.7128), SystemTime::now());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPoint {
    pub point: Point<f64>,
    pub timestamp: SystemTime,
}

impl TemporalPoint {
    pub fn new(point: Point<f64>, timestamp: SystemTime) -> Self {
        Self { point, timestamp }
    }

    pub fn point(&self) -> &Point<f64> {
        &self.point
    }

    pub fn x(&self) -> f64 {
        self.point.x()
    }

    pub fn y(&self) -> f64 {
        self.point.y()
    }

    pub fn timestamp(&self) -> &SystemTime {
        &self.timestamp
    }
}

/// A geographic point with an associated altitude and timestamp.
///
/// Used for altitude-aware moving objects such as drones or aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPoint3D {
    pub point: Point<f64>,
    pub altitude: f64,
    pub timestamp: SystemTime,
}

impl TemporalPoint3D {
    pub fn new(point: Point<f64>, altitude: f64, timestamp: SystemTime) -> Self {
        Self {
            point,
            altitude,
            timestamp,
        }
    }

    pub fn point(&self) -> &Point<f64> {
        &self.point
    }

    pub fn x(&self) -> f64 {
        self.point.x()
    }

    pub fn y(&self) -> f64 {
        self.point.y()
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn timestamp(&self) -> &SystemTime {
        &self.timestamp
    }

    /// Project to a 2D temporal point by discarding the altitude.
    pub fn to_2d(&self) -> TemporalPoint {
        TemporalPoint::new(self.point, self.timestamp)
    }
}
