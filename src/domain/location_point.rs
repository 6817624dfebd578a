use crate::domain::DriverId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// 0001-01-01T00:00:00Z, what clients without a clock fix tend to send
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

/// Missing and `null` fields both decode to their zero value, validation decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationPoint {
    #[serde(deserialize_with = "null_as_default")]
    pub driver_id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub order_id: String,
    #[serde(rename = "ts")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "lat", deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(rename = "lng", deserialize_with = "null_as_default")]
    pub longitude: f64,
    #[serde(rename = "speed_m_s", deserialize_with = "null_as_default")]
    pub speed: f64,
    #[serde(rename = "heading_deg", deserialize_with = "null_as_default")]
    pub heading: f64,
    #[serde(rename = "accuracy_m", deserialize_with = "null_as_default")]
    pub accuracy: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub battery: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(deserialize_with = "null_as_default")]
    pub motion: String,
    #[serde(deserialize_with = "null_as_default")]
    pub seq: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn is_unset(timestamp: Option<DateTime<Utc>>) -> bool {
    timestamp.is_none_or(|timestamp| timestamp.timestamp() == ZERO_INSTANT_SECS && timestamp.timestamp_subsec_nanos() == 0)
}

impl LocationPoint {
    pub fn force_driver_id(&mut self, driver_id: &DriverId) {
        self.driver_id = driver_id.as_str().to_string();
    }

    pub fn validate(&mut self, max_accuracy: f64) -> Result<(), ValidationError> {
        if self.driver_id.is_empty() {
            return Err(ValidationError::MissingDriverId);
        }

        // Written as negations so NaN never passes
        if !(self.latitude.abs() <= 90.0 && self.longitude.abs() <= 180.0) {
            return Err(ValidationError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }

        if !(self.accuracy > 0.0 && self.accuracy <= max_accuracy) {
            return Err(ValidationError::PoorAccuracy {
                accuracy: self.accuracy,
                max_accuracy,
            });
        }

        if is_unset(self.timestamp) {
            self.timestamp = Some(Utc::now());
        }

        Ok(())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("driver_id required")]
    MissingDriverId,
    #[error("invalid lat/lng ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("poor accuracy {accuracy} m, must be greater than 0 and at most {max_accuracy} m")]
    PoorAccuracy { accuracy: f64, max_accuracy: f64 },
}
