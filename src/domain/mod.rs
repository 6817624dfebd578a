mod driver_id;
mod location_point;

pub use driver_id::DriverId;
pub use location_point::{LocationPoint, ValidationError};
