use std::fmt::{Display, Formatter};

/// Identity of an authenticated field agent. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriverId(String);

impl DriverId {
    pub fn parse(value: impl Into<String>) -> Option<DriverId> {
        let value = value.into();
        if value.is_empty() { None } else { Some(DriverId(value)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DriverId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_an_empty_value() {
        assert_eq!(DriverId::parse(""), None);
    }

    #[test]
    fn parse_keeps_the_value() {
        let driver_id = DriverId::parse("d1").unwrap();

        assert_eq!(driver_id.as_str(), "d1");
        assert_eq!(driver_id.to_string(), "d1");
    }
}
