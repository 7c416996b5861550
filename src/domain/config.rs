use crate::error::{ParkingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a stored parking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub i64);

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named parking zone: which city and zone it covers and the SMS number
/// that accepts payments for it.
///
/// Configurations are immutable once created; the only lifecycle operations
/// are adding and removing whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingConfig {
    id: ConfigId,
    city_name: String,
    zone_name: String,
    sms_number: String,
}

impl ParkingConfig {
    /// Builds a configuration from user input.
    ///
    /// All three fields are trimmed and must be non-blank.
    pub fn new(id: ConfigId, city_name: &str, zone_name: &str, sms_number: &str) -> Result<Self> {
        let field = |name: &str, value: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(ParkingError::InvalidConfig(format!("{} must not be blank", name)))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            id,
            city_name: field("city name", city_name)?,
            zone_name: field("zone name", zone_name)?,
            sms_number: field("SMS number", sms_number)?,
        })
    }

    pub fn id(&self) -> ConfigId {
        self.id
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn sms_number(&self) -> &str {
        &self.sms_number
    }
}

/// Serializes the full configuration list as a JSON array.
pub fn encode_configs(configs: &[ParkingConfig]) -> Result<String> {
    Ok(serde_json::to_string(configs)?)
}

/// Parses a stored configuration list. A missing (empty) value is the empty list.
pub fn decode_configs(raw: &str) -> Result<Vec<ParkingConfig>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Hands out configuration ids.
///
/// A monotonic counter seeded past both the highest id already stored and the
/// current Unix time in milliseconds, so two records created within the same
/// clock tick never collide and ids stay unique across restarts.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicI64,
}

impl IdGenerator {
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn seeded_from(existing: &[ParkingConfig]) -> Self {
        let after_stored = existing
            .iter()
            .map(|c| c.id.0.saturating_add(1))
            .max()
            .unwrap_or(0);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self::starting_at(after_stored.max(now))
    }

    pub fn next_id(&self) -> ConfigId {
        ConfigId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: i64, city: &str, zone: &str) -> ParkingConfig {
        ParkingConfig::new(ConfigId(id), city, zone, "9111").unwrap()
    }

    #[test]
    fn test_wire_field_names() {
        let json = encode_configs(&[config(7, "Beograd", "Zona 1")]).unwrap();
        assert_eq!(
            json,
            r#"[{"id":7,"cityName":"Beograd","zoneName":"Zona 1","smsNumber":"9111"}]"#
        );
    }

    #[test]
    fn test_decode_preserves_order() {
        let raw = r#"[
            {"id":2,"cityName":"Novi Sad","zoneName":"Zona 2","smsNumber":"8212"},
            {"id":1,"cityName":"Beograd","zoneName":"Zona 1","smsNumber":"9111"}
        ]"#;
        let configs = decode_configs(raw).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].id(), ConfigId(2));
        assert_eq!(configs[1].city_name(), "Beograd");
        assert_eq!(decode_configs(&encode_configs(&configs).unwrap()).unwrap(), configs);
    }

    #[test]
    fn test_decode_empty_and_corrupt() {
        assert!(decode_configs("").unwrap().is_empty());
        assert!(matches!(
            decode_configs("{not json"),
            Err(ParkingError::Serialization(_))
        ));
        assert!(matches!(
            decode_configs(r#"[{"id":1,"cityName":"Beograd"}]"#),
            Err(ParkingError::Serialization(_))
        ));
    }

    #[test]
    fn test_new_rejects_blank_fields() {
        assert!(matches!(
            ParkingConfig::new(ConfigId(1), " ", "Zona 1", "9111"),
            Err(ParkingError::InvalidConfig(_))
        ));
        assert!(ParkingConfig::new(ConfigId(1), "Beograd", "", "9111").is_err());
        assert!(ParkingConfig::new(ConfigId(1), "Beograd", "Zona 1", "\t").is_err());

        let trimmed = ParkingConfig::new(ConfigId(1), " Beograd ", "Zona 1 ", " 9111").unwrap();
        assert_eq!(trimmed.city_name(), "Beograd");
        assert_eq!(trimmed.zone_name(), "Zona 1");
        assert_eq!(trimmed.sms_number(), "9111");
    }

    #[test]
    fn test_id_generator_is_monotonic() {
        let ids = IdGenerator::starting_at(10);
        assert_eq!(ids.next_id(), ConfigId(10));
        assert_eq!(ids.next_id(), ConfigId(11));
    }

    #[test]
    fn test_id_generator_skips_stored_ids() {
        let far_future = i64::MAX / 2;
        let ids = IdGenerator::seeded_from(&[config(3, "a", "b"), config(far_future, "c", "d")]);
        assert_eq!(ids.next_id(), ConfigId(far_future + 1));
    }
}
