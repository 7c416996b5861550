use crate::error::{ParkingError, Result};

/// A payment request from an assistant, delivered as an app link such as
/// `platiparking://pay?city=Beograd&zone=Zona%201`.
///
/// Both parameters are optional; resolution decides what a missing one means.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppLink {
    pub city: Option<String>,
    pub zone: Option<String>,
}

impl AppLink {
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| ParkingError::InvalidAppLink(format!("not a URI: {}", uri)))?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return Err(ParkingError::InvalidAppLink(format!("bad scheme in {}", uri)));
        }

        let rest = rest.split('#').next().unwrap_or_default();
        let query = rest.split_once('?').map(|(_, q)| q).unwrap_or_default();

        let mut link = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let slot = match decode(key)?.as_str() {
                "city" => &mut link.city,
                "zone" => &mut link.zone,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(decode(value)?);
            }
        }
        Ok(link)
    }
}

fn decode(component: &str) -> Result<String> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ParkingError::InvalidAppLink(format!("bad escape in {:?}: {}", component, e)))
}
