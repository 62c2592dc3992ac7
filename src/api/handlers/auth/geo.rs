//! IP-to-location resolution seam.
//!
//! Location strings are advisory client metadata only; they are never
//! consulted for authorization decisions.

pub trait GeoLocator: Send + Sync {
    fn locate(&self, ip: Option<&str>) -> Option<String>;
}

#[derive(Clone, Debug)]
pub struct NoopGeoLocator;

impl GeoLocator for NoopGeoLocator {
    fn locate(&self, _ip: Option<&str>) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_geo_locator_resolves_nothing() {
        let locator = NoopGeoLocator;
        assert_eq!(locator.locate(None), None);
        assert_eq!(locator.locate(Some("203.0.113.7")), None);
    }
}
