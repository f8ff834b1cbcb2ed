//! GPS decoding: EXIF degree/minute/second rationals to signed decimal
//! degrees.

use crate::error::ExtractionError;
use crate::types::{ExifTagSet, GpsCoordinate, TagValue};

/// One coordinate axis and the tags that describe it.
#[derive(Debug, Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn value_tag(self) -> &'static str {
        match self {
            Self::Latitude => "GPSLatitude",
            Self::Longitude => "GPSLongitude",
        }
    }

    fn ref_tag(self) -> &'static str {
        match self {
            Self::Latitude => "GPSLatitudeRef",
            Self::Longitude => "GPSLongitudeRef",
        }
    }

    /// (positive, negative) hemisphere letters.
    fn hemispheres(self) -> (&'static str, &'static str) {
        match self {
            Self::Latitude => ("N", "S"),
            Self::Longitude => ("E", "W"),
        }
    }

    fn limit(self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }
}

const COMPONENTS: [&str; 3] = ["degrees", "minutes", "seconds"];

/// Converts the GPS tags of an [`ExifTagSet`] into a [`GpsCoordinate`].
pub struct GpsDecoder;

impl GpsDecoder {
    /// Decode the latitude/longitude pair.
    ///
    /// Returns `Ok(None)` when either coordinate's rationals are missing.
    /// Present but undecodable values (wrong count, zero denominator, bad or
    /// missing hemisphere reference, out of range) are
    /// [`ExtractionError::InvalidRational`].
    pub fn decode(tags: &ExifTagSet) -> Result<Option<GpsCoordinate>, ExtractionError> {
        if !tags.contains(Axis::Latitude.value_tag()) || !tags.contains(Axis::Longitude.value_tag())
        {
            return Ok(None);
        }

        let latitude = Self::decode_axis(tags, Axis::Latitude)?;
        let longitude = Self::decode_axis(tags, Axis::Longitude)?;
        Ok(Some(GpsCoordinate {
            latitude,
            longitude,
        }))
    }

    fn decode_axis(tags: &ExifTagSet, axis: Axis) -> Result<f64, ExtractionError> {
        let invalid = |tag: &str, detail: String| ExtractionError::InvalidRational {
            tag: tag.to_string(),
            detail,
        };

        let rationals = match tags.get(axis.value_tag()) {
            Some(TagValue::Rationals(values)) => values,
            Some(_) => {
                return Err(invalid(axis.value_tag(), "value is not rational".into()));
            }
            None => return Err(invalid(axis.value_tag(), "tag is missing".into())),
        };
        if rationals.len() != COMPONENTS.len() {
            return Err(invalid(
                axis.value_tag(),
                format!("expected 3 rationals, found {}", rationals.len()),
            ));
        }

        let mut decimal = 0.0;
        for ((rational, component), scale) in rationals
            .iter()
            .zip(COMPONENTS)
            .zip([1.0, 60.0, 3600.0])
        {
            let value = rational.checked_value().ok_or_else(|| {
                invalid(
                    axis.value_tag(),
                    format!("zero denominator in {component} ({rational})"),
                )
            })?;
            decimal += value / scale;
        }

        let (positive, negative) = axis.hemispheres();
        let reference = match tags.get(axis.ref_tag()) {
            Some(TagValue::Text(text)) => text.trim().to_ascii_uppercase(),
            Some(_) => return Err(invalid(axis.ref_tag(), "reference is not text".into())),
            None => return Err(invalid(axis.ref_tag(), "reference is missing".into())),
        };
        let signed = if reference == positive {
            decimal
        } else if reference == negative {
            -decimal
        } else {
            return Err(invalid(
                axis.ref_tag(),
                format!("expected {positive} or {negative}, found {reference:?}"),
            ));
        };

        if signed.abs() > axis.limit() {
            return Err(invalid(
                axis.value_tag(),
                format!("{signed} is outside [-{0}, {0}]", axis.limit()),
            ));
        }
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rational;

    fn rationals(values: &[(u32, u32)]) -> TagValue {
        TagValue::Rationals(values.iter().map(|&(n, d)| Rational::new(n, d)).collect())
    }

    fn tag_set(lat: &[(u32, u32)], lat_ref: &str, lon: &[(u32, u32)], lon_ref: &str) -> ExifTagSet {
        [
            ("GPSLatitude".to_string(), rationals(lat)),
            ("GPSLatitudeRef".to_string(), TagValue::Text(lat_ref.into())),
            ("GPSLongitude".to_string(), rationals(lon)),
            ("GPSLongitudeRef".to_string(), TagValue::Text(lon_ref.into())),
        ]
        .into_iter()
        .collect()
    }

    const LAT: [(u32, u32); 3] = [(40, 1), (26, 1), (46, 1)];
    const LON: [(u32, u32); 3] = [(79, 1), (56, 1), (55, 1)];

    #[test]
    fn test_decodes_pittsburgh() {
        let coord = GpsDecoder::decode(&tag_set(&LAT, "N", &LON, "W"))
            .unwrap()
            .unwrap();
        assert!((coord.latitude - 40.446111).abs() < 1e-6);
        assert!((coord.longitude + 79.948611).abs() < 1e-6);

        let link = coord.map_link();
        assert!(link.starts_with("https://maps.google.com/?q=40.4461"));
        assert!(link.contains(",-79.9486"));
    }

    #[test]
    fn test_hemisphere_sign() {
        for (lat_ref, lon_ref, lat_sign, lon_sign) in [
            ("N", "E", 1.0, 1.0),
            ("S", "E", -1.0, 1.0),
            ("N", "W", 1.0, -1.0),
            ("S", "W", -1.0, -1.0),
        ] {
            let coord = GpsDecoder::decode(&tag_set(&LAT, lat_ref, &LON, lon_ref))
                .unwrap()
                .unwrap();
            assert_eq!(coord.latitude.signum(), lat_sign);
            assert_eq!(coord.longitude.signum(), lon_sign);
            assert!((coord.latitude.abs() - 40.446111).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_denominator_in_any_component() {
        for i in 0..3 {
            let mut lat = LAT;
            lat[i].1 = 0;
            let err = GpsDecoder::decode(&tag_set(&lat, "N", &LON, "W")).unwrap_err();
            assert!(
                matches!(err, ExtractionError::InvalidRational { ref tag, .. } if tag == "GPSLatitude")
            );
        }
        let mut lon = LON;
        lon[2].1 = 0;
        let err = GpsDecoder::decode(&tag_set(&LAT, "N", &lon, "W")).unwrap_err();
        assert_eq!(err.kind(), "invalid_rational");
    }

    #[test]
    fn test_missing_coordinate_is_none() {
        let mut tags = ExifTagSet::new();
        assert_eq!(GpsDecoder::decode(&tags).unwrap(), None);

        tags.insert("GPSLatitude", rationals(&LAT));
        tags.insert("GPSLatitudeRef", TagValue::Text("N".into()));
        assert_eq!(GpsDecoder::decode(&tags).unwrap(), None);
    }

    #[test]
    fn test_bad_reference_is_invalid() {
        let err = GpsDecoder::decode(&tag_set(&LAT, "X", &LON, "W")).unwrap_err();
        assert!(
            matches!(err, ExtractionError::InvalidRational { ref tag, .. } if tag == "GPSLatitudeRef")
        );

        // Latitude letters are not valid for longitude
        assert!(GpsDecoder::decode(&tag_set(&LAT, "N", &LON, "S")).is_err());

        let mut tags = tag_set(&LAT, "N", &LON, "W");
        tags.insert("GPSLongitudeRef", TagValue::Other("1".into()));
        assert!(GpsDecoder::decode(&tags).is_err());
    }

    #[test]
    fn test_missing_reference_is_invalid() {
        let tags: ExifTagSet = [
            ("GPSLatitude".to_string(), rationals(&LAT)),
            ("GPSLongitude".to_string(), rationals(&LON)),
            ("GPSLongitudeRef".to_string(), TagValue::Text("W".into())),
        ]
        .into_iter()
        .collect();
        assert!(GpsDecoder::decode(&tags).is_err());
    }

    #[test]
    fn test_wrong_count_and_type() {
        let err = GpsDecoder::decode(&tag_set(&LAT[..2], "N", &LON, "W")).unwrap_err();
        assert!(err.to_string().contains("expected 3 rationals"));

        let mut tags = tag_set(&LAT, "N", &LON, "W");
        tags.insert("GPSLongitude", TagValue::Text("79.9".into()));
        assert!(GpsDecoder::decode(&tags).is_err());
    }

    #[test]
    fn test_out_of_range() {
        let err = GpsDecoder::decode(&tag_set(&[(91, 1), (0, 1), (0, 1)], "N", &LON, "W"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidRational { .. }));
        assert!(GpsDecoder::decode(&tag_set(&LAT, "N", &[(180, 1), (0, 1), (1, 1)], "E")).is_err());
    }

    #[test]
    fn test_fractional_seconds_and_determinism() {
        let lat = [(51, 1), (30, 1), (2612, 100)];
        let tags = tag_set(&lat, "N", &[(0, 1), (7, 1), (3960, 100)], "W");
        let first = GpsDecoder::decode(&tags).unwrap().unwrap();
        let second = GpsDecoder::decode(&tags).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.map_link(), second.map_link());
        assert!((first.latitude - 51.507256).abs() < 1e-6);
        assert!((first.longitude + 0.127667).abs() < 1e-6);
    }

    #[test]
    fn test_lowercase_reference_is_accepted() {
        let coord = GpsDecoder::decode(&tag_set(&LAT, "s", &LON, " e "))
            .unwrap()
            .unwrap();
        assert!(coord.latitude < 0.0);
        assert!(coord.longitude > 0.0);
    }
}
