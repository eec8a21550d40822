use std::fmt;

use serde::de::{self, Deserializer, Visitor};

/// Deserializes a text field that may have been written as a bare scalar,
/// so `token: 1234` or `prefix: 2024` load as strings.
pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrScalar;

    impl<'de> Visitor<'de> for StringOrScalar {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrScalar)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "super::string")]
        value: String,
    }

    fn load(yaml: &str) -> String {
        serde_yaml::from_str::<Wrapper>(yaml).unwrap().value
    }

    #[test]
    fn scalars_load_as_text() {
        assert_eq!(load("value: Private"), "Private");
        assert_eq!(load("value: 2024"), "2024");
        assert_eq!(load("value: -7"), "-7");
        assert_eq!(load("value: 1.5"), "1.5");
        assert_eq!(load("value: true"), "true");
        assert_eq!(load("value: '0042'"), "0042");
    }

    #[test]
    fn null_and_missing_are_empty() {
        assert_eq!(load("value: ~"), "");
        assert_eq!(load("{}"), "");
    }

    #[test]
    fn rejects_collections() {
        assert!(serde_yaml::from_str::<Wrapper>("value: [a, b]").is_err());
    }
}
