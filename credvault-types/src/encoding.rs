//! Canonical byte encoding for persisted shapes.
//!
//! Raw bytes in memory, standard base64 strings on the wire. All
//! conversion happens in these serde helpers; the rest of the codebase
//! only ever sees `Vec<u8>`.

/// Serde helper for `Vec<u8>` fields transported as base64 strings.
pub mod base64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for `Option<Vec<u8>>` fields transported as base64 strings.
pub mod base64_opt {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) => STANDARD
                .decode(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wire {
        #[serde(with = "super::base64")]
        iv: Vec<u8>,
        #[serde(with = "super::base64_opt")]
        field: Option<Vec<u8>>,
    }

    #[test]
    fn bytes_travel_as_base64_strings() {
        let wire = Wire {
            iv: vec![0, 1, 2, 255],
            field: Some(vec![0xAB; 4]),
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"AAEC/w==\""));
        assert_eq!(serde_json::from_str::<Wire>(&json).unwrap(), wire);
    }

    #[test]
    fn absent_optional_field_is_null() {
        let wire = Wire {
            iv: vec![1],
            field: None,
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"field\":null"));
        assert_eq!(serde_json::from_str::<Wire>(&json).unwrap(), wire);
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let json = r#"{"iv":"not base64!!","field":null}"#;
        assert!(serde_json::from_str::<Wire>(json).is_err());
    }
}
