//! Hex codec for `f32` embedding vectors.
//!
//! A vector is rendered as the concatenation of each component's 4-byte
//! little-endian representation, two lowercase hex digits per byte. Eight hex
//! characters per float, so a 384-dim vector is a 3072-char string.

use crate::error::{Result, VellumError};

/// Hex characters per encoded `f32`.
pub const HEX_CHARS_PER_FLOAT: usize = 8;

/// Encode a vector as lowercase little-endian hex.
///
/// Rejects NaN and infinite components, they poison similarity arithmetic.
pub fn encode(vector: &[f32]) -> Result<String> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for (i, x) in vector.iter().enumerate() {
        if !x.is_finite() {
            return Err(VellumError::Encoding(format!(
                "component {i} is not finite ({x})"
            )));
        }
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    Ok(hex::encode(bytes))
}

/// Decode a hex string into a vector of exactly `dimension` components.
pub fn decode(hex_str: &str, dimension: usize) -> Result<Vec<f32>> {
    let vector = decode_any(hex_str)?;
    if vector.len() != dimension {
        return Err(VellumError::DimensionMismatch {
            expected: dimension,
            got: vector.len(),
        });
    }
    Ok(vector)
}

/// Decode a hex string into a vector, inferring the dimension from its length.
pub fn decode_any(hex_str: &str) -> Result<Vec<f32>> {
    if hex_str.is_empty() || hex_str.len() % HEX_CHARS_PER_FLOAT != 0 {
        return Err(VellumError::Decoding(format!(
            "length {} is not a positive multiple of {HEX_CHARS_PER_FLOAT}",
            hex_str.len()
        )));
    }

    let bytes = hex::decode(hex_str).map_err(|e| VellumError::Decoding(e.to_string()))?;

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Serde adapter for `Vec<f32>` fields stored as hex strings.
///
/// ```ignore
/// #[serde(with = "crate::codec::serde_hex")]
/// embedding: Vec<f32>,
/// ```
pub mod serde_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(vector: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = super::encode(vector).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_any(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian_lowercase() {
        // 1.0f32 = 0x3f800000 -> LE bytes 00 00 80 3f
        assert_eq!(encode(&[1.0]).unwrap(), "0000803f");
        assert_eq!(encode(&[1.0, -2.0]).unwrap(), "0000803f000000c0");
    }

    #[test]
    fn empty_vector_encodes_to_empty_string() {
        assert_eq!(encode(&[]).unwrap(), "");
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(encode(&[0.0, f32::NAN]), Err(VellumError::Encoding(_))));
        assert!(matches!(encode(&[f32::INFINITY]), Err(VellumError::Encoding(_))));
        assert!(matches!(encode(&[f32::NEG_INFINITY]), Err(VellumError::Encoding(_))));
    }

    #[test]
    fn decode_rejects_bad_lengths() {
        assert!(matches!(decode_any(""), Err(VellumError::Decoding(_))));
        assert!(matches!(decode_any("0000803"), Err(VellumError::Decoding(_))));
        assert!(matches!(decode_any("0000803f00"), Err(VellumError::Decoding(_))));
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert!(matches!(decode_any("0000803g"), Err(VellumError::Decoding(_))));
        assert!(matches!(decode_any("zzzzzzzz"), Err(VellumError::Decoding(_))));
    }

    #[test]
    fn decode_accepts_uppercase() {
        assert_eq!(decode_any("0000803F").unwrap(), vec![1.0]);
    }

    #[test]
    fn decode_checks_dimension() {
        let hex = encode(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(decode(&hex, 3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            decode(&hex, 4),
            Err(VellumError::DimensionMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn round_trip_preserves_signed_zero_and_subnormals() {
        let v = vec![-0.0f32, f32::MIN_POSITIVE / 2.0, f32::MAX, f32::MIN, f32::EPSILON];
        let back = decode(&encode(&v).unwrap(), v.len()).unwrap();
        let bits: Vec<u32> = v.iter().map(|x| x.to_bits()).collect();
        let back_bits: Vec<u32> = back.iter().map(|x| x.to_bits()).collect();
        assert_eq!(bits, back_bits);
    }

    #[test]
    fn serde_adapter_round_trips() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Row {
            #[serde(with = "serde_hex")]
            embedding: Vec<f32>,
        }

        let json = serde_json::to_string(&Row {
            embedding: vec![1.0, -2.0],
        })
        .unwrap();
        assert_eq!(json, r#"{"embedding":"0000803f000000c0"}"#);

        let row: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(row.embedding, vec![1.0, -2.0]);

        assert!(serde_json::from_str::<Row>(r#"{"embedding":"abc"}"#).is_err());
    }
}
