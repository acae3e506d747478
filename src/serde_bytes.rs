//! Serde helpers for byte fields
//!
//! Byte payloads cross the JSON boundary as lowercase hex strings.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize [u8; 32] as hex string
pub mod hex32 {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// Transaction ids: stored in internal byte order, written in the
/// reversed order block explorers display.
pub mod txid {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut display = *bytes;
        display.reverse();
        serializer.serialize_str(&hex::encode(display))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut bytes = hex32::deserialize(deserializer)?;
        bytes.reverse();
        Ok(bytes)
    }
}

/// Serialize/deserialize Vec<u8> as hex string
pub mod hex_vec {
    use super::*;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// Serialize/deserialize Vec<Vec<u8>> as a list of hex strings
pub mod hex_vec_list {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&hex::encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<String>::deserialize(deserializer)?;
        items
            .iter()
            .map(|s| hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        #[serde(with = "super::txid")]
        id: [u8; 32],
        #[serde(with = "super::hex_vec")]
        data: Vec<u8>,
    }

    #[test]
    fn test_txid_is_reversed_on_the_wire() {
        let mut id = [0u8; 32];
        id[0] = 0xab;
        let sample = Sample { id, data: vec![0x01, 0x02] };

        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains(&format!("{}ab", "00".repeat(31))));
        assert!(json.contains("\"0102\""));

        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_hex_vec_accepts_prefix() {
        let json = format!(r#"{{"id":"{}","data":"0xdead"}}"#, "00".repeat(32));
        let sample: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.data, vec![0xde, 0xad]);
    }
}
