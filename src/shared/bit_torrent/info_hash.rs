//! `BitTorrent` Info Hash v1: the 20-byte SHA-1 digest that identifies a
//! torrent and keys a swarm in the peer store.
use std::panic::Location;

use thiserror::Error;

/// `BitTorrent` Info Hash v1
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

pub const INFO_HASH_BYTES_LEN: usize = 20;

impl InfoHash {
    /// Returns the `InfoHash` internal byte array.
    #[must_use]
    pub fn bytes(&self) -> [u8; 20] {
        self.0
    }

    /// Returns the `InfoHash` as a hex string.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; 40];
        binascii::bin2hex(&self.0, &mut chars).expect("failed to hexlify");
        write!(f, "{}", std::str::from_utf8(&chars).unwrap())
    }
}

impl std::str::FromStr for InfoHash {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut i = Self::default();
        if s.len() != 40 {
            return Err(binascii::ConvertError::InvalidInputLength);
        }
        binascii::hex2bin(s.as_bytes(), &mut i.0)?;
        Ok(i)
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Errors that can occur when converting from a `Vec<u8>` to an `InfoHash`.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Not enough bytes for infohash. An infohash is 20 bytes.
    #[error("not enough bytes for infohash: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    /// Too many bytes for infohash. An infohash is 20 bytes.
    #[error("too many bytes for infohash: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl TryFrom<Vec<u8>> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        InfoHash::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < INFO_HASH_BYTES_LEN {
            return Err(ConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN},
            });
        }
        if bytes.len() > INFO_HASH_BYTES_LEN {
            return Err(ConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN},
            });
        }
        let mut data = [0u8; INFO_HASH_BYTES_LEN];
        data.copy_from_slice(bytes);
        Ok(Self(data))
    }
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buffer = [0u8; 40];
        let bytes_out = binascii::bin2hex(&self.0, &mut buffer).ok().unwrap();
        let str_out = std::str::from_utf8(bytes_out).unwrap();
        serializer.serialize_str(str_out)
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl serde::de::Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 character long hash")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.len() != 40 {
            return Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(v),
                &"a 40 character long string",
            ));
        }

        let mut res = InfoHash::default();

        if binascii::hex2bin(v.as_bytes(), &mut res.0).is_err() {
            return Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(v),
                &"a hexadecimal string",
            ));
        };
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InfoHash;

    #[test]
    fn it_should_be_parsed_from_a_40_char_hex_string() {
        let info_hash = InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap();
        assert_eq!(info_hash.to_string(), "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0");
    }

    #[test]
    fn it_should_reject_strings_that_are_not_40_chars_long() {
        assert!(InfoHash::from_str("3b2455").is_err());
    }

    #[test]
    fn it_should_reject_non_hex_strings() {
        assert!(InfoHash::from_str("ZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZ").is_err());
    }

    #[test]
    fn it_should_be_converted_from_a_20_byte_slice() {
        let info_hash = InfoHash::try_from([255u8; 20].to_vec()).unwrap();
        assert_eq!(info_hash, InfoHash([255u8; 20]));
    }

    #[test]
    fn it_should_fail_converting_from_a_slice_with_the_wrong_length() {
        assert!(InfoHash::try_from([255u8; 19].to_vec()).is_err());
        assert!(InfoHash::try_from([255u8; 21].to_vec()).is_err());
    }

    #[test]
    fn it_should_be_serialized_as_a_hex_string() {
        let info_hash = InfoHash([0x69; 20]);
        assert_eq!(
            serde_json::to_string(&info_hash).unwrap(),
            "\"6969696969696969696969696969696969696969\""
        );
    }

    #[test]
    fn it_should_be_deserialized_from_a_hex_string() {
        let info_hash: InfoHash = serde_json::from_str("\"6969696969696969696969696969696969696969\"").unwrap();
        assert_eq!(info_hash, InfoHash([0x69; 20]));
    }
}
