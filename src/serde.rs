use std::io::Write;

use serde::Serialize;

/// Encode an arbitrary serializable value into a writer.
pub fn encode_writer<T: Serialize + ?Sized, W: Write>(w: &mut W, val: &T) {
    rmp_serde::encode::write(w, val).expect("failed to encode value");
}

/// Serialize a scalar as 32 big endian bytes, rejecting anything above the order.
pub mod scalar_bytes {
    use k256::Scalar;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::curve;

    pub fn serialize<S: Serializer>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(curve::scalar_to_bytes(scalar))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scalar, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| D::Error::custom("scalar must be 32 bytes"))?;
        curve::scalar_from_bytes(&bytes).ok_or_else(|| D::Error::custom("scalar out of range"))
    }
}

/// Like [scalar_bytes], but for a list of scalars.
pub mod scalar_vec {
    use k256::Scalar;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::curve;

    pub fn serialize<S: Serializer>(scalars: &[Scalar], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(scalars.iter().map(|s| curve::scalar_to_bytes(s).to_vec()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Scalar>, D::Error> {
        let list = Vec::<Vec<u8>>::deserialize(deserializer)?;
        list.into_iter()
            .map(|bytes| {
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| D::Error::custom("scalar must be 32 bytes"))?;
                curve::scalar_from_bytes(&bytes)
                    .ok_or_else(|| D::Error::custom("scalar out of range"))
            })
            .collect()
    }
}
