use anyhow::anyhow;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for digesting an object which stores digest in the object itself
pub trait DigestInSelf {
    fn digest(&mut self) -> anyhow::Result<()>;
    fn verify_digest(&mut self) -> anyhow::Result<bool>;
}

/// Trait for on-disk records with a fixed-width little endian encoding
/// # Note
/// This trait is implemented for records whose fields are all fixed-size,
/// so that [bincode]'s legacy config (fixed int encoding) gives every value
/// of the type the same encoded length
pub trait FixedLayout: Serialize + DeserializeOwned {
    /// encode into the front of `buf`
    /// # Returns
    /// The number of bytes written if successful
    fn encode_into(&self, buf: &mut [u8]) -> anyhow::Result<usize> {
        let config = bincode::config::legacy();
        let encoded = bincode::serde::encode_to_vec(self, config)?;
        let available = buf.len();
        let target = buf.get_mut(..encoded.len()).ok_or_else(|| {
            anyhow!(
                "record needs {} bytes, only {} available",
                encoded.len(),
                available
            )
        })?;
        target.copy_from_slice(&encoded);
        Ok(encoded.len())
    }

    /// decode from the front of `buf`
    /// # Returns
    /// The decoded record and the number of bytes it occupied
    fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        let config = bincode::config::legacy();
        let (object, bytes_read): (Self, usize) = bincode::serde::decode_from_slice(buf, config)?;
        Ok((object, bytes_read))
    }

    /// length of the encoded form
    fn encoded_len(&self) -> anyhow::Result<usize> {
        let config = bincode::config::legacy();
        Ok(bincode::serde::encode_to_vec(self, config)?.len())
    }
}
