use serde::Serialize;

/// blake3 hash over the fixed-int [bincode] encoding of `t`
pub fn digest<T: Serialize>(t: &T) -> anyhow::Result<[u8; 32]> {
    let encoded = bincode::serde::encode_to_vec(t, bincode::config::legacy())?;
    Ok(blake3::hash(&encoded).into())
}
