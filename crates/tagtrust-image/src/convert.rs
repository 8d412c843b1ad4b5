//! Mapping from trust metadata records to [`Target`]s.

use tagtrust_core::types::SHA256;
use tagtrust_core::{Digest, Error, Result, Target, TargetRecord};

/// Convert a signed target record into a [`Target`].
///
/// Only the sha256 hash is consulted; records without one are rejected
/// whatever other hashes they carry.
pub fn convert_target(record: &TargetRecord) -> Result<Target> {
    let hash = record.hashes.get(SHA256).ok_or(Error::UnsupportedHash)?;
    let digest = Digest::from_sha256_bytes(hash)?;
    Ok(Target::new(record.name.clone(), digest, record.length))
}
