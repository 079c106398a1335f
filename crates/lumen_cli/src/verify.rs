//! `lumen verify`: check that a serialized program survives a
//! decode/encode cycle.

use lumen_ir::{equivalent, TypeDb};
use lumen_serialize::{deserialize, serialize};

use crate::inspect::read_payload;
use crate::{GlobalArgs, VerifyArgs};

/// Outcome of checking one payload.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Re-encoding reproduced the payload and the programs are equivalent.
    Stable {
        /// Objects in the identity table.
        objects: u64,
    },
    /// Re-encoding produced different bytes.
    BytesDiffer {
        /// First differing offset, or the shorter length.
        offset: usize,
    },
    /// The bytes matched but the decoded programs differ.
    NotEquivalent(String),
}

/// Decodes `payload`, re-encodes it and decodes the result again.
///
/// Decode and encode failures are returned as errors; a payload that
/// decodes but does not reproduce itself yields a failing [`Verdict`].
pub fn check(payload: &[u8]) -> Result<Verdict, Box<dyn std::error::Error>> {
    let mut types = TypeDb::new();
    let first = deserialize(payload, &mut types)?;
    let encoded = serialize(&first, &types)?;
    if encoded != payload {
        let offset = encoded
            .iter()
            .zip(payload)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| encoded.len().min(payload.len()));
        return Ok(Verdict::BytesDiffer { offset });
    }

    let second = deserialize(&encoded, &mut types)?;
    if let Err(divergence) = equivalent(&first, &second) {
        return Ok(Verdict::NotEquivalent(divergence.to_string()));
    }
    Ok(Verdict::Stable {
        objects: lumen_serialize::object_count(payload).unwrap_or(0),
    })
}

/// Runs the `lumen verify` command.
///
/// Returns exit code 0 if the payload is stable, 1 otherwise.
pub fn run(args: &VerifyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let payload = read_payload(&args.file)?;
    let verdict = check(&payload).map_err(|e| format!("{}: {e}", args.file.display()))?;
    match verdict {
        Verdict::Stable { objects } => {
            if !global.quiet {
                eprintln!(
                    "   Verified {} ({} bytes, {objects} objects)",
                    args.file.display(),
                    payload.len()
                );
            }
            Ok(0)
        }
        Verdict::BytesDiffer { offset } => {
            eprintln!(
                "error: {}: re-encoding differs from the input at byte {offset}",
                args.file.display()
            );
            Ok(1)
        }
        Verdict::NotEquivalent(reason) => {
            eprintln!("error: {}: decoded programs differ: {reason}", args.file.display());
            Ok(1)
        }
    }
}
