//! `lumen inspect`: decode a serialized program and print it.

use std::path::Path;

use lumen_cache::decode_artifact;
use lumen_ir::{ProgramPrinter, TypeDb};

use crate::{GlobalArgs, InspectArgs};

/// Reads `path` and returns the IR payload it holds.
///
/// Cache artifacts are unwrapped (and decompressed); anything else is taken
/// to be a raw buffer.
pub fn read_payload(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let raw = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    match decode_artifact(&raw) {
        Some(payload) => {
            log::debug!("{} is a cache artifact", path.display());
            Ok(payload)
        }
        None => Ok(raw),
    }
}

/// Runs the `lumen inspect` command. Returns exit code 0 on success.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let payload = read_payload(&args.file)?;
    let mut types = TypeDb::new();
    let program = lumen_serialize::deserialize(&payload, &mut types)
        .map_err(|e| format!("{}: {e}", args.file.display()))?;

    if args.summary {
        println!("name: {}", program.name.as_deref().unwrap_or("<unnamed>"));
        println!("stage: {:?}", program.info.stage);
        println!("functions: {}", program.function_order.len());
        println!("blocks: {}", program.blocks.len());
        println!("instructions: {}", program.instruction_count());
        println!("values: {}", program.values.len());
        println!("variables: {}", program.variables.len());
    } else {
        print!("{}", ProgramPrinter::new(&program, &types));
    }

    if !global.quiet {
        eprintln!(
            "   Decoded {} ({} bytes, {} objects)",
            args.file.display(),
            payload.len(),
            lumen_serialize::object_count(&payload).unwrap_or(0)
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_cache::ArtifactStore;

    #[test]
    fn raw_buffer_passes_through() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("raw.bin");
        std::fs::write(&path, [1, 2, 3]).unwrap();
        assert_eq!(read_payload(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn artifact_is_unwrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store
            .write_artifact("ir", "lir", "k", &[9; 64], "0.1.0", true)
            .unwrap();
        let payload = read_payload(&store.artifact_path("ir", "k", "lir")).unwrap();
        assert_eq!(payload, vec![9; 64]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_payload(&tmp.path().join("gone.bin")).unwrap_err();
        assert!(err.to_string().contains("gone.bin"), "{err}");
    }
}
