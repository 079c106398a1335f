//! `lumen cache`: report on and clean the project's IR cache.

use lumen_cache::IrCache;
use lumen_serialize::SerializeOptions;

use crate::project::{resolve_project, Project};
use crate::{CacheAction, GlobalArgs, LUMEN_VERSION};

/// Opens the cache configured for `project`.
pub fn open_cache(project: &Project) -> IrCache {
    let options = SerializeOptions {
        strip: project.config.serialize.strip,
    };
    IrCache::open(&project.cache_dir(), &project.config.cache, LUMEN_VERSION)
        .with_serialize_options(options)
}

/// Runs a `lumen cache` subcommand. Returns exit code 0 on success.
pub fn run(action: CacheAction, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let cache = open_cache(&project);

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("cache: {}", project.cache_dir().display());
            println!("entries: {}", stats.entries);
            println!("payload bytes: {}", stats.payload_bytes);
            println!("objects: {}", stats.objects);
            println!("functions: {}", stats.functions);
            if global.verbose {
                for (key, entry) in &cache.index().entries {
                    println!(
                        "  {key} {} ({} bytes)",
                        entry.program_name.as_deref().unwrap_or("<unnamed>"),
                        entry.payload_size
                    );
                }
            }
        }
        CacheAction::Gc => {
            let removed = cache.gc()?;
            if !global.quiet {
                eprintln!("   Removed {removed} stale artifact(s)");
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_config::LumenConfig;
    use lumen_ir::{BodyBuilder, Function, JumpKind, ModuleInfo, Program, TypeDb};

    fn project(root: &std::path::Path) -> Project {
        Project {
            root: root.to_path_buf(),
            config: LumenConfig::default(),
        }
    }

    #[test]
    fn open_cache_uses_project_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path());
        let mut cache = open_cache(&project);

        let mut program = Program::new(ModuleInfo::default());
        let main = program.declare_function(Function::declare("main", Vec::new(), None));
        let mut b = BodyBuilder::new(&mut program, main);
        let block = b.block();
        b.jump(block, JumpKind::Return);
        b.finish().unwrap();

        let key = cache.key_for(b"src");
        cache.store(&key, &program, &TypeDb::new()).unwrap();
        cache.save().unwrap();
        assert!(tmp.path().join(".lumen-cache").join("index.json").is_file());
        assert_eq!(open_cache(&project).stats().entries, 1);
    }

    #[test]
    fn stats_on_empty_project() {
        let tmp = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(tmp.path().display().to_string()),
        };
        assert_eq!(run(CacheAction::Stats, &global).unwrap(), 0);
        assert_eq!(run(CacheAction::Gc, &global).unwrap(), 0);
    }
}
