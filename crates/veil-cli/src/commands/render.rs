//! `veil render`: print or write the synthesized proxy source

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use veil_engine::proxy::dump::dump_source;
use veil_engine::ProxyFactory;

use super::TargetArgs;

pub fn execute(args: &TargetArgs, out_dir: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    let (universe, target) = args.load()?;
    let (_, unit) = ProxyFactory::new(&universe).render(&target)?;

    match out_dir {
        Some(dir) => {
            let path = dump_source(dir, &unit)
                .with_context(|| format!("cannot write {} to {}", unit.file_name, dir.display()))?;
            writeln!(out, "{}", path.display())?;
        }
        None => out.write_all(unit.source.as_bytes())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    fn subject_args(dir: &tempfile::TempDir) -> TargetArgs {
        TargetArgs {
            types: fixtures::types_file(dir),
            class: false,
            targets: vec!["demo.Subject".to_string()],
        }
    }

    #[test]
    fn test_render_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        execute(&subject_args(&dir), None, &mut out).unwrap();
        let source = String::from_utf8(out).unwrap();
        assert!(source.starts_with("package demo;\n"));
        assert!(source.contains("extends veil.ProxyBase implements demo.Subject {"));
    }

    #[test]
    fn test_render_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("generated");
        let mut out = Vec::new();
        execute(&subject_args(&dir), Some(&target), &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        let path = Path::new(printed.trim_end());
        assert!(path.starts_with(&target));
        assert!(std::fs::read_to_string(path).unwrap().contains("Method.find(\"demo.Subject\""));
    }
}
