//! `veil surface`: list the methods a proxy would forward

use std::io::Write;

use veil_engine::proxy::{MethodSurface, ResolvedTarget};

use super::TargetArgs;

pub fn execute(args: &TargetArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let (universe, target) = args.load()?;
    let resolved = target.resolve(&universe)?;
    let surface = MethodSurface::collect(&universe, &resolved);

    let shape = match &resolved {
        ResolvedTarget::Interfaces(_) => "interfaces",
        ResolvedTarget::Subclass(_) => "subclass",
        ResolvedTarget::Sealed(_) => "sealed",
    };
    writeln!(out, "# {} ({} methods)", shape, surface.len())?;
    for method in surface.iter() {
        writeln!(
            out,
            "{} {}.{}",
            method.return_type,
            method.declaring_type,
            method.overload_key()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_lists_interface_methods() {
        let dir = tempfile::tempdir().unwrap();
        let args = TargetArgs {
            types: fixtures::types_file(&dir),
            class: false,
            targets: vec!["demo.Subject".to_string()],
        };
        let mut out = Vec::new();
        execute(&args, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# interfaces (3 methods)\n\
             void demo.Subject.doOperation()\n\
             void demo.Subject.doOperation(String)\n\
             int demo.Subject.count()\n"
        );
    }

    #[test]
    fn test_sealed_shape() {
        let dir = tempfile::tempdir().unwrap();
        let args = TargetArgs {
            types: fixtures::types_file(&dir),
            class: true,
            targets: vec!["demo.Sealed".to_string()],
        };
        let mut out = Vec::new();
        execute(&args, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("# sealed (1 methods)\n"));
    }
}
