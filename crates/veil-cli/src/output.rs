//! Colored terminal output
//!
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: &str) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    choice_from_flag(flag)
}

fn choice_from_flag(flag: &str) -> ColorChoice {
    match flag {
        "always" => ColorChoice::Always,
        "never" => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Write `label` in bold `color`, then the rest of the line uncolored
pub fn status(out: &mut dyn WriteColor, label: &str, color: Color, text: &str) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color)).set_bold(true);
    out.set_color(&spec)?;
    write!(out, "{:>10}", label)?;
    out.reset()?;
    writeln!(out, " {}", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    #[test]
    fn test_flag_choice() {
        assert_eq!(choice_from_flag("always"), ColorChoice::Always);
        assert_eq!(choice_from_flag("never"), ColorChoice::Never);
        assert_eq!(choice_from_flag("auto"), ColorChoice::Auto);
    }

    #[test]
    fn test_status_alignment() {
        let mut out = NoColor::new(Vec::new());
        status(&mut out, "Loaded", Color::Green, "demo.$Proxy0").unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "    Loaded demo.$Proxy0\n");
    }
}
