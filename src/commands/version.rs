//! Command: print version information.
use std::io::Write;

/// The build version: `STRATA_VERSION` at build time, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("STRATA_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the strata version to `out`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn run(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "strata {}", version())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prints_name_and_version() {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("strata "));
        assert!(text.trim_end().len() > "strata ".len());
    }
}
