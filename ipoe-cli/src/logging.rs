//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set. Otherwise `-v` raises the level: warnings plus
//! relay events by default, then info, debug and trace everywhere.

use tracing_subscriber::EnvFilter;

const QUIET: &str = "warn,ipoe_relay=info,ipoe_capture=info,ipoe_cli=info";

fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => QUIET,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directives(0), QUIET);
        assert_eq!(default_directives(1), "info");
        assert_eq!(default_directives(2), "debug");
        assert_eq!(default_directives(7), "trace");
    }

    #[test]
    fn test_directives_parse() {
        for verbose in 0..4 {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }
}
