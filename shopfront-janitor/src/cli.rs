use clap::Parser;

/// Removes uploaded product images that no product references
#[derive(Debug, Parser)]
#[command(name = "shopfront-janitor", version, long_about = None)]
pub struct Cli {
    /// Run a single sweep and exit instead of sweeping on an interval
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_interval_mode() {
        let cli = Cli::try_parse_from(["shopfront-janitor"]).unwrap();
        assert!(!cli.once);
    }

    #[test]
    fn test_once_flag() {
        let cli = Cli::try_parse_from(["shopfront-janitor", "--once"]).unwrap();
        assert!(cli.once);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["shopfront-janitor", "--onse"]).is_err());
    }
}
