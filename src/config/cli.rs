use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "blob-lister")]
#[command(about = "List the blobs of every storage account container in a YAML config")]
pub struct CliArgs {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Stop at the first account that fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Dry run - show accounts and containers without calling the service
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_arguments() {
        let args = CliArgs::parse_from(["blob-lister"]);
        assert_eq!(args.config, "config.yaml");
        assert!(!args.verbose);
        assert!(!args.fail_fast);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_explicit_arguments() {
        let args = CliArgs::parse_from([
            "blob-lister",
            "-c",
            "prod.yaml",
            "--verbose",
            "--fail-fast",
            "--dry-run",
            "--log-json",
        ]);
        assert_eq!(args.config, "prod.yaml");
        assert!(args.verbose && args.fail_fast && args.dry_run && args.log_json);
    }
}
