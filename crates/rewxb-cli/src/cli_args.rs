//! CLI argument definitions for the rewxb command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// rewxb - Resample every wave in an XACT wave bank
#[derive(Parser, Debug)]
#[command(name = "rewxb")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Wave bank to read (.xwb)
    #[arg(value_name = "INFILE")]
    pub infile: PathBuf,

    /// Wave bank to write; must differ from INFILE
    #[arg(value_name = "OUTFILE", required_unless_present = "inspect")]
    pub outfile: Option<PathBuf>,

    /// Target sample rate in Hz
    #[arg(value_name = "RATE", required_unless_present = "inspect")]
    pub rate: Option<u32>,

    /// Decode MS-ADPCM entries to 16-bit PCM
    #[arg(short = 'f', long)]
    pub force_pcm: bool,

    /// Collapse multi-channel entries to mono
    #[arg(short = 'm', long)]
    pub mono: bool,

    /// Print progress as integer percentages, one per line
    #[arg(short = 'p', long)]
    pub percentage: bool,

    /// Output machine-readable JSON (no colored output)
    #[arg(long)]
    pub json: bool,

    /// Log run milestones to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Decode and describe INFILE without writing anything
    #[arg(long)]
    pub inspect: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_rewrite() {
        let cli = Cli::try_parse_from(["rewxb", "in.xwb", "out.xwb", "22050", "-f", "-m"]).unwrap();
        assert_eq!(cli.infile, PathBuf::from("in.xwb"));
        assert_eq!(cli.outfile, Some(PathBuf::from("out.xwb")));
        assert_eq!(cli.rate, Some(22050));
        assert!(cli.force_pcm);
        assert!(cli.mono);
        assert!(!cli.percentage);
        assert!(!cli.inspect);
    }

    #[test]
    fn test_cli_parses_long_flags() {
        let cli = Cli::try_parse_from([
            "rewxb",
            "in.xwb",
            "out.xwb",
            "11025",
            "--percentage",
            "--json",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.percentage);
        assert!(cli.json);
        assert!(cli.verbose);
        assert!(!cli.force_pcm);
    }

    #[test]
    fn test_cli_requires_outfile_and_rate() {
        assert!(Cli::try_parse_from(["rewxb", "in.xwb"]).is_err());
        assert!(Cli::try_parse_from(["rewxb", "in.xwb", "out.xwb"]).is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_rate() {
        let err = Cli::try_parse_from(["rewxb", "in.xwb", "out.xwb", "fast"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("RATE"));
    }

    #[test]
    fn test_cli_inspect_needs_only_infile() {
        let cli = Cli::try_parse_from(["rewxb", "--inspect", "in.xwb"]).unwrap();
        assert!(cli.inspect);
        assert_eq!(cli.outfile, None);
        assert_eq!(cli.rate, None);
    }
}
