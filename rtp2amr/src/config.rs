use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgMatches, Command};

use rtp_amr::AmrVariant;

/// Run configuration, fixed once the command line is parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub variant: AmrVariant,
}

pub fn cli() -> Command {
    Command::new("rtp2amr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract RTP AMR NB or WB bandwidth-efficient payloads into an AMR storage file")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("rtpdump file, or one colon separated hex RTP payload per line"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Output AMR storage file"),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .value_parser(["nb", "wb"])
                .required(true)
                .help("AMR NB(nb) or WB(wb)"),
        )
}

impl Config {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let input = args
            .get_one::<PathBuf>("input")
            .ok_or_else(|| anyhow!("Missing input path"))?;
        let output = args
            .get_one::<PathBuf>("output")
            .ok_or_else(|| anyhow!("Missing output path"))?;
        let variant = args
            .get_one::<String>("type")
            .ok_or_else(|| anyhow!("Missing AMR type"))?
            .parse::<AmrVariant>()?;

        Ok(Self {
            input: input.clone(),
            output: output.clone(),
            variant,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_from_matches() {
        let args = cli()
            .try_get_matches_from(["rtp2amr", "-i", "call.rtpdump", "-o", "call.awb", "-t", "wb"])
            .unwrap();
        let config = Config::from_matches(&args).unwrap();
        assert_eq!(config.input, PathBuf::from("call.rtpdump"));
        assert_eq!(config.output, PathBuf::from("call.awb"));
        assert_eq!(config.variant, AmrVariant::WideBand);
    }

    #[test]
    fn test_rejected_args() {
        assert!(cli()
            .try_get_matches_from(["rtp2amr", "-i", "a", "-o", "b"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["rtp2amr", "-i", "a", "-o", "b", "-t", "evs"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["rtp2amr", "-o", "b", "-t", "nb"])
            .is_err());
    }
}
