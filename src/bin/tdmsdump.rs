use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tdmsdump::dump::{self, DumpConfig};

/// Print every sample of one TDMS channel, one `%5.4f` formatted value per line
#[derive(Parser, Debug)]
#[command(name = "tdmsdump", version)]
struct Opts {
    /// Path to the TDMS file to read
    file: PathBuf,

    /// Name of the group holding the channel
    group: String,

    /// Name of the channel to print
    channel: String,
}

impl From<Opts> for DumpConfig {
    fn from(opts: Opts) -> Self {
        DumpConfig {
            path: opts.file,
            group: opts.group,
            channel: opts.channel,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = DumpConfig::from(Opts::parse());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match dump::run(&config, &mut out) {
        Ok(written) => {
            debug!("wrote {} samples", written);
            Ok(())
        }
        Err(e) if e.is_broken_pipe() => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!(
                "unable to dump /'{}'/'{}' from {}",
                config.group,
                config.channel,
                config.path.display()
            )
        }),
    }
}
