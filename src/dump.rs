use crate::{DumpError, TdmsError, TdmsFile};
use log::debug;
use std::io::Write;
use std::path::PathBuf;

/// `DumpConfig` selects the recording and the channel `run` prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    pub path: PathBuf,
    pub group: String,
    pub channel: String,
}

/// formats a sample the way `printf("%5.4f")` does: four fractional digits, right aligned in a
/// field at least five characters wide
pub fn format_sample(value: f64) -> String {
    if value.is_nan() {
        format!("{:>5}", "nan")
    } else if value.is_infinite() {
        format!("{:>5}", if value > 0.0 { "inf" } else { "-inf" })
    } else {
        format!("{:5.4}", value)
    }
}

/// writes one formatted line per sample, in order, and returns how many were written. Stops at the
/// first sample that couldn't be read.
pub fn write_samples<I, W>(samples: I, out: &mut W) -> Result<u64, DumpError>
where
    I: IntoIterator<Item = Result<f64, TdmsError>>,
    W: Write,
{
    let mut written: u64 = 0;

    for sample in samples {
        writeln!(out, "{}", format_sample(sample?)).map_err(DumpError::Write)?;
        written += 1;
    }

    Ok(written)
}

/// opens the configured recording and prints every sample of the configured channel to `out`
pub fn run<W: Write>(config: &DumpConfig, out: &mut W) -> Result<u64, DumpError> {
    let mut file = TdmsFile::open(&config.path)?;
    let samples = file.samples(&config.group, &config.channel)?;
    debug!(
        "dumping {} samples of /'{}'/'{}'",
        samples.len(),
        config.group,
        config.channel
    );

    let written = write_samples(samples, out)?;
    out.flush().map_err(DumpError::Write)?;

    Ok(written)
}
