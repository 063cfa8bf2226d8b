use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use log::LevelFilter;
use std::path::PathBuf;
use tdmsdump::data_type::TdmsDataType;
use tdmsdump::object_path::ObjectPath;
use tdmsdump::segment::Endianness;
use tdmsdump::{TdmsFile, TdmsObject};

/// Displays TDMS file metadata
#[derive(Parser, Debug)]
#[command(name = "tdmsinfo", version)]
struct Opts {
    /// TDMS files to read
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print object properties
    #[arg(short, long)]
    properties: bool,

    /// Read every segment's raw data and summarize the chunks found per channel
    #[arg(short, long)]
    chunks: bool,

    /// Print debugging information to stderr
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    for path in &opts.files {
        if opts.files.len() > 1 {
            println!("{}:", path.display());
        }

        let mut file = TdmsFile::open(path)
            .with_context(|| format!("error reading TDMS file {}", path.display()))?;

        println!("{} segments parsed", file.segments.len());

        for object in file.objects() {
            print_object(object, opts.properties);
        }

        if opts.chunks {
            print_chunks(&mut file)
                .with_context(|| format!("error reading raw data of {}", path.display()))?;
        }
    }

    Ok(())
}

fn print_object(object: &TdmsObject, properties: bool) {
    println!("{}", object.path);

    if properties {
        for (name, value) in &object.properties {
            println!("  {}: {}", name, value);
        }
    }

    if let Some(data_type) = object.data_type {
        println!(
            "{} values present ({} bytes, {})",
            object.number_of_values,
            object.bytes,
            data_type.name()
        );
    }
}

#[derive(Default)]
struct ChunkSummary {
    chunks: u64,
    values: u64,
    bytes: u64,
}

fn print_chunks<R: std::io::Read + std::io::Seek>(file: &mut TdmsFile<R>) -> Result<()> {
    for index in 0..file.segments.len() {
        let mut summary: IndexMap<ObjectPath, ChunkSummary> = IndexMap::new();

        let mut listener =
            |path: &ObjectPath, _: TdmsDataType, raw: &[u8], values: u64, _: Endianness| {
                let entry = summary.entry(path.clone()).or_default();
                entry.chunks += 1;
                entry.values += values;
                entry.bytes += raw.len() as u64;
            };

        file.load_segment(index, &mut listener)?;

        println!("segment {}", index);
        for (path, s) in &summary {
            println!(
                "  {}: {} values in {} chunks ({} bytes)",
                path, s.values, s.chunks, s.bytes
            );
        }
    }

    Ok(())
}
