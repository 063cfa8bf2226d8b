use crate::data_type::TdmsDataType;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
/// A set of library specific errors.
pub enum TdmsError {
    #[error("{0}")]
    ReadError(#[from] io::Error),

    #[error("error while reading .tdms file {0}")]
    General(String),

    #[error("invalid segment - malformed or missing lead-in tag")]
    InvalidSegment(),

    #[error("unable to convert to String: {0}")]
    StringConversionError(String),

    #[error("unknown data type {0:#x}")]
    UnknownDataType(u32),

    #[error("invalid DAQmx data index")]
    InvalidDAQmxDataIndex(),

    #[error("invalid raw data index for {0}, its sizes overflow or contradict each other")]
    InvalidRawDataIndex(String),

    #[error("invalid object path {0}")]
    InvalidObjectPath(String),

    #[error("segment {0} reuses earlier metadata but there is no previous segment")]
    MissingPreviousSegment(usize),

    #[error("segment {segment} has {data_size} bytes of raw data, not a multiple of the {chunk_size} byte chunk")]
    ChunkSizeMismatch {
        segment: usize,
        data_size: u64,
        chunk_size: u64,
    },

    #[error("object {path} changed data type from {previous:?} to {current:?}")]
    DataTypeMismatch {
        path: String,
        previous: TdmsDataType,
        current: TdmsDataType,
    },

    #[error("group '{0}' does not exist")]
    GroupDoesNotExist(String),

    #[error("channel '{1}' does not exist in group '{0}'")]
    ChannelDoesNotExist(String, String),

    #[error("channel holds {stored:?} values, requested {requested}")]
    ChannelTypeMismatch {
        stored: TdmsDataType,
        requested: &'static str,
    },

    #[error("reading {0:?} values is not supported")]
    UnsupportedDataType(TdmsDataType),
}

#[derive(Error, Debug)]
/// Errors from dumping a channel, separating failures to read the recording from failures to
/// write the output.
pub enum DumpError {
    #[error(transparent)]
    Tdms(#[from] TdmsError),

    #[error("unable to write sample: {0}")]
    Write(#[source] io::Error),
}

impl DumpError {
    /// true when the reader of our output went away, e.g. `tdmsdump ... | head`
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, DumpError::Write(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}
