//! A Rust library for reading LabVIEW TDMS recordings, and the `tdmsdump` tool built on it.
//!
//! `tdmsdump` opens a TDMS file, looks up a single channel by its group and channel name, and
//! prints every sample of it. The library underneath indexes every segment of the file up front
//! (metadata only) and then reads raw channel data lazily from disk.
//!
//! ### Features
//! - Read both standard and big endian encoded files
//! - Contiguous and interleaved raw data
//! - Metadata inherited across segments, including incremental object lists
//! - Typed channel iterators for every fixed width TDMS type, string channels, and `f64`
//!   widening for any numeric channel
//! - Raw data listeners receiving each segment's chunks
//! - Logging using the `log` api - users of the library must choose and initialize the
//!   implementation, such as `env-logger`
//!
//! DAQmx raw data indices are parsed and reported but their values are not decoded.
//!
//! ## Usage
//!
//! ```no_run
//! use tdmsdump::TdmsFile;
//!
//! fn main() -> Result<(), tdmsdump::TdmsError> {
//!     let mut file = TdmsFile::open("recording.tdms")?;
//!
//!     for sample in file.samples("Intellivue", "CmpndECG(I)")? {
//!         println!("{:5.4}", sample?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! More information about the TDMS file format can be found here: <https://www.ni.com/en-us/support/documentation/supplemental/07/tdms-file-format-internal-structure.html>

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub mod channel_iter;
pub mod data_type;
pub mod dump;
mod error;
pub mod listener;
pub mod object_path;
pub mod segment;

use crate::channel_iter::ChannelDataIter;
use crate::data_type::{
    f64_decoder, read_bytes, read_u32, F64Decoder, NativeType, TdmsDataType, TdmsValue,
};
use crate::listener::RawDataListener;
use crate::object_path::ObjectPath;
use crate::segment::{LeadIn, Segment, SegmentObject};
pub use crate::TdmsError::{
    ChannelDoesNotExist, ChannelTypeMismatch, General, GroupDoesNotExist, InvalidSegment,
    StringConversionError, UnsupportedDataType,
};
pub use error::{DumpError, TdmsError};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
/// `TdmsObject` is the file wide view of a single object path - its properties merged across every
/// segment that mentioned it, its data type, and how many values it holds in total.
pub struct TdmsObject {
    pub path: ObjectPath,
    pub data_type: Option<TdmsDataType>,
    pub number_of_values: u64,
    /// total raw data bytes across all segments
    pub bytes: u64,
    pub properties: IndexMap<String, TdmsValue>,
}

impl TdmsObject {
    fn new(path: ObjectPath) -> Self {
        TdmsObject {
            path,
            data_type: None,
            number_of_values: 0,
            bytes: 0,
            properties: IndexMap::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&TdmsValue> {
        self.properties.get(name)
    }
}

#[derive(Debug)]
/// `TdmsFile` represents all `segments` of a TDMS file in the order in which they were read, along
/// with an index of every object they describe. It owns the reader raw data is pulled from.
pub struct TdmsFile<R: Read + Seek> {
    pub segments: Vec<Segment>,
    objects: IndexMap<ObjectPath, TdmsObject>,
    reader: R,
}

impl TdmsFile<BufReader<File>> {
    /// opens and indexes the file at `path`. Only metadata is read at this point.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TdmsError> {
        let file = File::open(path.as_ref())?;

        TdmsFile::from_reader(BufReader::with_capacity(4096, file))
    }
}

impl<R: Read + Seek> TdmsFile<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, TdmsError> {
        let file_len = reader.seek(SeekFrom::End(0))?;

        let mut segments: Vec<Segment> = vec![];
        let mut objects: IndexMap<ObjectPath, TdmsObject> = IndexMap::new();
        let mut layouts: IndexMap<ObjectPath, SegmentObject> = IndexMap::new();
        let mut offset: u64 = 0;

        while offset + LeadIn::SIZE as u64 <= file_len {
            reader.seek(SeekFrom::Start(offset))?;
            debug!("parsing segment {} from offset {}", segments.len(), offset);

            let segment = match Segment::new(
                &mut reader,
                segments.len(),
                file_len,
                segments.last(),
                &layouts,
            ) {
                Ok(s) => s,
                Err(InvalidSegment()) if !segments.is_empty() => {
                    warn!(
                        "ignoring {} trailing bytes that are not a TDMS segment",
                        file_len - offset
                    );
                    offset = file_len;
                    break;
                }
                Err(e) => return Err(e),
            };

            index_segment(&segment, &mut objects, &mut layouts);

            offset = segment.end_pos;
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(InvalidSegment());
        }

        if offset < file_len {
            warn!("ignoring {} trailing bytes after the last segment", file_len - offset);
        }

        debug!(
            "parsed {} segments describing {} objects",
            segments.len(),
            objects.len()
        );

        Ok(TdmsFile {
            segments,
            objects,
            reader,
        })
    }

    /// every object in the file, in the order they first appeared
    pub fn objects(&self) -> impl Iterator<Item = &TdmsObject> {
        self.objects.values()
    }

    pub fn object(&self, path: &ObjectPath) -> Option<&TdmsObject> {
        self.objects.get(path)
    }

    /// properties of the file object itself
    pub fn properties(&self) -> Option<&IndexMap<String, TdmsValue>> {
        self.objects.get(&ObjectPath::Root).map(|o| &o.properties)
    }

    /// groups returns all possible groups throughout the file
    pub fn groups(&self) -> Vec<&str> {
        let groups: IndexSet<&str> = self
            .objects
            .keys()
            .filter_map(|path| path.group_name())
            .collect();

        Vec::from_iter(groups)
    }

    pub fn channels(&self, group: &str) -> Vec<&TdmsObject> {
        self.objects
            .values()
            .filter(|o| o.path.is_channel() && o.path.group_name() == Some(group))
            .collect()
    }

    /// returns the channel at the exact (group, channel) pair
    pub fn channel(&self, group: &str, channel: &str) -> Result<&TdmsObject, TdmsError> {
        if let Some(object) = self.objects.get(&ObjectPath::channel(group, channel)) {
            return Ok(object);
        }

        if self.groups().contains(&group) {
            Err(ChannelDoesNotExist(group.to_string(), channel.to_string()))
        } else {
            Err(GroupDoesNotExist(group.to_string()))
        }
    }

    /// returns an iterator over the channel's values decoded as `T`. `T` has to match the stored
    /// data type exactly, e.g. `f64` for `tdsTypeDoubleFloat` - see `samples` for a widening
    /// alternative
    pub fn channel_iter<T: NativeType>(
        &mut self,
        group: &str,
        channel: &str,
    ) -> Result<ChannelDataIter<'_, T, R>, TdmsError> {
        if let Some(stored) = self.channel_data_type(group, channel)? {
            if !T::accepts(stored) {
                return Err(ChannelTypeMismatch {
                    stored,
                    requested: T::NAME,
                });
            }
        }

        let blocks = self.blocks(&ObjectPath::channel(group, channel));

        Ok(ChannelDataIter::new(
            &mut self.reader,
            blocks,
            T::SIZE,
            T::from_bytes,
        ))
    }

    /// returns an iterator over the channel's values widened to `f64`, whatever numeric type they
    /// are stored as
    pub fn samples(
        &mut self,
        group: &str,
        channel: &str,
    ) -> Result<ChannelDataIter<'_, f64, R>, TdmsError> {
        let (size, decoder): (usize, F64Decoder) = match self.channel_data_type(group, channel)? {
            None => (
                <f64 as NativeType>::SIZE,
                <f64 as NativeType>::from_bytes as F64Decoder,
            ),
            Some(stored) => match (stored.size(), f64_decoder(stored)) {
                (Some(size), Some(decoder)) => (size, decoder),
                _ => return Err(UnsupportedDataType(stored)),
            },
        };

        let blocks = self.blocks(&ObjectPath::channel(group, channel));

        Ok(ChannelDataIter::new(&mut self.reader, blocks, size, decoder))
    }

    /// reads every value of a string channel. String data is never interleaved, each chunk holds
    /// the end offsets of its strings followed by their UTF-8 bytes
    pub fn read_strings(&mut self, group: &str, channel: &str) -> Result<Vec<String>, TdmsError> {
        match self.channel_data_type(group, channel)? {
            Some(TdmsDataType::String) | None => (),
            Some(stored) => {
                return Err(ChannelTypeMismatch {
                    stored,
                    requested: "String",
                })
            }
        }

        let mut strings: Vec<String> = vec![];

        for block in self.blocks(&ObjectPath::channel(group, channel)) {
            self.reader.seek(SeekFrom::Start(block.start))?;

            let mut offsets: Vec<u32> = vec![];
            for _ in 0..block.number_of_values {
                offsets.push(read_u32(&mut self.reader, block.endianness)?);
            }

            let mut previous: u32 = 0;
            for offset in offsets {
                let length = offset.checked_sub(previous).ok_or_else(|| {
                    General(format!(
                        "string offsets decrease in {}/{}",
                        group, channel
                    ))
                })?;
                previous = offset;

                let buf = read_bytes(&mut self.reader, length as u64)?;

                let value = String::from_utf8(buf).map_err(|e| {
                    StringConversionError(format!(
                        "invalid UTF-8 in {}: {}",
                        ObjectPath::channel(group, channel),
                        hex::encode(e.as_bytes())
                    ))
                })?;
                strings.push(value);
            }
        }

        Ok(strings)
    }

    /// load_segment reads the raw data of the segment at `index` and hands every chunk to the
    /// listener
    pub fn load_segment<L: RawDataListener + ?Sized>(
        &mut self,
        index: usize,
        listener: &mut L,
    ) -> Result<(), TdmsError> {
        let segment = self
            .segments
            .get(index)
            .ok_or_else(|| General(format!("segment {} does not exist", index)))?;

        segment.read_raw_data(&mut self.reader, listener)
    }

    /// the channel's stored data type, `None` when the channel never held any data
    fn channel_data_type(
        &self,
        group: &str,
        channel: &str,
    ) -> Result<Option<TdmsDataType>, TdmsError> {
        let object = self.channel(group, channel)?;

        match object.data_type {
            Some(TdmsDataType::DAQmxRawData) => {
                Err(UnsupportedDataType(TdmsDataType::DAQmxRawData))
            }
            Some(TdmsDataType::Void) | None => Ok(None),
            Some(data_type) => Ok(Some(data_type)),
        }
    }

    /// blocks collects where the object's values live across every segment, in file order
    fn blocks(&self, path: &ObjectPath) -> Vec<segment::DataBlock> {
        self.segments.iter().flat_map(|s| s.blocks(path)).collect()
    }
}

/// folds a freshly parsed segment into the file wide object index and the per object layouts
fn index_segment(
    segment: &Segment,
    objects: &mut IndexMap<ObjectPath, TdmsObject>,
    layouts: &mut IndexMap<ObjectPath, SegmentObject>,
) {
    if let Some(metadata) = &segment.metadata {
        for obj in &metadata.objects {
            let object = objects
                .entry(obj.object_path.clone())
                .or_insert_with(|| TdmsObject::new(obj.object_path.clone()));

            for property in &obj.properties {
                object
                    .properties
                    .insert(property.name.clone(), property.value.clone());
            }
        }
    }

    for layout in &segment.objects {
        let object = objects
            .entry(layout.path.clone())
            .or_insert_with(|| TdmsObject::new(layout.path.clone()));

        if layout.data_type.is_some() {
            object.data_type = layout.data_type;
        }

        if layout.has_data {
            object.number_of_values += layout.number_of_values * segment.num_chunks;
            object.bytes += layout.data_size * segment.num_chunks;
        }

        layouts.insert(layout.path.clone(), layout.clone());
    }
}
