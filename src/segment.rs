use crate::data_type::{read_string, read_u32, read_u64, TdmsDataType, TdmsValue};
use crate::listener::RawDataListener;
use crate::object_path::ObjectPath;
use crate::TdmsError::{
    ChunkSizeMismatch, DataTypeMismatch, General, InvalidDAQmxDataIndex, InvalidRawDataIndex,
    InvalidSegment, MissingPreviousSegment, UnsupportedDataType,
};
use crate::TdmsError;
use indexmap::IndexMap;
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

/// These are bitmasks for the Table of Contents byte.
pub const K_TOC_META_DATA: u32 = 1 << 1;
// this flag represents a segment who's channel list/order has been changed from the previous segments
// and therefore a new order for processing the raw data must be followed
pub const K_TOC_NEW_OBJ_LIST: u32 = 1 << 2;
pub const K_TOC_RAW_DATA: u32 = 1 << 3;
pub const K_TOC_INTERLEAVED_DATA: u32 = 1 << 5;
pub const K_TOC_BIG_ENDIAN: u32 = 1 << 6;
pub const K_TOC_DAQMX_RAW_DATA: u32 = 1 << 7;

const NO_RAW_DATA: u32 = 0xFFFFFFFF;
const SAME_RAW_DATA_AS_PREVIOUS: u32 = 0x00000000;
const FORMAT_CHANGING_SCALER: u32 = 0x00001269;
const DIGITAL_LINE_SCALER: u32 = 0x0000126A;

/// Ease of use enum for determining how to read numerical values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone)]
/// `LeadIn` represents the 28 bytes representing the lead in to a TDMS Segment.
pub struct LeadIn {
    pub tag: [u8; 4],
    pub table_of_contents: u32,
    pub version_number: u32,
    pub next_segment_offset: u64,
    pub raw_data_offset: u64,
}

impl LeadIn {
    pub const SIZE: usize = 28;

    /// `from_bytes` accepts a 28 byte array which represents the lead-in to a segment. This is hardcoded
    /// as there are no dynamic lengths in this portion of a segment
    pub fn from_bytes(lead_in: &[u8; LeadIn::SIZE]) -> Result<Self, TdmsError> {
        let mut tag: [u8; 4] = [0; 4];
        tag.clone_from_slice(&lead_in[0..4]);

        if hex::encode(tag) != "5444536d" {
            return Err(InvalidSegment());
        }

        let mut toc: [u8; 4] = [0; 4];
        toc.clone_from_slice(&lead_in[4..8]);

        // the Table of Contents is always in little endian format regardless if the rest of the segment
        // is in big endian
        let table_of_contents = u32::from_le_bytes(toc);
        let endianness = if table_of_contents & K_TOC_BIG_ENDIAN != 0 {
            Endianness::Big
        } else {
            Endianness::Little
        };

        let mut rest = &lead_in[8..];
        let version_number = read_u32(&mut rest, endianness)?;
        let next_segment_offset = read_u64(&mut rest, endianness)?;
        let raw_data_offset = read_u64(&mut rest, endianness)?;

        Ok(LeadIn {
            tag,
            table_of_contents,
            version_number,
            next_segment_offset,
            raw_data_offset,
        })
    }

    pub fn endianness(&self) -> Endianness {
        if self.table_of_contents & K_TOC_BIG_ENDIAN != 0 {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

#[derive(Debug, Clone)]
/// `Metadata` represents the collection of metadata objects for a segment in the order in which they
/// were read
pub struct Metadata {
    pub number_of_objects: u32,
    pub objects: Vec<MetadataObject>,
}

#[derive(Debug, Clone)]
/// `MetadataObject` represents information that is not raw data associated with the segment. May
/// contain DAQmx raw data index, a standard index, or nothing at all.
pub struct MetadataObject {
    pub object_path: ObjectPath,
    pub index: ObjectIndex,
    pub properties: Vec<MetadataProperty>,
}

#[derive(Debug, Clone)]
pub enum ObjectIndex {
    NoData,
    SameAsPrevious,
    Raw(RawDataIndex),
    DAQmx(DAQmxDataIndex),
}

impl Metadata {
    /// from_reader accepts an open reader and attempts to read metadata from the currently selected
    /// segment. Note that you must have read the segment's lead in information completely before
    /// attempting to use this function
    pub fn from_reader<R: Read>(endianness: Endianness, r: &mut R) -> Result<Self, TdmsError> {
        let number_of_objects = read_u32(r, endianness)?;
        let mut objects: Vec<MetadataObject> = vec![];

        for _ in 0..number_of_objects {
            let object_path: ObjectPath = read_string(r, endianness)?.parse()?;
            let first_byte = read_u32(r, endianness)?;

            let index = match first_byte {
                NO_RAW_DATA => ObjectIndex::NoData,
                SAME_RAW_DATA_AS_PREVIOUS => ObjectIndex::SameAsPrevious,
                // format changing scaler, digital line scaler
                FORMAT_CHANGING_SCALER | DIGITAL_LINE_SCALER => {
                    ObjectIndex::DAQmx(DAQmxDataIndex::from_reader(endianness, r)?)
                }
                _ => ObjectIndex::Raw(RawDataIndex::from_reader(endianness, r)?),
            };

            let num_of_properties = read_u32(r, endianness)?;

            let mut properties: Vec<MetadataProperty> = vec![];
            for _ in 0..num_of_properties {
                properties.push(MetadataProperty::from_reader(endianness, r)?);
            }

            debug!(
                "object {} with {} properties: {:?}",
                object_path,
                properties.len(),
                index
            );

            objects.push(MetadataObject {
                object_path,
                index,
                properties,
            });
        }

        Ok(Metadata {
            number_of_objects,
            objects,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RawDataIndex {
    pub data_type: TdmsDataType,
    pub array_dimension: u32, // should only ever be 1
    pub number_of_values: u64,
    pub number_of_bytes: Option<u64>, // only valid if data type is TDMS String
}

impl RawDataIndex {
    pub fn from_reader<R: Read>(endianness: Endianness, r: &mut R) -> Result<Self, TdmsError> {
        let data_type = TdmsDataType::try_from(read_u32(r, endianness)?)?;
        let array_dimension = read_u32(r, endianness)?;
        let number_of_values = read_u64(r, endianness)?;

        let number_of_bytes = match data_type {
            TdmsDataType::String => Some(read_u64(r, endianness)?),
            _ => None,
        };

        if array_dimension != 1 {
            warn!("raw data index has array dimension {}", array_dimension);
        }

        Ok(RawDataIndex {
            data_type,
            array_dimension,
            number_of_values,
            number_of_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DAQmxDataIndex {
    pub array_dimension: u32,
    pub number_of_values: u64,
    pub scalers: Vec<DAQmxScaler>,
    pub raw_data_widths: Vec<u32>,
}

impl DAQmxDataIndex {
    pub fn from_reader<R: Read>(endianness: Endianness, r: &mut R) -> Result<Self, TdmsError> {
        if read_u32(r, endianness)? != 0xFFFFFFFF {
            return Err(InvalidDAQmxDataIndex());
        }

        let array_dimension = read_u32(r, endianness)?;
        let number_of_values = read_u64(r, endianness)?;

        let scaler_count = read_u32(r, endianness)?;
        let mut scalers: Vec<DAQmxScaler> = vec![];
        for _ in 0..scaler_count {
            scalers.push(DAQmxScaler::from_reader(endianness, r)?);
        }

        let width_count = read_u32(r, endianness)?;
        let mut raw_data_widths: Vec<u32> = vec![];
        for _ in 0..width_count {
            raw_data_widths.push(read_u32(r, endianness)?);
        }

        Ok(DAQmxDataIndex {
            array_dimension,
            number_of_values,
            scalers,
            raw_data_widths,
        })
    }

    /// bytes occupied by one scan across all of the index's raw buffers
    pub fn stride(&self) -> u64 {
        self.raw_data_widths.iter().map(|w| *w as u64).sum()
    }
}

#[derive(Debug, Clone)]
/// A DAQmx format changing or digital line scaler. `data_type_code` is a DAQmx type code, not a
/// TDMS one.
pub struct DAQmxScaler {
    pub data_type_code: u32,
    pub raw_buffer_index: u32,
    pub raw_byte_offset: u32,
    pub sample_format_bitmap: u8,
    pub scale_id: u32,
}

impl DAQmxScaler {
    pub fn from_reader<R: Read>(endianness: Endianness, r: &mut R) -> Result<Self, TdmsError> {
        let data_type_code = read_u32(r, endianness)?;
        let raw_buffer_index = read_u32(r, endianness)?;
        let raw_byte_offset = read_u32(r, endianness)?;

        let mut bitmap: [u8; 1] = [0; 1];
        r.read_exact(&mut bitmap)?;

        let scale_id = read_u32(r, endianness)?;

        Ok(DAQmxScaler {
            data_type_code,
            raw_buffer_index,
            raw_byte_offset,
            sample_format_bitmap: bitmap[0],
            scale_id,
        })
    }
}

#[derive(Debug, Clone)]
/// `MetadataProperty` is a key/value pair associated with a `MetadataObject`
pub struct MetadataProperty {
    pub name: String,
    pub data_type: TdmsDataType,
    pub value: TdmsValue,
}

impl MetadataProperty {
    /// from_reader accepts an open reader and attempts to read metadata properties from the currently
    /// selected segment and metadata object. Note that you must have read the metadata object's lead
    /// in information prior to using this function
    pub fn from_reader<R: Read>(endianness: Endianness, r: &mut R) -> Result<Self, TdmsError> {
        let name = read_string(r, endianness)?;
        let data_type = TdmsDataType::try_from(read_u32(r, endianness)?)?;
        let value = TdmsValue::from_reader(endianness, data_type, r)?;

        Ok(MetadataProperty {
            name,
            data_type,
            value,
        })
    }
}

#[derive(Debug, Clone)]
/// `SegmentObject` is an object's raw data layout within a single segment, after resolving indices
/// inherited from previous segments.
pub struct SegmentObject {
    pub path: ObjectPath,
    pub data_type: Option<TdmsDataType>,
    pub has_data: bool,
    pub number_of_values: u64,
    /// bytes this object occupies in every chunk
    pub data_size: u64,
}

impl SegmentObject {
    fn without_data(path: ObjectPath, data_type: Option<TdmsDataType>) -> Self {
        SegmentObject {
            path,
            data_type,
            has_data: false,
            number_of_values: 0,
            data_size: 0,
        }
    }

    fn from_index(
        path: ObjectPath,
        index: &ObjectIndex,
        prior: Option<&SegmentObject>,
    ) -> Result<Self, TdmsError> {
        let prior_type = prior.and_then(|p| p.data_type);

        match index {
            ObjectIndex::NoData => Ok(SegmentObject::without_data(path, prior_type)),
            ObjectIndex::SameAsPrevious => match prior {
                Some(p) => Ok(SegmentObject { path, ..p.clone() }),
                None => {
                    warn!("{} reuses a raw data index that was never written", path);
                    Ok(SegmentObject::without_data(path, None))
                }
            },
            ObjectIndex::Raw(index) if index.data_type == TdmsDataType::Void => {
                warn!("{} has a raw data index without a data type, ignoring its values", path);
                Ok(SegmentObject::without_data(path, prior_type))
            }
            ObjectIndex::Raw(index) => {
                if let Some(previous) = prior_type {
                    if previous != index.data_type {
                        return Err(DataTypeMismatch {
                            path: path.to_string(),
                            previous,
                            current: index.data_type,
                        });
                    }
                }

                let overflow = || InvalidRawDataIndex(path.to_string());

                let number_of_values = index
                    .number_of_values
                    .checked_mul(index.array_dimension as u64)
                    .ok_or_else(overflow)?;

                let data_size = match (index.data_type, index.number_of_bytes) {
                    // every string needs at least its u32 end offset
                    (TdmsDataType::String, Some(bytes)) => {
                        match number_of_values.checked_mul(4) {
                            Some(offsets) if offsets <= bytes => bytes,
                            _ => return Err(overflow()),
                        }
                    }
                    (data_type, _) => match data_type.size() {
                        Some(size) => (size as u64)
                            .checked_mul(number_of_values)
                            .ok_or_else(overflow)?,
                        None => return Err(UnsupportedDataType(data_type)),
                    },
                };

                Ok(SegmentObject {
                    path,
                    data_type: Some(index.data_type),
                    has_data: true,
                    number_of_values,
                    data_size,
                })
            }
            ObjectIndex::DAQmx(index) => {
                let data_size = match index.stride() {
                    0 if index.number_of_values > 0 => return Err(InvalidDAQmxDataIndex()),
                    stride => stride
                        .checked_mul(index.number_of_values)
                        .ok_or_else(|| InvalidRawDataIndex(path.to_string()))?,
                };

                Ok(SegmentObject {
                    path,
                    data_type: Some(TdmsDataType::DAQmxRawData),
                    has_data: true,
                    number_of_values: index.number_of_values,
                    data_size,
                })
            }
        }
    }
}

/// `DataBlock` locates one object's values inside a single chunk. Value `i` starts at
/// `start + i * stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    pub start: u64,
    pub number_of_values: u64,
    pub stride: u64,
    /// total bytes of the block, only meaningful for contiguous data
    pub size: u64,
    pub endianness: Endianness,
}

#[derive(Debug, Clone)]
/// `Segment` represents an entire TDMS File Segment: its lead in, metadata and the layout of its raw
/// data. Raw data itself stays on disk.
pub struct Segment {
    pub index: usize,
    pub lead_in: LeadIn,
    pub metadata: Option<Metadata>,
    pub start_pos: u64,
    /// absolute position of the first raw data byte
    pub data_pos: u64,
    pub end_pos: u64,
    /// every object taking part in this segment, in raw data order
    pub objects: Vec<SegmentObject>,
    pub chunk_size: u64,
    pub num_chunks: u64,
    /// set when the lead in pointed past the end of the file and the segment was cut short
    pub truncated: bool,
}

impl Segment {
    /// `new` expects a reader who's cursor position is at the start of a new TDMS segment.
    /// You will see an InvalidSegment error return if the reader position isn't correct as the first
    /// byte read will not be the correct tag for a segment. `layouts` holds the last known layout of
    /// every object seen in earlier segments.
    pub fn new<R: Read + Seek>(
        r: &mut R,
        index: usize,
        file_len: u64,
        previous_segment: Option<&Segment>,
        layouts: &IndexMap<ObjectPath, SegmentObject>,
    ) -> Result<Self, TdmsError> {
        let start_pos = r.stream_position()?;
        let mut lead_in = [0; LeadIn::SIZE];
        r.read_exact(&mut lead_in[..])?;

        let lead_in = LeadIn::from_bytes(&lead_in)?;
        let endianness = lead_in.endianness();

        match lead_in.version_number {
            4712 | 4713 => (),
            v => warn!("segment {}: unknown version number {}", index, v),
        }

        let metadata_pos = start_pos + LeadIn::SIZE as u64;
        let mut truncated = false;

        // calculate the end position by taking the start and adding the offset plus lead in bytes
        let end_pos = match metadata_pos.checked_add(lead_in.next_segment_offset) {
            Some(end) if lead_in.next_segment_offset != u64::MAX && end <= file_len => end,
            _ => {
                warn!(
                    "segment {} at {} runs past the end of the file, it was likely not closed properly",
                    index, start_pos
                );
                truncated = true;
                file_len
            }
        };

        let data_pos = metadata_pos
            .checked_add(lead_in.raw_data_offset)
            .filter(|p| *p <= end_pos)
            .ok_or_else(|| {
                General(format!(
                    "segment {} raw data offset {} lies outside of the segment",
                    index, lead_in.raw_data_offset
                ))
            })?;

        debug!(
            "segment {}: toc {:#010b}, metadata at {}, raw data at {}, end at {}",
            index, lead_in.table_of_contents, metadata_pos, data_pos, end_pos
        );

        let mut objects: Vec<SegmentObject> = vec![];
        let mut metadata: Option<Metadata> = None;

        if lead_in.table_of_contents & K_TOC_META_DATA == 0 {
            let previous = previous_segment.ok_or(MissingPreviousSegment(index))?;
            objects = previous.objects.clone();
        } else {
            let read = Metadata::from_reader(endianness, r)?;

            // without a new object list the previous order is kept and objects are updated or
            // appended to it
            if lead_in.table_of_contents & K_TOC_NEW_OBJ_LIST == 0 {
                if let Some(previous) = previous_segment {
                    objects = previous.objects.clone();
                }
            }

            for obj in &read.objects {
                let existing = objects.iter().position(|o| o.path == obj.object_path);
                let prior = match existing {
                    Some(i) => Some(&objects[i]),
                    None => layouts.get(&obj.object_path),
                };

                let object = SegmentObject::from_index(obj.object_path.clone(), &obj.index, prior)?;

                match existing {
                    Some(i) => objects[i] = object,
                    None => objects.push(object),
                }
            }

            metadata = Some(read);
        }

        let mut segment = Segment {
            index,
            lead_in,
            metadata,
            start_pos,
            data_pos,
            end_pos,
            objects,
            chunk_size: 0,
            num_chunks: 0,
            truncated,
        };

        segment.calculate_chunks()?;

        Ok(segment)
    }

    /// works out how many times the chunk layout repeats in the raw data
    fn calculate_chunks(&mut self) -> Result<(), TdmsError> {
        if !self.has_raw_data() {
            return Ok(());
        }

        if self.has_interleaved_data() {
            let mut counts = self
                .objects
                .iter()
                .filter(|o| o.has_data)
                .map(|o| o.number_of_values);

            if let Some(first) = counts.next() {
                if counts.any(|n| n != first) {
                    return Err(General(format!(
                        "segment {} interleaves channels of different lengths",
                        self.index
                    )));
                }
            }

            for object in self.objects.iter().filter(|o| o.has_data) {
                let element_size = object.data_type.and_then(|t| t.size());
                if element_size.is_none() {
                    return Err(UnsupportedDataType(
                        object.data_type.unwrap_or(TdmsDataType::Void),
                    ));
                }
            }
        }

        let chunk_size = self
            .objects
            .iter()
            .filter(|o| o.has_data)
            .try_fold(0u64, |total, o| total.checked_add(o.data_size))
            .ok_or_else(|| {
                General(format!(
                    "segment {} raw data indices add up to more than a file can hold",
                    self.index
                ))
            })?;
        let data_size = self.end_pos - self.data_pos;

        self.chunk_size = chunk_size;

        if chunk_size == 0 {
            if data_size != 0 {
                warn!(
                    "segment {} has {} bytes of raw data but no channel data",
                    self.index, data_size
                );
            }
            return Ok(());
        }

        if data_size % chunk_size != 0 {
            if !self.truncated {
                return Err(ChunkSizeMismatch {
                    segment: self.index,
                    data_size,
                    chunk_size,
                });
            }

            warn!(
                "segment {} ends in a partial chunk, dropping its last {} bytes",
                self.index,
                data_size % chunk_size
            );
        }

        self.num_chunks = data_size / chunk_size;

        Ok(())
    }

    pub fn endianness(&self) -> Endianness {
        self.lead_in.endianness()
    }

    pub fn has_metadata(&self) -> bool {
        self.lead_in.table_of_contents & K_TOC_META_DATA != 0
    }

    pub fn has_interleaved_data(&self) -> bool {
        self.lead_in.table_of_contents & K_TOC_INTERLEAVED_DATA != 0
    }

    pub fn has_daqmx_raw_data(&self) -> bool {
        self.lead_in.table_of_contents & K_TOC_DAQMX_RAW_DATA != 0
    }

    pub fn has_raw_data(&self) -> bool {
        self.lead_in.table_of_contents & K_TOC_RAW_DATA != 0
    }

    pub fn has_new_obj_list(&self) -> bool {
        self.lead_in.table_of_contents & K_TOC_NEW_OBJ_LIST != 0
    }

    pub fn object(&self, path: &ObjectPath) -> Option<&SegmentObject> {
        self.objects.iter().find(|o| &o.path == path)
    }

    /// blocks returns where the given object's values live in each of this segment's chunks, in
    /// file order. The result is empty when the object holds no data in this segment.
    pub fn blocks(&self, path: &ObjectPath) -> Vec<DataBlock> {
        let position = match self.objects.iter().position(|o| &o.path == path) {
            Some(p) => p,
            None => return vec![],
        };

        let object = &self.objects[position];
        if !object.has_data || object.number_of_values == 0 {
            return vec![];
        }

        let element_size = object.data_type.and_then(|t| t.size()).unwrap_or(0) as u64;
        let preceding = self.objects[..position].iter().filter(|o| o.has_data);

        let (offset, stride) = if self.has_interleaved_data() {
            let offset: u64 = preceding
                .filter_map(|o| o.data_type.and_then(|t| t.size()))
                .map(|s| s as u64)
                .sum();
            (offset, self.interleaved_row_size())
        } else {
            (preceding.map(|o| o.data_size).sum(), element_size)
        };

        (0..self.num_chunks)
            .map(|chunk| DataBlock {
                start: self.data_pos + chunk * self.chunk_size + offset,
                number_of_values: object.number_of_values,
                stride,
                size: object.data_size,
                endianness: self.endianness(),
            })
            .collect()
    }

    /// bytes of one interleaved row, one value of every object holding data
    pub fn interleaved_row_size(&self) -> u64 {
        self.objects
            .iter()
            .filter(|o| o.has_data)
            .filter_map(|o| o.data_type.and_then(|t| t.size()))
            .map(|s| s as u64)
            .sum()
    }

    /// read_raw_data hands every chunk of this segment to the listener, one call per object and
    /// chunk. Interleaved chunks are split up first so the listener always sees contiguous values.
    pub fn read_raw_data<R: Read + Seek, L: RawDataListener + ?Sized>(
        &self,
        r: &mut R,
        listener: &mut L,
    ) -> Result<(), TdmsError> {
        if self.num_chunks == 0 {
            return Ok(());
        }

        let chunk_size = usize::try_from(self.chunk_size).map_err(|_| {
            General(String::from("chunk size does not fit in memory"))
        })?;
        let mut chunk = vec![0; chunk_size];

        r.seek(SeekFrom::Start(self.data_pos))?;

        for _ in 0..self.num_chunks {
            r.read_exact(&mut chunk)?;

            if self.has_interleaved_data() {
                self.split_interleaved(&chunk, listener);
                continue;
            }

            let mut offset = 0;
            for object in self.objects.iter().filter(|o| o.has_data) {
                let size = object.data_size as usize;
                listener.data(
                    &object.path,
                    object.data_type.unwrap_or(TdmsDataType::Void),
                    &chunk[offset..offset + size],
                    object.number_of_values,
                    self.endianness(),
                );
                offset += size;
            }
        }

        Ok(())
    }

    fn split_interleaved<L: RawDataListener + ?Sized>(&self, chunk: &[u8], listener: &mut L) {
        let row_size = self.interleaved_row_size() as usize;
        let mut offset = 0;

        for object in self.objects.iter().filter(|o| o.has_data) {
            let data_type = object.data_type.unwrap_or(TdmsDataType::Void);
            let size = data_type.size().unwrap_or(0);

            let values: Vec<u8> = chunk
                .chunks_exact(row_size)
                .flat_map(|row| row[offset..offset + size].iter().copied())
                .collect();

            listener.data(
                &object.path,
                data_type,
                &values,
                object.number_of_values,
                self.endianness(),
            );
            offset += size;
        }
    }
}
