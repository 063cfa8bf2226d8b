use crate::data_type::TdmsDataType;
use crate::object_path::ObjectPath;
use crate::segment::Endianness;

/// `RawDataListener` receives the raw bytes of a segment one object and chunk at a time, see
/// `TdmsFile::load_segment`. Values are always handed over contiguous, even when the segment
/// stores them interleaved.
pub trait RawDataListener {
    fn data(
        &mut self,
        path: &ObjectPath,
        data_type: TdmsDataType,
        raw: &[u8],
        number_of_values: u64,
        endianness: Endianness,
    );
}

impl<F> RawDataListener for F
where
    F: FnMut(&ObjectPath, TdmsDataType, &[u8], u64, Endianness),
{
    fn data(
        &mut self,
        path: &ObjectPath,
        data_type: TdmsDataType,
        raw: &[u8],
        number_of_values: u64,
        endianness: Endianness,
    ) {
        self(path, data_type, raw, number_of_values, endianness)
    }
}
