use crate::segment::Endianness;
use crate::TdmsError;
use crate::TdmsError::{StringConversionError, UnknownDataType, UnsupportedDataType};
#[cfg(feature = "chrono")]
use chrono::{prelude::*, Duration};
use extended::Extended;
use std::fmt;
use std::io::{self, Read};
#[cfg(feature = "time")]
use time::{macros::datetime, PrimitiveDateTime};

/// seconds between the NI epoch (1904-01-01 UTC) and the unix epoch
pub const NI_EPOCH_UNIX_OFFSET: i64 = 2_082_844_800;

macro_rules! from_bytes {
    ( $t:ty, $x:expr, $e:expr ) => {
        match $e {
            Endianness::Little => <$t>::from_le_bytes($x),
            Endianness::Big => <$t>::from_be_bytes($x),
        }
    };
}

/// Represents the potential TDMS data types, as encoded in raw data indices and properties.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TdmsDataType {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    SingleFloat,
    DoubleFloat,
    ExtendedFloat,
    SingleFloatWithUnit,
    DoubleFloatWithUnit,
    ExtendedFloatWithUnit,
    String,
    Boolean,
    TimeStamp,
    FixedPoint,
    ComplexSingleFloat,
    ComplexDoubleFloat,
    DAQmxRawData,
}

impl TryFrom<u32> for TdmsDataType {
    type Error = TdmsError;

    fn try_from(v: u32) -> Result<Self, TdmsError> {
        match v {
            0 => Ok(TdmsDataType::Void),
            1 => Ok(TdmsDataType::I8),
            2 => Ok(TdmsDataType::I16),
            3 => Ok(TdmsDataType::I32),
            4 => Ok(TdmsDataType::I64),
            5 => Ok(TdmsDataType::U8),
            6 => Ok(TdmsDataType::U16),
            7 => Ok(TdmsDataType::U32),
            8 => Ok(TdmsDataType::U64),
            9 => Ok(TdmsDataType::SingleFloat),
            10 => Ok(TdmsDataType::DoubleFloat),
            11 => Ok(TdmsDataType::ExtendedFloat),
            0x19 => Ok(TdmsDataType::SingleFloatWithUnit),
            0x1a => Ok(TdmsDataType::DoubleFloatWithUnit),
            0x1b => Ok(TdmsDataType::ExtendedFloatWithUnit),
            0x20 => Ok(TdmsDataType::String),
            0x21 => Ok(TdmsDataType::Boolean),
            0x44 => Ok(TdmsDataType::TimeStamp),
            0x4f => Ok(TdmsDataType::FixedPoint),
            0x08000c => Ok(TdmsDataType::ComplexSingleFloat),
            0x10000d => Ok(TdmsDataType::ComplexDoubleFloat),
            0xFFFFFFFF => Ok(TdmsDataType::DAQmxRawData),
            _ => Err(UnknownDataType(v)),
        }
    }
}

impl TdmsDataType {
    /// size in bytes of a single stored value. `None` for variable length types and for types
    /// whose on-disk width isn't known
    pub fn size(&self) -> Option<usize> {
        match self {
            TdmsDataType::Void => Some(0),
            TdmsDataType::I8 | TdmsDataType::U8 | TdmsDataType::Boolean => Some(1),
            TdmsDataType::I16 | TdmsDataType::U16 => Some(2),
            TdmsDataType::I32
            | TdmsDataType::U32
            | TdmsDataType::SingleFloat
            | TdmsDataType::SingleFloatWithUnit => Some(4),
            TdmsDataType::I64
            | TdmsDataType::U64
            | TdmsDataType::DoubleFloat
            | TdmsDataType::DoubleFloatWithUnit
            | TdmsDataType::ComplexSingleFloat => Some(8),
            TdmsDataType::ExtendedFloat | TdmsDataType::ExtendedFloatWithUnit => Some(10),
            TdmsDataType::TimeStamp | TdmsDataType::ComplexDoubleFloat => Some(16),
            TdmsDataType::String | TdmsDataType::FixedPoint | TdmsDataType::DAQmxRawData => None,
        }
    }

    /// true for every type that can be widened into an `f64` sample
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TdmsDataType::I8
                | TdmsDataType::I16
                | TdmsDataType::I32
                | TdmsDataType::I64
                | TdmsDataType::U8
                | TdmsDataType::U16
                | TdmsDataType::U32
                | TdmsDataType::U64
                | TdmsDataType::SingleFloat
                | TdmsDataType::DoubleFloat
                | TdmsDataType::ExtendedFloat
                | TdmsDataType::SingleFloatWithUnit
                | TdmsDataType::DoubleFloatWithUnit
                | TdmsDataType::ExtendedFloatWithUnit
        )
    }

    /// name used by NI's documentation for this type, handy for user facing output
    pub fn name(&self) -> &'static str {
        match self {
            TdmsDataType::Void => "tdsTypeVoid",
            TdmsDataType::I8 => "tdsTypeI8",
            TdmsDataType::I16 => "tdsTypeI16",
            TdmsDataType::I32 => "tdsTypeI32",
            TdmsDataType::I64 => "tdsTypeI64",
            TdmsDataType::U8 => "tdsTypeU8",
            TdmsDataType::U16 => "tdsTypeU16",
            TdmsDataType::U32 => "tdsTypeU32",
            TdmsDataType::U64 => "tdsTypeU64",
            TdmsDataType::SingleFloat => "tdsTypeSingleFloat",
            TdmsDataType::DoubleFloat => "tdsTypeDoubleFloat",
            TdmsDataType::ExtendedFloat => "tdsTypeExtendedFloat",
            TdmsDataType::SingleFloatWithUnit => "tdsTypeSingleFloatWithUnit",
            TdmsDataType::DoubleFloatWithUnit => "tdsTypeDoubleFloatWithUnit",
            TdmsDataType::ExtendedFloatWithUnit => "tdsTypeExtendedFloatWithUnit",
            TdmsDataType::String => "tdsTypeString",
            TdmsDataType::Boolean => "tdsTypeBoolean",
            TdmsDataType::TimeStamp => "tdsTypeTimeStamp",
            TdmsDataType::FixedPoint => "tdsTypeFixedPoint",
            TdmsDataType::ComplexSingleFloat => "tdsTypeComplexSingleFloat",
            TdmsDataType::ComplexDoubleFloat => "tdsTypeComplexDoubleFloat",
            TdmsDataType::DAQmxRawData => "tdsTypeDAQmxRawData",
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct TdmsTimestamp {
    pub seconds_since_ni_epoch: i64,
    pub fractions_of_a_second: u64,
}

impl TdmsTimestamp {
    /// fractional seconds since 1970-01-01 UTC
    pub fn unix_seconds(&self) -> f64 {
        (self.seconds_since_ni_epoch - NI_EPOCH_UNIX_OFFSET) as f64
            + self.fractions_of_a_second as f64 / u64::MAX as f64
    }
}

#[cfg(feature = "time")]
impl TdmsTimestamp {
    const NI_EPOCH: PrimitiveDateTime = datetime!(1904-01-01 00:00);

    pub fn to_time_duration(&self) -> time::Duration {
        time::Duration::seconds(self.seconds_since_ni_epoch)
            + time::Duration::seconds_f64(self.fractions_of_a_second as f64 / u64::MAX as f64)
    }

    pub fn to_primitive_date_time(&self) -> PrimitiveDateTime {
        TdmsTimestamp::NI_EPOCH + self.to_time_duration()
    }
}

#[cfg(feature = "chrono")]
impl TdmsTimestamp {
    pub fn to_chrono_duration(&self) -> Duration {
        let nanos = (self.fractions_of_a_second as f64 / u64::MAX as f64 * 1e9) as i64;

        Duration::seconds(self.seconds_since_ni_epoch) + Duration::nanoseconds(nanos)
    }

    pub fn to_naive_date_time(&self) -> Option<NaiveDateTime> {
        let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)?.and_hms_opt(0, 0, 0)?;
        epoch.checked_add_signed(self.to_chrono_duration())
    }
}

impl fmt::Display for TdmsTimestamp {
    #[cfg(feature = "chrono")]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive_date_time() {
            Some(t) => write!(f, "{}", t.format("%d.%m.%Y %H:%M:%S%.6f")),
            None => write!(f, "{:.6}", self.unix_seconds()),
        }
    }

    #[cfg(not(feature = "chrono"))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.unix_seconds())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// `TdmsValue` is a single decoded value, used for metadata properties. Raw channel data is read
/// through `NativeType` instead so values aren't boxed one by one.
pub enum TdmsValue {
    Void,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    SingleFloat(f32),
    DoubleFloat(f64),
    ExtendedFloat(f64),
    String(String),
    Boolean(bool),
    TimeStamp(TdmsTimestamp),
    ComplexSingleFloat(f32, f32),
    ComplexDoubleFloat(f64, f64),
}

impl TdmsValue {
    /// from_reader accepts an open reader and a data type and attempts to read a single value of
    /// that type
    pub fn from_reader<R: Read>(
        endianness: Endianness,
        data_type: TdmsDataType,
        r: &mut R,
    ) -> Result<Self, TdmsError> {
        let value = match data_type {
            TdmsDataType::Void => TdmsValue::Void,
            TdmsDataType::I8 => TdmsValue::I8(read_native(r, endianness)?),
            TdmsDataType::I16 => TdmsValue::I16(read_native(r, endianness)?),
            TdmsDataType::I32 => TdmsValue::I32(read_native(r, endianness)?),
            TdmsDataType::I64 => TdmsValue::I64(read_native(r, endianness)?),
            TdmsDataType::U8 => TdmsValue::U8(read_native(r, endianness)?),
            TdmsDataType::U16 => TdmsValue::U16(read_native(r, endianness)?),
            TdmsDataType::U32 => TdmsValue::U32(read_native(r, endianness)?),
            TdmsDataType::U64 => TdmsValue::U64(read_native(r, endianness)?),
            TdmsDataType::SingleFloat | TdmsDataType::SingleFloatWithUnit => {
                TdmsValue::SingleFloat(read_native(r, endianness)?)
            }
            TdmsDataType::DoubleFloat | TdmsDataType::DoubleFloatWithUnit => {
                TdmsValue::DoubleFloat(read_native(r, endianness)?)
            }
            TdmsDataType::ExtendedFloat | TdmsDataType::ExtendedFloatWithUnit => {
                let mut buf: [u8; 10] = [0; 10];
                r.read_exact(&mut buf)?;
                TdmsValue::ExtendedFloat(extended_to_f64(buf, endianness))
            }
            TdmsDataType::String => TdmsValue::String(read_string(r, endianness)?),
            TdmsDataType::Boolean => TdmsValue::Boolean(read_native(r, endianness)?),
            TdmsDataType::TimeStamp => TdmsValue::TimeStamp(read_native(r, endianness)?),
            TdmsDataType::ComplexSingleFloat => {
                let re: f32 = read_native(r, endianness)?;
                TdmsValue::ComplexSingleFloat(re, read_native(r, endianness)?)
            }
            TdmsDataType::ComplexDoubleFloat => {
                let re: f64 = read_native(r, endianness)?;
                TdmsValue::ComplexDoubleFloat(re, read_native(r, endianness)?)
            }
            // no documented on-disk layout for these as property values
            TdmsDataType::FixedPoint | TdmsDataType::DAQmxRawData => {
                return Err(UnsupportedDataType(data_type))
            }
        };

        Ok(value)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            TdmsValue::I8(v) => Some(v as f64),
            TdmsValue::I16(v) => Some(v as f64),
            TdmsValue::I32(v) => Some(v as f64),
            TdmsValue::I64(v) => Some(v as f64),
            TdmsValue::U8(v) => Some(v as f64),
            TdmsValue::U16(v) => Some(v as f64),
            TdmsValue::U32(v) => Some(v as f64),
            TdmsValue::U64(v) => Some(v as f64),
            TdmsValue::SingleFloat(v) => Some(v as f64),
            TdmsValue::DoubleFloat(v) | TdmsValue::ExtendedFloat(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TdmsValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TdmsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TdmsValue::Void => write!(f, "(void)"),
            TdmsValue::I8(v) => write!(f, "{}", v),
            TdmsValue::I16(v) => write!(f, "{}", v),
            TdmsValue::I32(v) => write!(f, "{}", v),
            TdmsValue::I64(v) => write!(f, "{}", v),
            TdmsValue::U8(v) => write!(f, "{}", v),
            TdmsValue::U16(v) => write!(f, "{}", v),
            TdmsValue::U32(v) => write!(f, "{}", v),
            TdmsValue::U64(v) => write!(f, "{}", v),
            TdmsValue::SingleFloat(v) => write!(f, "{}", v),
            TdmsValue::DoubleFloat(v) | TdmsValue::ExtendedFloat(v) => write!(f, "{}", v),
            TdmsValue::String(v) => write!(f, "{}", v),
            TdmsValue::Boolean(v) => write!(f, "{}", v),
            TdmsValue::TimeStamp(v) => write!(f, "{}", v),
            TdmsValue::ComplexSingleFloat(re, im) => write!(f, "{}{:+}i", re, im),
            TdmsValue::ComplexDoubleFloat(re, im) => write!(f, "{}{:+}i", re, im),
        }
    }
}

/// `NativeType` is implemented by every Rust type a channel's raw data can be decoded into. Each
/// implementation knows which stored TDMS types it accepts and how wide a stored value is.
pub trait NativeType: Sized {
    /// name reported in type mismatch errors
    const NAME: &'static str;
    /// bytes occupied by one stored value
    const SIZE: usize;

    fn accepts(data_type: TdmsDataType) -> bool;

    /// decodes a value from exactly `SIZE` bytes
    fn from_bytes(buf: &[u8], endianness: Endianness) -> Self;
}

macro_rules! native_type {
    ( $t:ty, $size:expr, $( $accepted:path )|+ ) => {
        impl NativeType for $t {
            const NAME: &'static str = stringify!($t);
            const SIZE: usize = $size;

            fn accepts(data_type: TdmsDataType) -> bool {
                matches!(data_type, $( $accepted )|+)
            }

            fn from_bytes(buf: &[u8], endianness: Endianness) -> Self {
                let mut bytes: [u8; $size] = [0; $size];
                bytes.copy_from_slice(&buf[..$size]);
                from_bytes!($t, bytes, endianness)
            }
        }
    };
}

native_type!(i8, 1, TdmsDataType::I8);
native_type!(i16, 2, TdmsDataType::I16);
native_type!(i32, 4, TdmsDataType::I32);
native_type!(i64, 8, TdmsDataType::I64);
native_type!(u8, 1, TdmsDataType::U8);
native_type!(u16, 2, TdmsDataType::U16);
native_type!(u32, 4, TdmsDataType::U32);
native_type!(u64, 8, TdmsDataType::U64);
native_type!(
    f32,
    4,
    TdmsDataType::SingleFloat | TdmsDataType::SingleFloatWithUnit
);
native_type!(
    f64,
    8,
    TdmsDataType::DoubleFloat | TdmsDataType::DoubleFloatWithUnit
);

impl NativeType for bool {
    const NAME: &'static str = "bool";
    const SIZE: usize = 1;

    fn accepts(data_type: TdmsDataType) -> bool {
        data_type == TdmsDataType::Boolean
    }

    fn from_bytes(buf: &[u8], _: Endianness) -> Self {
        buf[0] != 0
    }
}

impl NativeType for TdmsTimestamp {
    const NAME: &'static str = "TdmsTimestamp";
    const SIZE: usize = 16;

    fn accepts(data_type: TdmsDataType) -> bool {
        data_type == TdmsDataType::TimeStamp
    }

    // little endian files store the fraction first, big endian files the seconds first
    fn from_bytes(buf: &[u8], endianness: Endianness) -> Self {
        let mut first: [u8; 8] = [0; 8];
        let mut second: [u8; 8] = [0; 8];
        first.copy_from_slice(&buf[0..8]);
        second.copy_from_slice(&buf[8..16]);

        match endianness {
            Endianness::Little => TdmsTimestamp {
                seconds_since_ni_epoch: i64::from_le_bytes(second),
                fractions_of_a_second: u64::from_le_bytes(first),
            },
            Endianness::Big => TdmsTimestamp {
                seconds_since_ni_epoch: i64::from_be_bytes(first),
                fractions_of_a_second: u64::from_be_bytes(second),
            },
        }
    }
}

/// Decoder widening one stored value of a numeric type into an `f64`.
pub type F64Decoder = fn(&[u8], Endianness) -> f64;

/// returns the widening decoder for a numeric type, `None` for every other type
pub fn f64_decoder(data_type: TdmsDataType) -> Option<F64Decoder> {
    let decoder: F64Decoder = match data_type {
        TdmsDataType::I8 => |b: &[u8], e: Endianness| i8::from_bytes(b, e) as f64,
        TdmsDataType::I16 => |b: &[u8], e: Endianness| i16::from_bytes(b, e) as f64,
        TdmsDataType::I32 => |b: &[u8], e: Endianness| i32::from_bytes(b, e) as f64,
        TdmsDataType::I64 => |b: &[u8], e: Endianness| i64::from_bytes(b, e) as f64,
        TdmsDataType::U8 => |b: &[u8], e: Endianness| u8::from_bytes(b, e) as f64,
        TdmsDataType::U16 => |b: &[u8], e: Endianness| u16::from_bytes(b, e) as f64,
        TdmsDataType::U32 => |b: &[u8], e: Endianness| u32::from_bytes(b, e) as f64,
        TdmsDataType::U64 => |b: &[u8], e: Endianness| u64::from_bytes(b, e) as f64,
        TdmsDataType::SingleFloat | TdmsDataType::SingleFloatWithUnit => {
            |b: &[u8], e: Endianness| f32::from_bytes(b, e) as f64
        }
        TdmsDataType::DoubleFloat | TdmsDataType::DoubleFloatWithUnit => {
            <f64 as NativeType>::from_bytes
        }
        TdmsDataType::ExtendedFloat | TdmsDataType::ExtendedFloatWithUnit => {
            |b: &[u8], e: Endianness| {
                let mut bytes: [u8; 10] = [0; 10];
                bytes.copy_from_slice(&b[..10]);
                extended_to_f64(bytes, e)
            }
        }
        _ => return None,
    };

    Some(decoder)
}

fn extended_to_f64(buf: [u8; 10], endianness: Endianness) -> f64 {
    match endianness {
        Endianness::Little => Extended::from_le_bytes(buf).to_f64(),
        Endianness::Big => Extended::from_be_bytes(buf).to_f64(),
    }
}

pub(crate) fn read_native<T: NativeType, R: Read>(
    r: &mut R,
    endianness: Endianness,
) -> Result<T, TdmsError> {
    let mut buf: [u8; 16] = [0; 16];
    r.read_exact(&mut buf[..T::SIZE])?;

    Ok(T::from_bytes(&buf[..T::SIZE], endianness))
}

pub(crate) fn read_u32<R: Read>(r: &mut R, endianness: Endianness) -> Result<u32, TdmsError> {
    read_native(r, endianness)
}

pub(crate) fn read_u64<R: Read>(r: &mut R, endianness: Endianness) -> Result<u64, TdmsError> {
    read_native(r, endianness)
}

/// reads a length prefixed UTF-8 string - all strings in TDMS files are encoded this way
pub(crate) fn read_string<R: Read>(r: &mut R, endianness: Endianness) -> Result<String, TdmsError> {
    let length = read_u32(r, endianness)?;
    let buf = read_bytes(r, length as u64)?;

    String::from_utf8(buf).map_err(|e| {
        StringConversionError(format!(
            "invalid UTF-8 in {}",
            hex::encode(e.as_bytes())
        ))
    })
}

/// reads exactly `length` bytes. The buffer only grows with the bytes actually read, so a
/// corrupt length fails with `UnexpectedEof` instead of allocating up front
pub(crate) fn read_bytes<R: Read>(r: &mut R, length: u64) -> Result<Vec<u8>, TdmsError> {
    let mut buf: Vec<u8> = vec![];
    r.by_ref().take(length).read_to_end(&mut buf)?;

    if (buf.len() as u64) < length {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    Ok(buf)
}
