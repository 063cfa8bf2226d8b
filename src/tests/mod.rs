use crate::data_type::{
    f64_decoder, read_string, TdmsDataType, TdmsTimestamp, TdmsValue, NI_EPOCH_UNIX_OFFSET,
};
use crate::object_path::ObjectPath;
use crate::segment::{Endianness, LeadIn};
use crate::{TdmsError, TdmsFile};
use fixture::*;
use std::io::{Cursor, ErrorKind};


fn open(bytes: Vec<u8>) -> TdmsFile<Cursor<Vec<u8>>> {
    match TdmsFile::from_reader(Cursor::new(bytes)) {
        Ok(f) => f,
        Err(e) => panic!("{:?}", e),
    }
}

fn samples(file: &mut TdmsFile<Cursor<Vec<u8>>>, group: &str, channel: &str) -> Vec<f64> {
    file.samples(group, channel)
        .unwrap()
        .collect::<Result<Vec<f64>, TdmsError>>()
        .unwrap()
}

fn two_channels(toc: u32, a: &[f64], b: &[f64]) -> SegmentBuilder {
    SegmentBuilder::new(toc)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, a.len() as u64), &[])
        .object(
            "/'g'/'b'",
            Index::Raw(TYPE_F64, b.len() as u64),
            &[("unit_string", Prop::Str("V"))],
        )
        .raw_f64(a)
        .raw_f64(b)
}

#[test]
fn can_read_lead_in() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .version(4712)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 2), &[])
        .raw_f64(&[1.0, 2.0])
        .build();

    let mut lead_in = [0; LeadIn::SIZE];
    lead_in.copy_from_slice(&bytes[..LeadIn::SIZE]);
    let lead_in = LeadIn::from_bytes(&lead_in).unwrap();

    assert_eq!(lead_in.tag, [84, 68, 83, 109]);
    assert_eq!(lead_in.table_of_contents, TOC_DEFAULT);
    assert_eq!(lead_in.version_number, 4712);
    assert_eq!(lead_in.endianness(), Endianness::Little);
    assert_eq!(
        lead_in.next_segment_offset,
        (bytes.len() - LeadIn::SIZE) as u64
    );
    assert_eq!(lead_in.raw_data_offset, lead_in.next_segment_offset - 16);
}

#[test]
fn can_read_all_segments() {
    let file = open(ecg_recording(&[0.5, -1.25, 2.0, 3.0, 4.5]));

    assert_eq!(file.segments.len(), 2);
    assert_eq!(file.segments[0].start_pos, 0);
    assert_eq!(file.segments[0].end_pos, file.segments[1].start_pos);
    assert_eq!(
        file.segments[0].data_pos,
        LeadIn::SIZE as u64 + file.segments[0].lead_in.raw_data_offset
    );
    assert_eq!(file.segments[0].num_chunks, 1);
    assert!(file.segments.iter().all(|s| !s.truncated));
}

#[test]
fn can_read_groups_and_channels() {
    let file = open(ecg_recording(&[0.5, -1.25, 2.0, 3.0, 4.5]));

    assert_eq!(file.groups(), vec!["Intellivue"]);

    let channels: Vec<&str> = file
        .channels("Intellivue")
        .into_iter()
        .filter_map(|c| c.path.channel_name())
        .collect();
    assert_eq!(channels, vec!["CmpndECG(I)", "Pleth"]);

    let ecg = file.channel("Intellivue", "CmpndECG(I)").unwrap();
    assert_eq!(ecg.data_type, Some(TdmsDataType::DoubleFloat));
    assert_eq!(ecg.number_of_values, 5);
    assert_eq!(ecg.bytes, 40);
    assert_eq!(
        ecg.property("unit_string").and_then(|v| v.as_str()),
        Some("mV")
    );

    let root = file.properties().unwrap();
    assert_eq!(root["name"], TdmsValue::String(String::from("medi")));

    let group = file.object(&ObjectPath::group("Intellivue")).unwrap();
    assert_eq!(
        group.property("device"),
        Some(&TdmsValue::String(String::from("MP70")))
    );
}

#[test]
fn can_read_samples_across_segments() {
    let mut file = open(ecg_recording(&[0.5, -1.25, 2.0, 3.0, 4.5]));

    let iter = file.samples("Intellivue", "CmpndECG(I)").unwrap();
    assert_eq!(iter.len(), 5);

    assert_eq!(
        samples(&mut file, "Intellivue", "CmpndECG(I)"),
        vec![0.5, -1.25, 2.0, 3.0, 4.5]
    );
    assert_eq!(samples(&mut file, "Intellivue", "Pleth"), vec![5.0, -12.5]);
}

#[test]
fn reading_twice_gives_the_same_samples() {
    let mut file = open(ecg_recording(&[0.1, 0.2, 0.3, 0.4]));

    let first = samples(&mut file, "Intellivue", "CmpndECG(I)");
    let second = samples(&mut file, "Intellivue", "CmpndECG(I)");

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn can_read_repeated_chunks() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_I16, 2), &[])
        .object("/'g'/'b'", Index::Raw(TYPE_F32, 2), &[])
        .raw_i16(&[1, 2])
        .raw_f32(&[0.5, 1.5])
        .raw_i16(&[3, 4])
        .raw_f32(&[2.5, 3.5])
        .build();
    let mut file = open(bytes);

    assert_eq!(file.segments[0].chunk_size, 12);
    assert_eq!(file.segments[0].num_chunks, 2);
    assert_eq!(file.channel("g", "a").unwrap().number_of_values, 4);

    let a: Vec<i16> = file
        .channel_iter::<i16>("g", "a")
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(a, vec![1, 2, 3, 4]);
    assert_eq!(samples(&mut file, "g", "b"), vec![0.5, 1.5, 2.5, 3.5]);
}

#[test]
fn can_read_interleaved_data() {
    let a: [i16; 3] = [1, -2, 3];
    let b: [f64; 3] = [0.25, 0.5, 0.75];

    let mut builder = SegmentBuilder::new(TOC_DEFAULT | TOC_INTERLEAVED_DATA)
        .object("/'g'/'a'", Index::Raw(TYPE_I16, 3), &[])
        .object("/'g'/'b'", Index::Raw(TYPE_F64, 3), &[]);
    for i in 0..3 {
        builder = builder.raw_i16(&a[i..i + 1]).raw_f64(&b[i..i + 1]);
    }
    let mut file = open(builder.build());

    assert_eq!(file.segments[0].interleaved_row_size(), 10);
    assert_eq!(file.segments[0].num_chunks, 1);

    let read_a: Vec<i16> = file
        .channel_iter::<i16>("g", "a")
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(read_a, a.to_vec());

    let read_b: Vec<f64> = file
        .channel_iter::<f64>("g", "b")
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(read_b, b.to_vec());

    assert_eq!(samples(&mut file, "g", "a"), vec![1.0, -2.0, 3.0]);
}

#[test]
fn can_read_big_endian() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT | TOC_BIG_ENDIAN)
        .object(
            "/'Measured Data'",
            Index::NoData,
            &[
                ("count", Prop::I32(-7)),
                ("start", Prop::Timestamp(3_600_000_000, 1 << 63)),
            ],
        )
        .object(
            "/'Measured Data'/'Phase sweep'",
            Index::Raw(TYPE_F64, 3),
            &[("gain", Prop::F64(2.5))],
        )
        .raw_f64(&[1.5, -3.0, 1e-3])
        .build();
    let mut file = open(bytes);

    assert_eq!(file.segments[0].endianness(), Endianness::Big);

    let group = file.object(&ObjectPath::group("Measured Data")).unwrap();
    assert_eq!(group.property("count"), Some(&TdmsValue::I32(-7)));
    assert_eq!(
        group.property("start"),
        Some(&TdmsValue::TimeStamp(TdmsTimestamp {
            seconds_since_ni_epoch: 3_600_000_000,
            fractions_of_a_second: 1 << 63,
        }))
    );

    let channel = file.channel("Measured Data", "Phase sweep").unwrap();
    assert_eq!(channel.property("gain").and_then(|v| v.as_f64()), Some(2.5));

    assert_eq!(
        samples(&mut file, "Measured Data", "Phase sweep"),
        vec![1.5, -3.0, 1e-3]
    );
}

#[test]
fn inherits_metadata_from_previous_segments() {
    let first = two_channels(TOC_DEFAULT, &[1.0, 2.0], &[10.0, 20.0]).build();

    // raw data only, laid out exactly like the first segment
    let second = SegmentBuilder::new(TOC_RAW_DATA)
        .raw_f64(&[3.0, 4.0, 30.0, 40.0])
        .build();

    // keeps the object list, reuses b's index and appends c
    let third = SegmentBuilder::new(TOC_META_DATA | TOC_RAW_DATA)
        .object(
            "/'g'/'b'",
            Index::SameAsPrevious,
            &[("unit_string", Prop::Str("mV"))],
        )
        .object("/'g'/'c'", Index::Raw(TYPE_F64, 1), &[])
        .raw_f64(&[5.0, 6.0, 50.0, 60.0, 100.0])
        .build();

    let mut file = open(file(vec![first, second, third]));

    assert_eq!(file.segments.len(), 3);
    assert!(file.segments[1].metadata.is_none());
    assert_eq!(file.segments[2].objects.len(), 3);

    assert_eq!(
        samples(&mut file, "g", "a"),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
    assert_eq!(
        samples(&mut file, "g", "b"),
        vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]
    );
    assert_eq!(samples(&mut file, "g", "c"), vec![100.0]);

    // later property values replace earlier ones
    let b = file.channel("g", "b").unwrap();
    assert_eq!(b.property("unit_string").and_then(|v| v.as_str()), Some("mV"));
}

#[test]
fn new_object_list_replaces_previous_order() {
    let first = two_channels(TOC_DEFAULT, &[1.0, 2.0], &[10.0, 20.0]).build();
    let second = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'b'", Index::Raw(TYPE_F64, 1), &[])
        .raw_f64(&[30.0])
        .build();

    let mut file = open(file(vec![first, second]));

    assert_eq!(file.segments[1].objects.len(), 1);
    assert_eq!(samples(&mut file, "g", "a"), vec![1.0, 2.0]);
    assert_eq!(samples(&mut file, "g", "b"), vec![10.0, 20.0, 30.0]);
}

#[test]
fn no_data_index_skips_channel_in_segment() {
    let first = two_channels(TOC_DEFAULT, &[1.0], &[10.0]).build();
    let second = SegmentBuilder::new(TOC_META_DATA | TOC_RAW_DATA)
        .object("/'g'/'a'", Index::NoData, &[])
        .raw_f64(&[20.0])
        .build();

    let mut file = open(file(vec![first, second]));

    assert_eq!(samples(&mut file, "g", "a"), vec![1.0]);
    assert_eq!(samples(&mut file, "g", "b"), vec![10.0, 20.0]);
    // the type survives a segment without data
    assert_eq!(
        file.channel("g", "a").unwrap().data_type,
        Some(TdmsDataType::DoubleFloat)
    );
}

#[test]
fn channel_without_data_is_empty() {
    let bytes = SegmentBuilder::new(TOC_META_DATA | TOC_NEW_OBJ_LIST)
        .object("/'g'/'empty'", Index::NoData, &[])
        .build();
    let mut file = open(bytes);

    assert_eq!(file.segments[0].num_chunks, 0);
    assert_eq!(file.samples("g", "empty").unwrap().len(), 0);
    assert!(samples(&mut file, "g", "empty").is_empty());
    assert!(file.read_strings("g", "empty").unwrap().is_empty());
}

#[test]
fn can_read_string_channel() {
    let text = "hellowörld";
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object(
            "/'g'/'notes'",
            Index::RawString(3, 12 + text.len() as u64),
            &[],
        )
        .raw_u32(&[5, 5, text.len() as u32])
        .raw_bytes(text.as_bytes())
        .build();
    let mut file = open(bytes);

    assert_eq!(
        file.read_strings("g", "notes").unwrap(),
        vec!["hello", "", "wörld"]
    );

    assert!(matches!(
        file.samples("g", "notes"),
        Err(TdmsError::UnsupportedDataType(TdmsDataType::String))
    ));
    assert!(matches!(
        file.channel_iter::<f64>("g", "notes"),
        Err(TdmsError::ChannelTypeMismatch {
            stored: TdmsDataType::String,
            requested: "f64",
        })
    ));
}

#[test]
fn can_read_timestamp_channel() {
    let mut raw = vec![];
    for (fraction, seconds) in [(0u64, NI_EPOCH_UNIX_OFFSET), (1 << 63, NI_EPOCH_UNIX_OFFSET + 10)] {
        raw.extend_from_slice(&fraction.to_le_bytes());
        raw.extend_from_slice(&seconds.to_le_bytes());
    }

    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'time'", Index::Raw(TYPE_TIMESTAMP, 2), &[])
        .raw_bytes(&raw)
        .build();
    let mut file = open(bytes);

    let times: Vec<TdmsTimestamp> = file
        .channel_iter::<TdmsTimestamp>("g", "time")
        .unwrap()
        .map(|t| t.unwrap())
        .collect();

    assert_eq!(times.len(), 2);
    assert_eq!(times[0].unix_seconds(), 0.0);
    assert_eq!(times[1].seconds_since_ni_epoch, NI_EPOCH_UNIX_OFFSET + 10);
    assert_eq!(times[1].unix_seconds(), 10.5);

    assert!(matches!(
        file.samples("g", "time"),
        Err(TdmsError::UnsupportedDataType(TdmsDataType::TimeStamp))
    ));
}

#[test]
fn reports_missing_group_and_channel() {
    let mut file = open(ecg_recording(&[1.0, 2.0]));

    assert!(matches!(
        file.samples("Philips", "CmpndECG(I)"),
        Err(TdmsError::GroupDoesNotExist(g)) if g == "Philips"
    ));
    assert!(matches!(
        file.samples("Intellivue", "CmpndECG(II)"),
        Err(TdmsError::ChannelDoesNotExist(g, c)) if g == "Intellivue" && c == "CmpndECG(II)"
    ));
    // lookups are exact
    assert!(file.channel("intellivue", "CmpndECG(I)").is_err());
}

#[test]
fn rejects_mismatched_native_type() {
    let mut file = open(ecg_recording(&[1.0, 2.0]));

    assert!(matches!(
        file.channel_iter::<i32>("Intellivue", "CmpndECG(I)"),
        Err(TdmsError::ChannelTypeMismatch {
            stored: TdmsDataType::DoubleFloat,
            requested: "i32",
        })
    ));
}

#[test]
fn rejects_files_without_segments() {
    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(Vec::<u8>::new())),
        Err(TdmsError::InvalidSegment())
    ));

    let mut not_tdms = b"RIFF".to_vec();
    not_tdms.extend_from_slice(&[0; 40]);
    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(not_tdms)),
        Err(TdmsError::InvalidSegment())
    ));

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(b"TDSm".to_vec())),
        Err(TdmsError::InvalidSegment())
    ));
}

#[test]
fn ignores_trailing_bytes() {
    let mut bytes = ecg_recording(&[1.0, 2.0, 3.0]);
    bytes.extend_from_slice(b"this is definitely not a TDMS segment");
    let mut file = open(bytes);

    assert_eq!(file.segments.len(), 2);
    assert_eq!(
        samples(&mut file, "Intellivue", "CmpndECG(I)"),
        vec![1.0, 2.0, 3.0]
    );

    let mut bytes = ecg_recording(&[1.0, 2.0, 3.0]);
    bytes.extend_from_slice(&[0; 10]);
    assert_eq!(open(bytes).segments.len(), 2);
}

#[test]
fn reads_truncated_final_segment() {
    let first = two_channels(TOC_DEFAULT, &[1.0], &[2.0]).build();
    // an unfinished write: 2 values per chunk, two and a half chunks on disk
    let second = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 2), &[])
        .raw_f64(&[3.0, 4.0, 5.0, 6.0, 7.0])
        .next_segment_offset(u64::MAX)
        .build();

    let mut file = open(file(vec![first, second]));

    assert!(file.segments[1].truncated);
    assert_eq!(file.segments[1].num_chunks, 2);
    assert_eq!(
        samples(&mut file, "g", "a"),
        vec![1.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn rejects_partial_chunk_in_complete_segment() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 2), &[])
        .raw_f64(&[1.0, 2.0, 3.0])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::ChunkSizeMismatch {
            segment: 0,
            data_size: 24,
            chunk_size: 16,
        })
    ));
}

#[test]
fn rejects_missing_previous_segment() {
    let bytes = SegmentBuilder::new(TOC_RAW_DATA).raw_f64(&[1.0]).build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::MissingPreviousSegment(0))
    ));
}

#[test]
fn rejects_changed_data_type() {
    let first = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 1), &[])
        .raw_f64(&[1.0])
        .build();
    let second = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_I32, 1), &[])
        .raw_u32(&[1])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(file(vec![first, second]))),
        Err(TdmsError::DataTypeMismatch {
            previous: TdmsDataType::DoubleFloat,
            current: TdmsDataType::I32,
            ..
        })
    ));
}

#[test]
fn indexes_daqmx_channels_without_decoding() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT | TOC_DAQMX_RAW_DATA)
        .object("/'g'/'daq'", Index::DAQmx(2, vec![4]), &[])
        .raw_bytes(&[0; 8])
        .build();
    let mut file = open(bytes);

    let channel = file.channel("g", "daq").unwrap();
    assert_eq!(channel.data_type, Some(TdmsDataType::DAQmxRawData));
    assert_eq!(channel.number_of_values, 2);
    assert!(file.segments[0].has_daqmx_raw_data());

    assert!(matches!(
        file.samples("g", "daq"),
        Err(TdmsError::UnsupportedDataType(TdmsDataType::DAQmxRawData))
    ));
}

#[test]
fn listener_receives_contiguous_chunks() {
    let a: [i16; 2] = [7, 8];
    let b: [f64; 2] = [0.5, 1.5];

    let mut builder = SegmentBuilder::new(TOC_DEFAULT | TOC_INTERLEAVED_DATA)
        .object("/'g'/'a'", Index::Raw(TYPE_I16, 2), &[])
        .object("/'g'/'b'", Index::Raw(TYPE_F64, 2), &[]);
    for i in 0..2 {
        builder = builder.raw_i16(&a[i..i + 1]).raw_f64(&b[i..i + 1]);
    }
    let mut file = open(builder.build());

    let mut seen: Vec<(String, TdmsDataType, Vec<u8>, u64)> = vec![];
    let mut listener = |path: &ObjectPath,
                        data_type: TdmsDataType,
                        raw: &[u8],
                        number_of_values: u64,
                        _: Endianness| {
        seen.push((path.to_string(), data_type, raw.to_vec(), number_of_values));
    };
    file.load_segment(0, &mut listener).unwrap();
    assert!(file.load_segment(1, &mut listener).is_err());

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "/'g'/'a'");
    assert_eq!(seen[0].1, TdmsDataType::I16);
    assert_eq!(seen[0].2, vec![7, 0, 8, 0]);
    assert_eq!(seen[0].3, 2);

    let mut expected_b = 0.5f64.to_le_bytes().to_vec();
    expected_b.extend_from_slice(&1.5f64.to_le_bytes());
    assert_eq!(seen[1].0, "/'g'/'b'");
    assert_eq!(seen[1].2, expected_b);
}

#[test]
fn data_types_report_sizes() {
    assert_eq!(TdmsDataType::try_from(0x0Au32).unwrap(), TdmsDataType::DoubleFloat);
    assert_eq!(TdmsDataType::try_from(0x44u32).unwrap(), TdmsDataType::TimeStamp);
    assert!(matches!(
        TdmsDataType::try_from(0x99u32),
        Err(TdmsError::UnknownDataType(0x99))
    ));

    assert_eq!(TdmsDataType::ExtendedFloat.size(), Some(10));
    assert_eq!(TdmsDataType::ComplexDoubleFloat.size(), Some(16));
    assert_eq!(TdmsDataType::ComplexSingleFloat.size(), Some(8));
    assert_eq!(TdmsDataType::String.size(), None);
    assert_eq!(TdmsDataType::DoubleFloat.name(), "tdsTypeDoubleFloat");

    assert!(TdmsDataType::U16.is_numeric());
    assert!(TdmsDataType::ExtendedFloatWithUnit.is_numeric());
    assert!(!TdmsDataType::TimeStamp.is_numeric());
    assert!(!TdmsDataType::Boolean.is_numeric());
}

#[test]
fn widens_numeric_types_to_f64() {
    let decode = f64_decoder(TdmsDataType::I16).unwrap();
    assert_eq!(decode(&[0xff, 0xfe], Endianness::Big), -2.0);
    assert_eq!(decode(&[0xfe, 0xff], Endianness::Little), -2.0);

    let decode = f64_decoder(TdmsDataType::U32).unwrap();
    assert_eq!(decode(&[0, 0, 1, 0], Endianness::Big), 256.0);

    let decode = f64_decoder(TdmsDataType::SingleFloat).unwrap();
    assert_eq!(decode(&0.25f32.to_le_bytes(), Endianness::Little), 0.25);

    assert!(f64_decoder(TdmsDataType::Boolean).is_none());
    assert!(f64_decoder(TdmsDataType::String).is_none());
}

#[test]
fn rejects_value_counts_that_overflow() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, u64::MAX / 4), &[])
        .raw_f64(&[1.0, 2.0])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::InvalidRawDataIndex(path)) if path == "/'g'/'a'"
    ));

    // more strings than their byte count has room for offsets
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'notes'", Index::RawString(u64::MAX / 2, 8), &[])
        .raw_u32(&[1, 2])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::InvalidRawDataIndex(_))
    ));
}

#[test]
fn rejects_chunk_sizes_that_overflow() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'a'", Index::Raw(TYPE_F64, u64::MAX / 16), &[])
        .object("/'g'/'b'", Index::Raw(TYPE_F64, u64::MAX / 16), &[])
        .object("/'g'/'c'", Index::Raw(TYPE_F64, u64::MAX / 16), &[])
        .raw_f64(&[1.0])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::General(_))
    ));
}

#[test]
fn rejects_daqmx_index_without_raw_widths() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT | TOC_DAQMX_RAW_DATA)
        .object("/'g'/'daq'", Index::DAQmx(u64::MAX, vec![0]), &[])
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 1), &[])
        .raw_f64(&[1.0])
        .build();

    assert!(matches!(
        TdmsFile::from_reader(Cursor::new(bytes)),
        Err(TdmsError::InvalidDAQmxDataIndex())
    ));
}

#[test]
fn void_channel_holds_no_values() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'void'", Index::Raw(0, 3), &[])
        .object("/'g'/'a'", Index::Raw(TYPE_F64, 3), &[])
        .raw_f64(&[1.0, 2.0, 3.0])
        .build();
    let mut file = open(bytes);

    let void = file.channel("g", "void").unwrap();
    assert_eq!(void.number_of_values, 0);
    assert_eq!(void.data_type, None);

    assert_eq!(file.samples("g", "void").unwrap().len(), 0);
    assert!(samples(&mut file, "g", "void").is_empty());
    assert_eq!(samples(&mut file, "g", "a"), vec![1.0, 2.0, 3.0]);
}

#[test]
fn corrupt_string_length_fails_without_reading_past_the_data() {
    // a length of almost 4 GiB followed by three bytes
    let data: Vec<u8> = vec![0xF0, 0xFF, 0xFF, 0xFF, b'a', b'b', b'c'];

    match read_string(&mut data.as_slice(), Endianness::Little) {
        Err(TdmsError::ReadError(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("{:?}", other),
    }

    let data: Vec<u8> = vec![3, 0, 0, 0, b'a', b'b', b'c'];
    assert_eq!(
        read_string(&mut data.as_slice(), Endianness::Little).unwrap(),
        "abc"
    );
}

#[test]
fn corrupt_string_offset_is_a_read_error() {
    let bytes = SegmentBuilder::new(TOC_DEFAULT)
        .object("/'g'/'notes'", Index::RawString(1, 7), &[])
        .raw_u32(&[0xFFFFFF00])
        .raw_bytes(b"abc")
        .build();
    let mut file = open(bytes);

    match file.read_strings("g", "notes") {
        Err(TdmsError::ReadError(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("{:?}", other),
    }
}

#[test]
fn can_read_daqmx_digital_line_index() {
    for toc in [TOC_DEFAULT, TOC_DEFAULT | TOC_BIG_ENDIAN] {
        let bytes = SegmentBuilder::new(toc | TOC_DAQMX_RAW_DATA)
            .object("/'g'/'lines'", Index::DigitalLine(3, vec![1]), &[])
            .raw_bytes(&[1, 0, 1])
            .build();
        let file = open(bytes);

        let channel = file.channel("g", "lines").unwrap();
        assert_eq!(channel.data_type, Some(TdmsDataType::DAQmxRawData));
        assert_eq!(channel.number_of_values, 3);
        assert_eq!(file.segments[0].chunk_size, 3);
    }
}
