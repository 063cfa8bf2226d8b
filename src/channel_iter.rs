use crate::segment::{DataBlock, Endianness};
use crate::TdmsError;
use log::error;
use std::io::{self, Read, Seek, SeekFrom};

/// `ChannelDataIter` walks a single channel's values across every segment and chunk it appears
/// in, decoding one value at a time straight from the reader. The number of values is known up
/// front, so the iterator reports an exact length.
///
/// A read failure is yielded once as an `Err` and ends the iteration.
pub struct ChannelDataIter<'a, T, R: Read + Seek> {
    reader: &'a mut R,
    blocks: Vec<DataBlock>,
    block_index: usize,
    value_index: u64,
    remaining: u64,
    element_size: usize,
    decode: fn(&[u8], Endianness) -> T,
    buf: [u8; 16],
}

impl<'a, T, R: Read + Seek> ChannelDataIter<'a, T, R> {
    pub(crate) fn new(
        reader: &'a mut R,
        blocks: Vec<DataBlock>,
        element_size: usize,
        decode: fn(&[u8], Endianness) -> T,
    ) -> Self {
        let remaining = blocks.iter().map(|b| b.number_of_values).sum();

        ChannelDataIter {
            reader,
            blocks,
            block_index: 0,
            value_index: 0,
            remaining,
            element_size,
            decode,
            buf: [0; 16],
        }
    }

    /// advance_reader_to_next moves the reader onto the next value - jumping to the next block when
    /// the current one is exhausted and skipping over other channels' interleaved values otherwise
    fn advance_reader_to_next(&mut self) -> Result<Endianness, TdmsError> {
        while self.blocks[self.block_index].number_of_values <= self.value_index {
            self.block_index += 1;
            self.value_index = 0;
        }

        let block = self.blocks[self.block_index];

        if self.value_index == 0 {
            self.reader.seek(SeekFrom::Start(block.start))?;
        } else {
            // read past rather than seek so a buffered reader keeps its buffer
            let skip = block.stride.saturating_sub(self.element_size as u64);
            if skip > 0 {
                io::copy(&mut (&mut *self.reader).take(skip), &mut io::sink())?;
            }
        }

        Ok(block.endianness)
    }

    fn read_next(&mut self) -> Result<T, TdmsError> {
        let endianness = self.advance_reader_to_next()?;

        let buf = &mut self.buf[..self.element_size];
        self.reader.read_exact(buf)?;
        self.value_index += 1;

        Ok((self.decode)(buf, endianness))
    }
}

impl<'a, T, R: Read + Seek> Iterator for ChannelDataIter<'a, T, R> {
    type Item = Result<T, TdmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match self.read_next() {
            Ok(value) => {
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(e) => {
                error!("error reading next value in channel: {}", e);
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<'a, T, R: Read + Seek> ExactSizeIterator for ChannelDataIter<'a, T, R> {}

impl<'a, T, R: Read + Seek> std::iter::FusedIterator for ChannelDataIter<'a, T, R> {}
