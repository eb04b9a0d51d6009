//! Length-delimited, zlib-compressed record files.
//!
//! A record file is one zlib stream holding a sequence of frames:
//!
//! ```text
//! u64 LE   payload length
//! u32 LE   masked CRC32 of the 8 length bytes
//! [u8]     payload (a JSON-encoded [`EncodedRecord`])
//! u32 LE   masked CRC32 of the payload
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

const MASK_DELTA: u32 = 0xa282_ead8;

fn masked_crc(bytes: &[u8]) -> u32 {
    let crc = crc32fast::hash(bytes);
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// One sequence example as it is stored on disk.
///
/// Rows are time steps. `output` is present in train and validation files,
/// `metadata` (level in column 0, seasonality after it) in validation and
/// test files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    /// True sequence length.
    pub length: usize,
    /// Input rows, `length` rows of `input_size` values.
    pub input: Vec<Vec<f32>>,
    /// Target rows, `length` rows of `output_size` values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<Vec<f32>>>,
    /// Denormalization rows, `length` rows of `output_size + 1` values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<Vec<f32>>>,
}

/// Writes framed records into a zlib stream.
pub struct RecordWriter<W: Write> {
    encoder: ZlibEncoder<W>,
    written: usize,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) a record file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            encoder: ZlibEncoder::new(writer, Compression::default()),
            written: 0,
        }
    }

    /// Append one raw payload as a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let length = payload.len() as u64;
        let length_bytes = length.to_le_bytes();
        self.encoder.write_all(&length_bytes)?;
        self.encoder.write_u32::<LittleEndian>(masked_crc(&length_bytes))?;
        self.encoder.write_all(payload)?;
        self.encoder.write_u32::<LittleEndian>(masked_crc(payload))?;
        self.written += 1;
        Ok(())
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_record(&mut self, record: &EncodedRecord) -> Result<()> {
        let payload = serde_json::to_vec(record).map_err(|source| DataError::Payload {
            record: self.written,
            source,
        })?;
        self.write_payload(&payload)
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Flush the compressed stream and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn finish(self) -> Result<W> {
        let mut inner = self.encoder.finish()?;
        inner.flush()?;
        Ok(inner)
    }
}

/// Reads framed records from a zlib stream.
///
/// Iterating yields raw payloads; the iterator ends at a clean end of
/// stream and yields an error for truncated or corrupted frames.
pub struct RecordReader<R: Read> {
    decoder: ZlibDecoder<R>,
    position: usize,
    failed: bool,
}

impl RecordReader<BufReader<File>> {
    /// Open a record file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap a reader positioned at the start of a zlib stream.
    pub fn new(reader: R) -> Self {
        Self {
            decoder: ZlibDecoder::new(reader),
            position: 0,
            failed: false,
        }
    }

    /// Read the next payload, or `None` at a clean end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error for truncated frames, checksum mismatches and I/O failures.
    pub fn read_payload(&mut self) -> Result<Option<Vec<u8>>> {
        let record = self.position;
        let mut length_bytes = [0u8; 8];
        if !self.fill_or_eof(&mut length_bytes)? {
            return Ok(None);
        }

        let length_crc = self.read_u32(record)?;
        if length_crc != masked_crc(&length_bytes) {
            return Err(DataError::ChecksumMismatch {
                record,
                part: "length",
            });
        }

        let length = usize::try_from(u64::from_le_bytes(length_bytes))
            .map_err(|_| DataError::format(record, "payload length does not fit in memory"))?;
        let mut payload = vec![0u8; length];
        self.decoder
            .read_exact(&mut payload)
            .map_err(|e| truncated_or_io(e, record))?;

        let payload_crc = self.read_u32(record)?;
        if payload_crc != masked_crc(&payload) {
            return Err(DataError::ChecksumMismatch {
                record,
                part: "payload",
            });
        }

        self.position += 1;
        Ok(Some(payload))
    }

    /// Read and decode the next record.
    ///
    /// # Errors
    ///
    /// Returns an error for framing failures and undecodable payloads.
    pub fn read_record(&mut self) -> Result<Option<EncodedRecord>> {
        let record = self.position;
        match self.read_payload()? {
            Some(payload) => serde_json::from_slice(&payload)
                .map(Some)
                .map_err(|source| DataError::Payload { record, source }),
            None => Ok(None),
        }
    }

    /// Number of frames read so far.
    pub fn position(&self) -> usize {
        self.position
    }

    fn read_u32(&mut self, record: usize) -> Result<u32> {
        self.decoder
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated_or_io(e, record))
    }

    /// Fill `buf` completely, or report a clean end of stream when no byte
    /// at all is available.
    fn fill_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.decoder.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(DataError::Truncated {
                        record: self.position,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<EncodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn truncated_or_io(error: std::io::Error, record: usize) -> DataError {
    if error.kind() == ErrorKind::UnexpectedEof {
        DataError::Truncated { record }
    } else {
        DataError::IoError(error)
    }
}

/// Write a whole record file in one go.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[EncodedRecord]) -> Result<()> {
    let mut writer = RecordWriter::create(path)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()?;
    Ok(())
}
