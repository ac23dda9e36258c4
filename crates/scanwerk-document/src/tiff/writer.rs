// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Streaming multi-page TIFF writer.
//
// Rows go straight to the end of the file as they arrive; when a page is
// finalized its directory is written after the image data and linked from
// the previous directory (or the header). The file uses the host byte order
// so 16-bit samples delivered by the device are stored as-is.
//
// With compression on, bilevel pages are PackBits-packed row by row and
// deeper pages are Deflate-compressed one strip at a time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{NativeEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use tracing::{debug, instrument, warn};

use scanwerk_core::error::{Result, ScanwerkError};

use crate::container::{ContainerEncoder, Field, PageContainer};
use crate::packbits;
use crate::template;
use crate::tiff::tags::{self, Value};

const BYTE_ORDER_MARK: &[u8; 2] = if cfg!(target_endian = "little") {
    b"II"
} else {
    b"MM"
};
const MAGIC: u16 = 42;
const HEADER_LEN: u64 = 8;
const FIRST_IFD_SLOT: u64 = 4;
const STRIP_TARGET_BYTES: usize = 8 * 1024;

/// Opens TIFF containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffEncoder {
    /// Losslessly compress image data.
    pub compress: bool,
}

/// Strip compression of one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Codec {
    #[default]
    None,
    PackBits,
    Deflate,
}

impl Codec {
    fn for_depth(compress: bool, depth: u16) -> Self {
        match (compress, depth) {
            (false, _) => Self::None,
            (true, 1) => Self::PackBits,
            (true, _) => Self::Deflate,
        }
    }

    fn tag(self) -> u16 {
        match self {
            Self::None => tags::COMPRESSION_NONE,
            Self::PackBits => tags::COMPRESSION_PACKBITS,
            Self::Deflate => tags::COMPRESSION_DEFLATE,
        }
    }
}

impl TiffEncoder {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }
}

impl ContainerEncoder for TiffEncoder {
    type Container = TiffContainer;

    #[instrument(skip(self))]
    fn open(&self, template: &str, page: i32) -> Result<TiffContainer> {
        let path = PathBuf::from(template::render(template, page)?);
        let file = File::create(&path).map_err(|e| {
            ScanwerkError::Container(format!("cannot open {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), compress = self.compress, "opened container");
        TiffContainer::create(path, file, self.compress)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "removing empty container");
        std::fs::remove_file(path)?;
        Ok(())
    }
}

/// The page currently being written.
#[derive(Debug, Default)]
struct Page {
    fields: BTreeMap<u16, Value>,
    rows: u32,
    row_len: usize,
    rows_per_strip: u32,
    codec: Codec,
    data_start: u64,
    strip_bytes: Vec<u32>,
    /// Raw rows of the strip being collected for Deflate.
    pending: Vec<u8>,
}

/// An open TIFF file.
#[derive(Debug)]
pub struct TiffContainer {
    path: PathBuf,
    out: BufWriter<File>,
    compress: bool,
    /// Bytes written so far; the next write lands here.
    pos: u64,
    /// Where the offset of the next directory must be stored.
    next_ifd_slot: u64,
    page: Page,
    pages: usize,
    scratch: Vec<u8>,
}

impl TiffContainer {
    fn create(path: PathBuf, file: File, compress: bool) -> Result<Self> {
        let mut out = BufWriter::new(file);
        out.write_all(BYTE_ORDER_MARK)?;
        out.write_u16::<NativeEndian>(MAGIC)?;
        out.write_u32::<NativeEndian>(0)?;
        Ok(Self {
            path,
            out,
            compress,
            pos: HEADER_LEN,
            next_ifd_slot: FIRST_IFD_SLOT,
            page: Page::default(),
            pages: 0,
            scratch: Vec::new(),
        })
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    fn align_to_word(&mut self) -> Result<()> {
        if self.pos % 2 == 1 {
            self.put(&[0])?;
        }
        Ok(())
    }

    fn offset(&self) -> Result<u32> {
        u32::try_from(self.pos)
            .map_err(|_| ScanwerkError::Container("TIFF file exceeds 4 GiB".into()))
    }

    /// Fill in the fields the writer owns and check the ones the caller must set.
    fn complete_fields(&self, page: &Page) -> Result<BTreeMap<u16, Value>> {
        let mut fields = page.fields.clone();
        for (tag, name) in [
            (tags::IMAGE_WIDTH, "ImageWidth"),
            (tags::BITS_PER_SAMPLE, "BitsPerSample"),
            (tags::PHOTOMETRIC, "PhotometricInterpretation"),
        ] {
            if !fields.contains_key(&tag) {
                return Err(ScanwerkError::Container(format!("page lacks {name}")));
            }
        }

        let samples = match fields.get(&tags::SAMPLES_PER_PIXEL) {
            Some(Value::Short(v)) => v.first().copied().unwrap_or(1),
            _ => 1,
        };
        fields.insert(tags::SAMPLES_PER_PIXEL, Value::Short(vec![samples]));
        if let Some(Value::Short(bits)) = fields.get_mut(&tags::BITS_PER_SAMPLE) {
            let depth = bits.first().copied().unwrap_or(8);
            *bits = vec![depth; usize::from(samples)];
        }

        let subfile = if fields.contains_key(&tags::PAGE_NUMBER) {
            tags::SUBFILE_PAGE
        } else {
            0
        };

        let mut offsets = Vec::with_capacity(page.strip_bytes.len());
        let mut at = page.data_start;
        for &len in &page.strip_bytes {
            offsets.push(
                u32::try_from(at)
                    .map_err(|_| ScanwerkError::Container("TIFF file exceeds 4 GiB".into()))?,
            );
            at += u64::from(len);
        }

        fields.insert(tags::NEW_SUBFILE_TYPE, Value::Long(vec![subfile]));
        fields.insert(tags::IMAGE_LENGTH, Value::Long(vec![page.rows]));
        fields.insert(tags::COMPRESSION, Value::Short(vec![page.codec.tag()]));
        fields.insert(tags::FILL_ORDER, Value::Short(vec![1]));
        fields.insert(tags::PLANAR_CONFIGURATION, Value::Short(vec![1]));
        fields.insert(
            tags::ROWS_PER_STRIP,
            Value::Long(vec![page.rows_per_strip.max(1)]),
        );
        fields.insert(tags::STRIP_OFFSETS, Value::Long(offsets));
        fields.insert(tags::STRIP_BYTE_COUNTS, Value::Long(page.strip_bytes.clone()));
        Ok(fields)
    }

    fn depth(&self) -> u16 {
        match self.page.fields.get(&tags::BITS_PER_SAMPLE) {
            Some(Value::Short(bits)) => bits.first().copied().unwrap_or(8),
            _ => 8,
        }
    }

    /// Compress the collected Deflate strip and append it to the file.
    fn flush_strip(&mut self) -> Result<()> {
        if self.page.pending.is_empty() {
            return Ok(());
        }
        let mut raw = std::mem::take(&mut self.page.pending);
        let mut encoder =
            ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
        encoder.write_all(&raw)?;
        let packed = encoder.finish()?;
        self.put(&packed)?;
        if let Some(last) = self.page.strip_bytes.last_mut() {
            *last += packed.len() as u32;
        }
        raw.clear();
        self.page.pending = raw;
        Ok(())
    }

    /// Write `fields` as a directory and link it into the chain.
    fn write_directory(&mut self, fields: &BTreeMap<u16, Value>) -> Result<()> {
        let mut remote = BTreeMap::new();
        for (&tag, value) in fields {
            if value.byte_len() > 4 {
                self.align_to_word()?;
                remote.insert(tag, self.offset()?);
                let mut buf = Vec::with_capacity(value.byte_len());
                encode_value(value, &mut buf)?;
                self.put(&buf)?;
            }
        }

        self.align_to_word()?;
        let ifd = self.offset()?;
        let mut buf = Vec::with_capacity(2 + fields.len() * 12 + 4);
        buf.write_u16::<NativeEndian>(fields.len() as u16)?;
        for (&tag, value) in fields {
            buf.write_u16::<NativeEndian>(tag)?;
            buf.write_u16::<NativeEndian>(value.type_code())?;
            buf.write_u32::<NativeEndian>(value.count())?;
            match remote.get(&tag) {
                Some(&offset) => buf.write_u32::<NativeEndian>(offset)?,
                None => {
                    let start = buf.len();
                    encode_value(value, &mut buf)?;
                    buf.resize(start + 4, 0);
                }
            }
        }
        buf.write_u32::<NativeEndian>(0)?;
        self.put(&buf)?;

        self.out.seek(SeekFrom::Start(self.next_ifd_slot))?;
        self.out.write_u32::<NativeEndian>(ifd)?;
        self.out.seek(SeekFrom::Start(self.pos))?;
        self.next_ifd_slot = u64::from(ifd) + 2 + fields.len() as u64 * 12;
        Ok(())
    }
}

impl PageContainer for TiffContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn set_field(&mut self, field: Field) -> Result<()> {
        for (tag, value) in tags::entries(&field) {
            self.page.fields.insert(tag, value);
        }
        Ok(())
    }

    fn write_row(&mut self, row: u32, bytes: &[u8]) -> Result<()> {
        if row != self.page.rows {
            return Err(ScanwerkError::Container(format!(
                "row {row} written out of order, expected {}",
                self.page.rows
            )));
        }
        if row == 0 {
            self.page.row_len = bytes.len();
            self.page.rows_per_strip = (STRIP_TARGET_BYTES / bytes.len().max(1)).max(1) as u32;
            self.page.data_start = self.pos;
            self.page.codec = Codec::for_depth(self.compress, self.depth());
        } else if bytes.len() != self.page.row_len {
            return Err(ScanwerkError::Container(format!(
                "row {row} is {} bytes, expected {}",
                bytes.len(),
                self.page.row_len
            )));
        }

        if row % self.page.rows_per_strip == 0 {
            self.page.strip_bytes.push(0);
        }

        let written = match self.page.codec {
            Codec::None => {
                self.put(bytes)?;
                bytes.len()
            }
            Codec::PackBits => {
                let mut scratch = std::mem::take(&mut self.scratch);
                scratch.clear();
                packbits::encode_row(bytes, &mut scratch);
                let result = self.put(&scratch);
                let written = scratch.len();
                self.scratch = scratch;
                result?;
                written
            }
            Codec::Deflate => {
                self.page.pending.extend_from_slice(bytes);
                0
            }
        };
        if let Some(last) = self.page.strip_bytes.last_mut() {
            *last += written as u32;
        }
        self.page.rows += 1;

        if self.page.codec == Codec::Deflate && self.page.rows % self.page.rows_per_strip == 0 {
            self.flush_strip()?;
        }
        Ok(())
    }

    fn finalize_page(&mut self) -> Result<()> {
        self.flush_strip()?;
        let page = std::mem::take(&mut self.page);
        if page.rows == 0 {
            warn!(
                path = %self.path.display(),
                "the scanner sent no image data, writing an empty page"
            );
        }
        let fields = self.complete_fields(&page)?;
        self.write_directory(&fields)?;
        self.pages += 1;
        debug!(
            path = %self.path.display(),
            page = self.pages,
            rows = page.rows,
            strips = page.strip_bytes.len(),
            "page written"
        );
        Ok(())
    }

    fn pages(&self) -> usize {
        self.pages
    }

    fn close(mut self) -> Result<PathBuf> {
        if self.page.rows > 0 {
            warn!(
                rows = self.page.rows,
                "closing container with an unfinished page, discarding it"
            );
        }
        self.out.flush()?;
        Ok(self.path)
    }
}

fn encode_value(value: &Value, buf: &mut Vec<u8>) -> io::Result<()> {
    match value {
        Value::Short(v) => {
            for &x in v {
                buf.write_u16::<NativeEndian>(x)?;
            }
        }
        Value::Long(v) => {
            for &x in v {
                buf.write_u32::<NativeEndian>(x)?;
            }
        }
        Value::Rational(num, den) => {
            buf.write_u32::<NativeEndian>(*num)?;
            buf.write_u32::<NativeEndian>(*den)?;
        }
        Value::Ascii(s) => {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
    }
    Ok(())
}
