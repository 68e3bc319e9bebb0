/// Minimal EXIF (TIFF) directory walker
///
/// Only the tags needed for capture time are read. The input is the raw EXIF
/// block handed out by the image decoder, with or without the APP1
/// `Exif\0\0` marker in front.

/// IFD0 tag: date and time the file was last changed
pub const TAG_DATE_TIME: u16 = 0x0132;

/// IFD0 tag: offset of the Exif sub-IFD
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;

/// Exif sub-IFD tag: date and time the picture was taken
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

const EXIF_MARKER: &[u8] = b"Exif\0\0";
const TIFF_MAGIC: u16 = 42;
const ENTRY_SIZE: usize = 12;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_IFD: u16 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Intel,
    Motorola,
}

/// Borrowed view over a TIFF-structured EXIF block
#[derive(Debug, Clone, Copy)]
pub struct ExifBlock<'a> {
    tiff: &'a [u8],
    order: ByteOrder,
    ifd0: usize,
}

impl<'a> ExifBlock<'a> {
    /// Validate the TIFF header and locate IFD0.
    /// Returns None for anything that is not a well-formed header.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let tiff = data.strip_prefix(EXIF_MARKER).unwrap_or(data);

        let order = match tiff.get(0..2)? {
            b"II" => ByteOrder::Intel,
            b"MM" => ByteOrder::Motorola,
            _ => return None,
        };

        let block = ExifBlock { tiff, order, ifd0: 0 };
        if block.u16_at(2)? != TIFF_MAGIC {
            return None;
        }

        let ifd0 = block.u32_at(4)? as usize;
        Some(ExifBlock { ifd0, ..block })
    }

    /// Read an ASCII tag from IFD0, then from the Exif sub-IFD.
    /// Trailing NULs and whitespace are stripped; empty values count as absent.
    pub fn ascii(&self, tag: u16) -> Option<String> {
        if let Some(value) = self.ascii_in(self.ifd0, tag) {
            return Some(value);
        }

        let exif_ifd = self.pointer_in(self.ifd0, TAG_EXIF_IFD_POINTER)?;
        self.ascii_in(exif_ifd, tag)
    }

    fn ascii_in(&self, ifd: usize, tag: u16) -> Option<String> {
        let entry = self.find_entry(ifd, tag)?;
        if self.u16_at(entry + 2)? != TYPE_ASCII {
            return None;
        }

        let count = self.u32_at(entry + 4)? as usize;
        // Values of up to four bytes live inside the entry itself
        let start = if count <= 4 {
            entry + 8
        } else {
            self.u32_at(entry + 8)? as usize
        };

        let raw = self.tiff.get(start..start.checked_add(count)?)?;
        let value = String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .trim()
            .to_string();

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn pointer_in(&self, ifd: usize, tag: u16) -> Option<usize> {
        let entry = self.find_entry(ifd, tag)?;
        match self.u16_at(entry + 2)? {
            TYPE_LONG | TYPE_IFD => self.u32_at(entry + 8).map(|offset| offset as usize),
            _ => None,
        }
    }

    fn find_entry(&self, ifd: usize, tag: u16) -> Option<usize> {
        let count = self.u16_at(ifd)? as usize;
        (0..count)
            .map(|i| ifd + 2 + i * ENTRY_SIZE)
            .take_while(|&entry| entry + ENTRY_SIZE <= self.tiff.len())
            .find(|&entry| self.u16_at(entry) == Some(tag))
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.tiff.get(offset..offset + 2)?.try_into().ok()?;
        Some(match self.order {
            ByteOrder::Intel => u16::from_le_bytes(bytes),
            ByteOrder::Motorola => u16::from_be_bytes(bytes),
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.tiff.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self.order {
            ByteOrder::Intel => u32::from_le_bytes(bytes),
            ByteOrder::Motorola => u32::from_be_bytes(bytes),
        })
    }
}

/// Build a TIFF block with `DateTime` in IFD0 and `DateTimeOriginal` in the
/// Exif sub-IFD. Either value may be empty, in which case its tag is omitted.
#[cfg(test)]
pub(crate) fn sample_block(big_endian: bool, date_time: &str, original: &str) -> Vec<u8> {
    let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

    let date_time = format!("{}\0", date_time);
    let original = format!("{}\0", original);
    let with_date_time = date_time.len() > 1;
    let with_original = original.len() > 1;

    let ifd0_entries: u16 = if with_date_time { 2 } else { 1 };
    let ifd0_len = 2 + ifd0_entries as usize * ENTRY_SIZE + 4;
    let date_time_offset = 8 + ifd0_len;
    let sub_ifd_offset = date_time_offset + if with_date_time { date_time.len() } else { 0 };
    let sub_entries: u16 = if with_original { 1 } else { 0 };
    let sub_len = 2 + sub_entries as usize * ENTRY_SIZE + 4;
    let original_offset = sub_ifd_offset + sub_len;

    let mut out = Vec::new();
    let entry = |out: &mut Vec<u8>, tag: u16, kind: u16, count: usize, value: usize| {
        out.extend_from_slice(&u16b(tag));
        out.extend_from_slice(&u16b(kind));
        out.extend_from_slice(&u32b(count as u32));
        out.extend_from_slice(&u32b(value as u32));
    };

    out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    out.extend_from_slice(&u16b(TIFF_MAGIC));
    out.extend_from_slice(&u32b(8));

    out.extend_from_slice(&u16b(ifd0_entries));
    if with_date_time {
        entry(&mut out, TAG_DATE_TIME, TYPE_ASCII, date_time.len(), date_time_offset);
    }
    entry(&mut out, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, sub_ifd_offset);
    out.extend_from_slice(&u32b(0));
    if with_date_time {
        out.extend_from_slice(date_time.as_bytes());
    }

    out.extend_from_slice(&u16b(sub_entries));
    if with_original {
        entry(&mut out, TAG_DATE_TIME_ORIGINAL, TYPE_ASCII, original.len(), original_offset);
    }
    out.extend_from_slice(&u32b(0));
    if with_original {
        out.extend_from_slice(original.as_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_both_tags_little_endian() {
        let data = sample_block(false, "2023:10:27 10:30:00", "2023:10:27 10:29:58");
        let block = ExifBlock::parse(&data).unwrap();

        assert_eq!(block.ascii(TAG_DATE_TIME).as_deref(), Some("2023:10:27 10:30:00"));
        assert_eq!(
            block.ascii(TAG_DATE_TIME_ORIGINAL).as_deref(),
            Some("2023:10:27 10:29:58")
        );
    }

    #[test]
    fn test_reads_big_endian_with_app1_marker() {
        let mut data = EXIF_MARKER.to_vec();
        data.extend(sample_block(true, "2024:01:02 03:04:05", "2024:01:02 03:04:06.120"));
        let block = ExifBlock::parse(&data).unwrap();

        assert_eq!(
            block.ascii(TAG_DATE_TIME_ORIGINAL).as_deref(),
            Some("2024:01:02 03:04:06.120")
        );
    }

    #[test]
    fn test_missing_tags() {
        let data = sample_block(false, "", "");
        let block = ExifBlock::parse(&data).unwrap();

        assert_eq!(block.ascii(TAG_DATE_TIME), None);
        assert_eq!(block.ascii(TAG_DATE_TIME_ORIGINAL), None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ExifBlock::parse(b"").is_none());
        assert!(ExifBlock::parse(b"not a tiff header").is_none());
        // Right byte order marker, wrong magic number
        assert!(ExifBlock::parse(&[b'I', b'I', 0, 0, 8, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_truncated_block_does_not_panic() {
        let data = sample_block(false, "2023:10:27 10:30:00", "2023:10:27 10:29:58");
        for len in 0..data.len() {
            if let Some(block) = ExifBlock::parse(&data[..len]) {
                let _ = block.ascii(TAG_DATE_TIME_ORIGINAL);
                let _ = block.ascii(TAG_DATE_TIME);
            }
        }
    }
}
