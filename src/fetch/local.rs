use async_trait::async_trait;
use bytes::Bytes;
use std::fs::File;
use std::path::Path;

use super::{ByteRange, RangeFetcher};
use crate::error::Result;

/// Local file fetcher with positional reads
pub struct LocalFileFetcher {
    file: File,
    length: u64,
}

impl LocalFileFetcher {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self { file, length })
    }

    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    #[cfg(windows)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        use std::os::windows::fs::FileExt;
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.file.seek_read(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            filled += n;
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        // seek-then-read shares the file cursor; fetch_ranges callers are
        // serialized per call, which is all this fallback supports
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }
}

#[async_trait]
impl RangeFetcher for LocalFileFetcher {
    async fn expected_length(&self) -> Result<u64> {
        Ok(self.length)
    }

    async fn fetch_ranges(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>> {
        let mut out = Vec::with_capacity(ranges.len());
        for range in ranges {
            let mut buf = vec![0u8; range.len() as usize];
            self.read_exact_at(&mut buf, range.start)?;
            out.push(Bytes::from(buf));
        }
        Ok(out)
    }
}
