use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Opens a typing table, transparently peeling off a GZIP layer and a
/// leading UTF-8 byte order mark so the CSV reader sees plain text.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    wrap(BufReader::new(file))
}

/// Same as [`open_input`] for an already opened stream.
pub fn wrap<R>(mut reader: R) -> io::Result<Box<dyn BufRead + Send>>
where
    R: BufRead + Send + 'static,
{
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    let mut reader: Box<dyn BufRead + Send> = if is_gzip {
        tracing::debug!("Detected GZIP layer");
        // MultiGzDecoder also accepts BGZF and concatenated members
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };

    if reader.fill_buf()?.starts_with(&UTF8_BOM) {
        tracing::debug!("Skipping UTF-8 byte order mark");
        reader.consume(UTF8_BOM.len());
    }

    Ok(reader)
}
