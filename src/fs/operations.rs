use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Checks whether the file ends right after a line break (or is empty).
///
/// A writer killed halfway through a line leaves an unterminated tail behind. Appending right
/// after it would glue the next line to garbage, so writers use this to decide whether the
/// tail has to be sealed first.
pub async fn ends_at_line_boundary(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
) -> Result<bool, io::Error> {
    let length = file.seek(std::io::SeekFrom::End(0)).await?;
    if length == 0 {
        return Ok(true);
    }
    file.seek(std::io::SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}
