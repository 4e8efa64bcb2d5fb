use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::{fs::operations::ends_at_line_boundary, utils::time::date_to_record_name};

use super::entities::ActivityRecord;

/// Interface for abstracting storage of records.
pub trait LogStore {
    /// Appends a single record to the partition of `date`, creating the partition if it's the
    /// first record of that day. Returns once the line has been handed to the OS.
    fn append(
        &self,
        date: NaiveDate,
        record: &ActivityRecord,
    ) -> impl Future<Output = Result<()>>;

    /// Reads every record of the partition in the order they were written. [None] means the
    /// partition doesn't exist, which is different from an existing partition with no records.
    fn read(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<Vec<ActivityRecord>>>> + Send;
}

impl<T: Deref> LogStore for T
where
    T::Target: LogStore,
{
    fn append(
        &self,
        date: NaiveDate,
        record: &ActivityRecord,
    ) -> impl Future<Output = Result<()>> {
        self.deref().append(date, record)
    }

    fn read(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<Vec<ActivityRecord>>>> + Send {
        self.deref().read(date)
    }
}

/// The main realization of [LogStore]. One JSON-lines file per day inside `record_dir`.
pub struct LogStoreImpl {
    record_dir: PathBuf,
}

impl LogStoreImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.record_dir.join(date_to_record_name(date))
    }

    async fn append_line(file: &mut File, line: &[u8]) -> Result<()> {
        let mut buffer = Vec::with_capacity(line.len() + 1);
        if !ends_at_line_boundary(file).await? {
            // Seal whatever an interrupted write left behind so the new record starts on its
            // own line.
            warn!("Partition ended with an unterminated line");
            buffer.push(b'\n');
        }
        buffer.extend_from_slice(line);

        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn read_inner(path: &Path) -> Result<Option<Vec<ActivityRecord>>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<ActivityRecord>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut reader = BufReader::new(file);
            let mut records = vec![];
            let mut line = Vec::new();
            let mut line_number = 0usize;
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line).await? == 0 {
                    break;
                }
                line_number += 1;
                match decode_line(&line) {
                    Some(Ok(record)) => records.push(record),
                    Some(Err(e)) => {
                        // Partial writes and foreign edits end up here. They only cost the line
                        // itself.
                        warn!("Skipping line {line_number} of {path:?}: {e}")
                    }
                    None => {}
                }
            }

            reader.into_inner().unlock_async().await?;

            Ok(records)
        }

        match extract(path).await {
            Ok(records) => Ok(Some(records)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)?,
        }
    }
}

/// Decodes one raw line of a partition. Blank lines yield [None].
fn decode_line(line: &[u8]) -> Option<Result<ActivityRecord>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(e.into())),
    };
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<ActivityRecord>(text).map_err(Into::into))
}

impl LogStore for LogStoreImpl {
    async fn append(&self, date: NaiveDate, record: &ActivityRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = File::options()
            .read(true)
            .append(true)
            .create(true)
            .open(self.partition_path(date))
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::append_line(&mut file, &line).await;
        file.unlock_async().await?;
        result
    }

    async fn read(&self, date: NaiveDate) -> Result<Option<Vec<ActivityRecord>>> {
        Self::read_inner(&self.partition_path(date)).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::tempdir;

    use crate::daemon::storage::{
        entities::ActivityRecord,
        log_store::{LogStore, LogStoreImpl},
    };

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();

    fn record(h: u32, m: u32, app: &str, text: &str) -> ActivityRecord {
        ActivityRecord {
            timestamp: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            app_name: app.into(),
            text_summary: text.into(),
        }
    }

    #[tokio::test]
    async fn test_read_preserves_write_order() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        let records = [
            record(9, 0, "Mail", "x"),
            record(9, 1, "Mail", "y"),
            record(9, 2, "Editor", "z"),
            record(9, 3, "Terminal", "cargo"),
        ];
        for r in &records {
            storage.append(TEST_DATE, r).await?;
        }

        let stored = storage.read(TEST_DATE).await?;

        assert_eq!(stored, Some(records.to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_partition_file_layout() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        storage.append(TEST_DATE, &record(9, 0, "Mail", "x")).await?;
        storage.append(TEST_DATE, &record(9, 1, "Mail", "y")).await?;

        let content =
            std::fs::read_to_string(dir.path().join("daily_log_2025-12-25.jsonl"))?;
        assert_eq!(
            content,
            "{\"timestamp\":\"09:00:00\",\"app_name\":\"Mail\",\"text_summary\":\"x\"}\n\
             {\"timestamp\":\"09:01:00\",\"app_name\":\"Mail\",\"text_summary\":\"y\"}\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_absent_and_empty_partitions_differ() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;

        assert_eq!(storage.read(TEST_DATE).await?, None);

        std::fs::File::create(storage.partition_path(TEST_DATE))?;
        assert_eq!(storage.read(TEST_DATE).await?, Some(vec![]));
        Ok(())
    }

    #[tokio::test]
    async fn test_partitions_are_separated_by_date() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        let next_day = TEST_DATE.succ_opt().unwrap();
        storage.append(TEST_DATE, &record(23, 59, "Mail", "late")).await?;
        storage.append(next_day, &record(0, 0, "Mail", "early")).await?;

        assert_eq!(
            storage.read(TEST_DATE).await?,
            Some(vec![record(23, 59, "Mail", "late")])
        );
        assert_eq!(
            storage.read(next_day).await?,
            Some(vec![record(0, 0, "Mail", "early")])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_tail_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        storage.append(TEST_DATE, &record(9, 0, "Mail", "x")).await?;
        storage.append(TEST_DATE, &record(9, 1, "Editor", "y")).await?;

        // Simulate a write cut off by a crash.
        let full = serde_json::to_string(&record(9, 2, "Editor", "z"))?;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(storage.partition_path(TEST_DATE))?;
        file.write_all(&full.as_bytes()[..full.len() / 2])?;
        drop(file);

        assert_eq!(
            storage.read(TEST_DATE).await?,
            Some(vec![record(9, 0, "Mail", "x"), record(9, 1, "Editor", "y")])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_append_after_truncated_tail() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        storage.append(TEST_DATE, &record(9, 0, "Mail", "x")).await?;
        std::fs::OpenOptions::new()
            .append(true)
            .open(storage.partition_path(TEST_DATE))?
            .write_all(b"{\"timestamp\":\"09:0")?;

        storage.append(TEST_DATE, &record(9, 2, "Editor", "z")).await?;

        assert_eq!(
            storage.read(TEST_DATE).await?,
            Some(vec![record(9, 0, "Mail", "x"), record(9, 2, "Editor", "z")])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_lines_are_isolated() -> Result<()> {
        let dir = tempdir()?;
        let storage = LogStoreImpl::new(dir.path().to_owned())?;
        let mut content = Vec::new();
        content.extend_from_slice(serde_json::to_string(&record(9, 0, "Mail", "x"))?.as_bytes());
        content.extend_from_slice(b"\nnot json at all\n");
        content.extend_from_slice(b"{\"timestamp\":\"25:99:00\",\"app_name\":\"A\",\"text_summary\":\"t\"}\n");
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        content.extend_from_slice(b"\n");
        content.extend_from_slice(serde_json::to_string(&record(9, 5, "Editor", "y"))?.as_bytes());
        content.push(b'\n');
        std::fs::write(storage.partition_path(TEST_DATE), content)?;

        assert_eq!(
            storage.read(TEST_DATE).await?,
            Some(vec![record(9, 0, "Mail", "x"), record(9, 5, "Editor", "y")])
        );
        Ok(())
    }
}
