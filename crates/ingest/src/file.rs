use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::time::Instant;

use billing_core::{FileDateRule, LoadStatus, SourceFile};
use billing_db::Db;
use chrono::{SecondsFormat, Utc};
use csv::StringRecord;
use flate2::read::MultiGzDecoder;

use crate::context::RunContext;
use crate::normalize::{TagAccumulator, normalize};
use crate::record::{CsvRecord, HeaderIndex};
use crate::sources::ObjectStore;
use crate::types::{FileOutcome, IngestError, Result, SkipReason};

const DOWNLOAD_CHUNK: usize = 1024 * 1024;

/// Ordinal of a file inside the current run's listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    pub id: usize,
    pub total: usize,
}

/// Date the minimum-date filter compares against.
pub fn file_date(ctx: &RunContext, file: &SourceFile) -> String {
    match ctx.shape.file_date {
        FileDateRule::CreatedMinute => file.created_minute(),
        FileDateRule::PathSegments => file.path_date().unwrap_or_else(|| file.created_minute()),
    }
}

/// Skip checks, evaluated in a fixed order: watermark, file filter, minimum date.
pub fn eligibility(ctx: &RunContext, file: &SourceFile, watermark: &str) -> Option<SkipReason> {
    if !watermark.is_empty() && file.name.as_str() <= watermark {
        return Some(SkipReason::AlreadyLoaded);
    }
    if let Some(filter) = ctx.filters.file.as_deref()
        && filter != file.file_id()
        && filter != file.name
    {
        return Some(SkipReason::FileFilter);
    }
    if let Some(min_date) = ctx.filters.min_date.as_deref()
        && file_date(ctx, file).as_str() <= min_date
    {
        return Some(SkipReason::BeforeMinDate);
    }
    None
}

/// Downloads, decodes and loads one export file.
///
/// The compressed object is streamed to a scratch file in the work directory,
/// which is removed when this function returns on every path. All rows and the
/// file's tag keys commit in one transaction; the load-status row is written
/// only after that commit.
pub fn ingest_file(
    db: &mut Db,
    store: &dyn ObjectStore,
    ctx: &RunContext,
    file: &SourceFile,
    watermark: &str,
    position: BatchPosition,
) -> Result<FileOutcome> {
    if let Some(reason) = eligibility(ctx, file, watermark) {
        log::info!("skipping file {}: {}", file.name, reason);
        return Ok(FileOutcome::Skipped(reason));
    }

    let shape = ctx.shape;
    let load_start = Utc::now();
    let timer = Instant::now();
    log::info!(
        "processing file {} ({} MB, {})",
        file.name,
        file.size_mb(),
        file.created_minute()
    );

    fs::create_dir_all(&ctx.work_dir)?;
    let mut scratch = tempfile::Builder::new()
        .prefix("billing-")
        .suffix(".download")
        .tempfile_in(&ctx.work_dir)?;
    {
        let mut reader = store
            .fetch(&file.name)
            .map_err(|err| IngestError::external(format!("fetch {}", file.name), err))?;
        let bytes = copy_in_chunks(&mut reader, scratch.as_file_mut())?;
        log::debug!("downloaded {} bytes of {}", bytes, file.name);
    }
    let mut local = scratch.reopen()?;
    local.seek(SeekFrom::Start(0))?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(decoder_for(&file.name, local));
    let header = HeaderIndex::new(csv_reader.headers()?);
    log::debug!("{} has {} columns", file.name, header.len());

    let file_id = file.file_id();
    let mut tags = TagAccumulator::default();
    let mut load = db.begin_file_load(shape, &ctx.tenant, ctx.batch_size)?;
    let mut record = StringRecord::new();
    while csv_reader.read_record(&mut record)? {
        let raw = CsvRecord::new(&header, &record);
        load.push(normalize(&raw, ctx, file_id, &mut tags))?;
    }
    let rows = load.finish(tags.keys())?;

    let status = LoadStatus {
        tenant_name: ctx.tenant.clone(),
        file_type: shape.file_type,
        file_id: file_id.to_string(),
        file_name: file.name.clone(),
        file_size_mb: file.size_mb(),
        file_date: file_date(ctx, file),
        num_rows: rows as i64,
        load_start: load_start.to_rfc3339_opts(SecondsFormat::Secs, true),
        load_end: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        agent_version: ctx.agent_version.clone(),
        batch_id: position.id as i64,
        batch_total: position.total as i64,
    };
    db.insert_load_status(shape, &status)?;
    drop(scratch);

    log::info!(
        "completed file {} - {} rows inserted in {}ms",
        file.name,
        rows,
        timer.elapsed().as_millis()
    );
    Ok(FileOutcome::Loaded {
        rows,
        malformed_tags: tags.malformed(),
    })
}

fn decoder_for(name: &str, file: File) -> Box<dyn Read> {
    let reader = BufReader::new(file);
    if name.ends_with(".gz") {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        Box::new(reader)
    }
}

fn copy_in_chunks(reader: &mut dyn Read, writer: &mut File) -> io::Result<u64> {
    let mut buf = vec![0u8; DOWNLOAD_CHUNK];
    let mut total = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        writer.write_all(&buf[..read])?;
        total += read as u64;
    }
    writer.flush()?;
    Ok(total)
}
