//! Append-only write-ahead log.
//!
//! Every engine mutation becomes one [`Event`] entry framed as
//! `[u32 len][bincode payload][u32 crc32]`. Replay on startup rebuilds all
//! engine state; a torn or corrupt tail entry (crash mid-write) fails its
//! length or CRC check and is discarded along with everything after it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the log file at `path` for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(append_handle(path)?),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Buffer one event without flushing. The group-commit writer calls
    /// this for a whole batch and then settles it with one `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        write_entry(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    /// Flush buffered entries and fsync. Only after this returns may the
    /// batch be acknowledged to callers.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Append one event durably. Test convenience; production batches.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Phase one of compaction: write the snapshot events to a sibling
    /// temp file and fsync it. Slow I/O, runs without blocking appends.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let file = File::create(compact_tmp(path))?;
        let mut writer = BufWriter::new(file);
        for event in events {
            write_entry(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Phase two: atomically rename the temp file over the log and reopen.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        fs::rename(compact_tmp(&self.path), &self.path)?;
        self.writer = BufWriter::new(append_handle(&self.path)?);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Both compaction phases back to back. Test convenience.
    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    /// Read back every intact event. A missing file is an empty log;
    /// the first torn or corrupt entry ends the replay silently.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        while let Some(event) = read_entry(&mut reader)? {
            events.push(event);
        }
        Ok(events)
    }
}

fn append_handle(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn compact_tmp(path: &Path) -> PathBuf {
    path.with_extension("wal.tmp")
}

fn write_entry(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read one framed entry. `Ok(None)` means clean EOF, a torn tail, or a
/// CRC/decode mismatch — all of which end the replay.
fn read_entry(reader: &mut impl Read) -> io::Result<Option<Event>> {
    let Some(len_buf) = read_exact_or_eof::<4>(reader)? else {
        return Ok(None);
    };
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let Some(crc_buf) = read_exact_or_eof::<4>(reader)? else {
        return Ok(None);
    };
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(None);
    }

    Ok(bincode::deserialize(&payload).ok())
}

fn read_exact_or_eof<const N: usize>(reader: &mut impl Read) -> io::Result<Option<[u8; N]>> {
    let mut buf = [0u8; N];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
