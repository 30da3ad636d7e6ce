// File: src/persistence.rs
use crate::core::dictionary::{DictionaryIndex, WordTable};
use crate::core::history::MessageLog;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// What a transcript export holds: the log itself plus the filter it was
/// viewed through, and the rendered text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub attention_threshold: u32,
    pub hide_empty: bool,
    pub text: String,
    pub log: MessageLog,
}

/// Writes `write` into a temp file beside `path`, then renames it over
/// `path`. Readers never observe a half-written file.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&NamedTempFile>) -> Result<()>,
{
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        write(&mut writer)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn save_transcript(
    log: &MessageLog,
    attention_threshold: u32,
    hide_empty: bool,
    path: &Path,
) -> Result<()> {
    let export = TranscriptExport {
        attention_threshold,
        hide_empty,
        text: log.transcript(attention_threshold, hide_empty),
        log: log.clone(),
    };
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(writer, &export)?;
        Ok(())
    })?;
    info!(path = %path.display(), entries = log.len(), "Transcript saved");
    Ok(())
}

pub fn load_transcript(path: &Path) -> Result<TranscriptExport> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Saves the dictionary's current table as a bincode snapshot.
pub fn save_dictionary_snapshot(dictionary: &DictionaryIndex, path: &Path) -> Result<()> {
    let table = dictionary.snapshot();
    write_atomically(path, |writer| {
        bincode::serialize_into(writer, table.as_ref())?;
        Ok(())
    })?;
    info!(path = %path.display(), words = table.len(), "Dictionary snapshot saved");
    Ok(())
}

/// Reads a snapshot back into a ready-to-query table.
pub fn load_dictionary_snapshot(path: &Path) -> Result<WordTable> {
    let reader = BufReader::new(File::open(path)?);
    let table: WordTable = bincode::deserialize_from(reader)?;
    Ok(table)
}

/// Loads a snapshot straight into `dictionary`, replacing what it held.
pub fn restore_dictionary(dictionary: &DictionaryIndex, path: &Path) -> Result<usize> {
    let table = load_dictionary_snapshot(path)?;
    Ok(dictionary.install(table))
}
