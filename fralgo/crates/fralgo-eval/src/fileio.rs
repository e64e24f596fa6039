//! Numbered file channels.
//!
//! Ten channels (1..=10), opened in `Lecture`, `Ecriture` or `Ajout`
//! mode. Read mode loads the whole file into a line buffer eagerly; each
//! `LireFichier` pops one line and `FDF` reports buffer emptiness. Write
//! and append modes emit one line per `EcrireFichier`; append flushes
//! after every write. Channels are managed manually: `Fermer` is the
//! only release point.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};

use fralgo_par::ast::FileMode;
use fralgo_util::{AlgoError, Result};

const CHANNEL_COUNT: usize = 10;

struct Channel {
    filename: String,
    mode: FileMode,
    buffer: VecDeque<String>,
    writer: Option<BufWriter<File>>,
}

/// The bounded channel table.
pub struct FileTable {
    channels: Vec<Option<Channel>>,
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> Self {
        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        channels.resize_with(CHANNEL_COUNT, || None);
        Self { channels }
    }

    fn index(&self, number: i64) -> Result<usize> {
        if (1..=CHANNEL_COUNT as i64).contains(&number) {
            Ok((number - 1) as usize)
        } else {
            Err(AlgoError::Fatal(format!(
                "Numéro de canal invalide : {number}"
            )))
        }
    }

    fn channel(&mut self, number: i64) -> Result<&mut Channel> {
        let idx = self.index(number)?;
        self.channels[idx].as_mut().ok_or_else(|| {
            AlgoError::Fatal(format!("Aucun fichier affecté au canal {number}"))
        })
    }

    pub fn open(&mut self, filename: &str, number: i64, mode: FileMode) -> Result<()> {
        let idx = self.index(number)?;
        if self.channels[idx].is_some() {
            return Err(AlgoError::Fatal(format!(
                "Un fichier est déjà affecté au canal {number}"
            )));
        }
        let channel = match mode {
            FileMode::Read => {
                let content = std::fs::read_to_string(filename).map_err(|e| {
                    if e.kind() == ErrorKind::NotFound {
                        AlgoError::Fatal(format!("Fichier non trouvé : {filename}"))
                    } else {
                        AlgoError::Fatal(e.to_string())
                    }
                })?;
                Channel {
                    filename: filename.to_string(),
                    mode,
                    buffer: content.lines().map(str::to_string).collect(),
                    writer: None,
                }
            }
            FileMode::Write | FileMode::Append => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(mode == FileMode::Write)
                    .append(mode == FileMode::Append)
                    .open(filename)
                    .map_err(|e| AlgoError::Fatal(e.to_string()))?;
                Channel {
                    filename: filename.to_string(),
                    mode,
                    buffer: VecDeque::new(),
                    writer: Some(BufWriter::new(file)),
                }
            }
        };
        self.channels[idx] = Some(channel);
        Ok(())
    }

    /// Pops the next line of a read-mode channel.
    pub fn read(&mut self, number: i64) -> Result<String> {
        let channel = self.channel(number)?;
        if channel.mode != FileMode::Read {
            return Err(AlgoError::Fatal(
                "Le fichier n'est pas en mode Lecture".to_string(),
            ));
        }
        channel
            .buffer
            .pop_front()
            .ok_or_else(|| AlgoError::Fatal("La fin du fichier a été atteinte".to_string()))
    }

    /// Writes one line. Append mode flushes immediately.
    pub fn write(&mut self, number: i64, line: &str) -> Result<()> {
        let channel = self.channel(number)?;
        let mode = channel.mode;
        let writer = channel.writer.as_mut().ok_or_else(|| {
            AlgoError::Fatal("Le fichier n'est pas en mode Ecriture".to_string())
        })?;
        writeln!(writer, "{line}").map_err(|e| AlgoError::Fatal(e.to_string()))?;
        if mode == FileMode::Append {
            writer.flush().map_err(|e| AlgoError::Fatal(e.to_string()))?;
        }
        Ok(())
    }

    /// `FDF`: true once the read buffer is exhausted.
    pub fn eof(&mut self, number: i64) -> Result<bool> {
        let channel = self.channel(number)?;
        Ok(channel.buffer.is_empty())
    }

    pub fn close(&mut self, number: i64) -> Result<()> {
        let idx = self.index(number)?;
        let slot = self.channels[idx].take().ok_or_else(|| {
            AlgoError::Fatal(format!("Aucun fichier affecté au canal {number}"))
        })?;
        if let Some(mut writer) = slot.writer {
            writer
                .flush()
                .map_err(|e| AlgoError::Fatal(format!("{} : {e}", slot.filename)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let path = path.to_str().unwrap();

        let mut files = FileTable::new();
        files.open(path, 1, FileMode::Write).unwrap();
        files.write(1, "un").unwrap();
        files.write(1, "deux").unwrap();
        files.close(1).unwrap();

        files.open(path, 1, FileMode::Read).unwrap();
        assert!(!files.eof(1).unwrap());
        assert_eq!(files.read(1).unwrap(), "un");
        assert_eq!(files.read(1).unwrap(), "deux");
        assert!(files.eof(1).unwrap());
        assert!(files.read(1).is_err());
        files.close(1).unwrap();
    }

    #[test]
    fn test_append_adds_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let path = path.to_str().unwrap();

        let mut files = FileTable::new();
        files.open(path, 2, FileMode::Write).unwrap();
        files.write(2, "a").unwrap();
        files.close(2).unwrap();

        files.open(path, 2, FileMode::Append).unwrap();
        files.write(2, "b").unwrap();
        files.close(2).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "a\nb\n");
    }

    #[test]
    fn test_channel_misuse() {
        let mut files = FileTable::new();
        assert!(files.close(3).is_err());
        assert!(files.read(3).is_err());
        assert!(files.open("x", 0, FileMode::Write).is_err());
        assert!(files.open("x", 11, FileMode::Write).is_err());
        assert!(files
            .open("/nonexistent/missing.txt", 1, FileMode::Read)
            .is_err());
    }

    #[test]
    fn test_busy_channel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path = path.to_str().unwrap();

        let mut files = FileTable::new();
        files.open(path, 1, FileMode::Write).unwrap();
        let err = files.open(path, 1, FileMode::Write).unwrap_err();
        assert!(err.to_string().contains("déjà affecté"));
        files.close(1).unwrap();
    }

    #[test]
    fn test_write_mode_rejects_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path = path.to_str().unwrap();

        let mut files = FileTable::new();
        files.open(path, 1, FileMode::Write).unwrap();
        assert!(files.read(1).is_err());
        files.close(1).unwrap();
    }
}
