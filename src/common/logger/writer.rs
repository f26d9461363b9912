use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;

/// Appends log lines to a file and keeps only the newest `max_lines`.
///
/// The file is rewritten once it grows a tenth past the cap (at least 50
/// lines), so pruning cost is amortised over many writes.
#[derive(Clone)]
pub struct CappedFileWriter {
    path: PathBuf,
    max_lines: usize,
    lines: Arc<Mutex<usize>>,
}

impl CappedFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        let path = path.into();
        let existing = File::open(&path)
            .map(|f| BufReader::new(f).lines().count())
            .unwrap_or(0);
        Self {
            path,
            max_lines: max_lines.max(1),
            lines: Arc::new(Mutex::new(existing)),
        }
    }

    fn slack(&self) -> usize {
        (self.max_lines / 10).max(50)
    }

    fn prune(&self) -> io::Result<usize> {
        let file = File::open(&self.path)?;
        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        if lines.len() <= self.max_lines {
            return Ok(lines.len());
        }

        let keep = &lines[lines.len() - self.max_lines..];
        let tmp = self.path.with_extension("prune");
        {
            let mut out = File::create(&tmp)?;
            for line in keep {
                writeln!(out, "{line}")?;
            }
        }
        fs::rename(&tmp, &self.path)?;
        Ok(keep.len())
    }
}

impl io::Write for CappedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = self.lines.lock();

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        *lines += buf.iter().filter(|&&b| b == b'\n').count();
        if *lines > self.max_lines + self.slack() {
            match self.prune() {
                Ok(remaining) => *lines = remaining,
                Err(e) => eprintln!("failed to prune log file {}: {e}", self.path.display()),
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("listenroom-log-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_prunes_to_newest_lines() {
        let path = temp_log("room.log");
        let mut writer = CappedFileWriter::new(&path, 10);

        for i in 0..100 {
            writer.write_all(format!("line {i}\n").as_bytes()).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines.len() <= 10 + 50);
        assert_eq!(lines.last(), Some(&"line 99"));
        assert!(!lines.contains(&"line 0"));
    }

    #[test]
    fn test_counts_existing_lines_on_open() {
        let path = temp_log("existing.log");
        fs::write(&path, "a\nb\nc\n").unwrap();
        let writer = CappedFileWriter::new(&path, 100);
        assert_eq!(*writer.lines.lock(), 3);
    }
}
