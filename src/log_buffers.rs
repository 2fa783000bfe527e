//! Ownership of a memory-mapped log file backing a publication, exclusive
//! publication, or image's term buffers.
use crate::error::Result;
use memmap::{Mmap, MmapOptions};
use std::fs::OpenOptions;

/// A memory-mapped log file: term buffers and metadata shared by a
/// publication and its images. The conductor only owns the mapping's
/// lifetime (refcount, linger, deletion); the data-plane read/write hot path
/// over its contents is independent of this crate.
pub struct LogBuffers {
    file_name: String,
    mmap: Mmap,
}

impl LogBuffers {
    /// Map the log file named `file_name` into this process
    pub fn map(file_name: &str) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(file_name)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        log::debug!("mapped log buffers {}, {} bytes", file_name, mmap.len());
        Ok(LogBuffers {
            file_name: file_name.to_string(),
            mmap,
        })
    }

    /// Path of the underlying log file
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Total size of the mapped region in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the mapped region is empty. Never true for a real log file.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Raw bytes of the mapping
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Unmap and delete the backing file from disk. Called once a resource's
    /// reference count reaches zero and its linger period has elapsed.
    pub fn delete(self) -> Result<()> {
        let file_name = self.file_name.clone();
        drop(self);
        std::fs::remove_file(&file_name)?;
        log::debug!("deleted log buffers {}", file_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn maps_an_existing_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 4096]).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let log_buffers = LogBuffers::map(&path).unwrap();
        assert_eq!(log_buffers.len(), 4096);
        assert_eq!(log_buffers.file_name(), path);
    }

    #[test]
    fn delete_removes_the_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term.log");
        std::fs::File::create(&path).unwrap().set_len(1024).unwrap();
        let path = path.to_str().unwrap().to_string();

        let log_buffers = LogBuffers::map(&path).unwrap();
        log_buffers.delete().unwrap();

        assert!(!std::path::Path::new(&path).exists());
    }
}
