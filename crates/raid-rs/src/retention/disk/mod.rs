//! A single simulated disk: a fixed-size byte container backed by a
//! memory-mapped file.


use memmap2::{MmapMut, MmapOptions};
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Disk {
    path: PathBuf,
    file: Option<File>,
    map: Option<MmapMut>,
    len: u64,
    /// Set when this disk was rebuilt (zero-filled) after a failure; stays
    /// set until the controller has recovered every stripe onto it.
    needs_rebuild: bool,
}

impl Disk {
    /// Opens (creating if missing) a zero-filled container of exactly `len`
    /// bytes at `path`.
    ///
    /// # Errors
    /// Returns an error if the disk image cannot be created/opened or mapped.
    pub fn open(path: &str, len: u64) -> anyhow::Result<Self> {
        let path = PathBuf::from(path);

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.set_len(len)?;

        let map_len = usize::try_from(len)
            .map_err(|_| anyhow::anyhow!("disk length {len} exceeds addressable size"))?;
        let map = unsafe { MmapOptions::new().len(map_len).map_mut(&file)? };

        Ok(Self {
            path,
            file: Some(file),
            map: Some(map),
            len,
            needs_rebuild: false,
        })
    }

    /// Mark this disk as failed (hot-remove).
    ///
    /// Renames the underlying image to `*.failed.<ts>` and drops the mmap
    /// and file handle so the array stops using it.
    ///
    /// # Errors
    /// Returns an error if the disk image cannot be manipulated.
    pub fn fail(&mut self) -> anyhow::Result<()> {
        if self.path.exists() {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let failed_path = self.path.with_extension(format!("img.failed.{ts}"));
            let _ = std::fs::rename(&self.path, &failed_path);
        }

        self.map.take();
        self.file.take();
        Ok(())
    }

    /// Creates a fresh zero-filled container at `path` and re-establishes
    /// liveness. The disk keeps its original size.
    ///
    /// # Errors
    /// Returns an error if the disk image cannot be recreated or mapped.
    pub fn rebuild(&mut self, path: &str) -> anyhow::Result<()> {
        let path = PathBuf::from(path);
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(self.len)?;
        let map_len = usize::try_from(self.len)
            .map_err(|_| anyhow::anyhow!("disk length {} exceeds addressable size", self.len))?;
        let map = unsafe { MmapOptions::new().len(map_len).map_mut(&file)? };

        self.path = path;
        self.file = Some(file);
        self.map = Some(map);
        self.needs_rebuild = true;
        Ok(())
    }

    /// Whether this disk was rebuilt from scratch and still holds stale
    /// (zero) bytes for stripes the controller has not yet recovered onto
    /// it.
    #[must_use]
    pub const fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Clears the rebuild flag once every stripe has been recovered onto
    /// this disk.
    pub const fn clear_needs_rebuild(&mut self) {
        self.needs_rebuild = false;
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_operational(&self) -> bool {
        self.file.is_some() && self.map.is_some()
    }

    /// Missing from the array's point of view (failed / removed / unlinked).
    #[must_use]
    pub fn is_missing(&self) -> bool {
        if !self.is_operational() {
            return true;
        }
        self.file
            .as_ref()
            .and_then(|f| f.metadata().ok().map(|meta| meta.nlink() == 0))
            .unwrap_or(true)
    }

    /// Verifies size equals the declared length and the backing file is
    /// still reachable; any mismatch or I/O error reports not-live.
    #[must_use]
    pub fn probe(&self) -> bool {
        if self.is_missing() {
            return false;
        }
        let Some(file) = self.file.as_ref() else {
            return false;
        };
        file.metadata().map(|meta| meta.len() == self.len).unwrap_or(false)
    }

    pub fn read_at(&self, off: u64, buf: &mut [u8]) -> usize {
        let Some(map) = self.map.as_ref() else {
            return 0;
        };
        let Ok(off) = usize::try_from(off) else {
            return 0;
        };
        let Ok(disk_len) = usize::try_from(self.len) else {
            return 0;
        };
        if off >= disk_len {
            return 0;
        }
        let end = off.saturating_add(buf.len()).min(disk_len);
        let src = &map[off..end];
        let n = src.len();
        buf[..n].copy_from_slice(src);
        n
    }

    pub fn write_at(&mut self, off: u64, data: &[u8]) -> usize {
        let Some(map) = self.map.as_mut() else {
            return 0;
        };
        let Ok(off) = usize::try_from(off) else {
            return 0;
        };
        let Ok(disk_len) = usize::try_from(self.len) else {
            return 0;
        };
        if off >= disk_len {
            return 0;
        }
        let end = off.saturating_add(data.len()).min(disk_len);
        let dst = &mut map[off..end];
        let n = dst.len();
        dst.copy_from_slice(&data[..n]);
        // This is a simulator; relying on the OS page cache for durability
        // is enough. Add an explicit flush if persistence across crashes
        // ever becomes a goal.
        n
    }
}
