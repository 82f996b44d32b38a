//! The physical disk array: `W` disks addressed by column index, with no
//! opinion on which columns are data vs. parity for a given stripe (that
//! is [`crate::geometry::Geometry`]'s job).


use crate::retention::disk::Disk;

pub struct DiskArray {
    disks: Vec<Disk>,
    disk_len: u64,
}

impl DiskArray {
    /// Opens `width` disks named `disk<i>` under `data_path`, each of
    /// exactly `disk_len` bytes.
    ///
    /// # Errors
    /// Returns an error if any disk image cannot be created/opened or
    /// mapped.
    pub fn open(data_path: &str, width: usize, disk_len: u64) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_path)?;
        let mut disks = Vec::with_capacity(width);
        for i in 0..width {
            let path = format!("{data_path}/disk{i}");
            disks.push(Disk::open(&path, disk_len)?);
        }
        Ok(Self { disks, disk_len })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.disks.len()
    }

    #[must_use]
    pub const fn disk_len(&self) -> u64 {
        self.disk_len
    }

    /// Reads exactly `len` bytes from disk `i` at `offset`. Returns `None`
    /// if `i` is out of range or the disk does not return a full read
    /// (missing, or the range overruns the disk).
    #[must_use]
    pub fn read_at(&self, i: usize, offset: u64, len: usize) -> Option<Vec<u8>> {
        let disk = self.disks.get(i)?;
        let mut buf = vec![0u8; len];
        let n = disk.read_at(offset, &mut buf);
        if n == len { Some(buf) } else { None }
    }

    /// Writes `data` to disk `i` at `offset`. Returns `false` if `i` is
    /// out of range or the disk does not accept the full write.
    pub fn write_at(&mut self, i: usize, offset: u64, data: &[u8]) -> bool {
        let Some(disk) = self.disks.get_mut(i) else {
            return false;
        };
        disk.write_at(offset, data) == data.len()
    }

    /// Probes every disk's liveness; for any disk that fails, immediately
    /// rebuilds a fresh empty backing store for it. Returns the liveness
    /// observed *before* any rebuild (i.e. which disks were newly failed).
    ///
    /// # Errors
    /// Returns an error if a replacement backing store cannot be created.
    pub fn probe_and_replace(&mut self, data_path: &str) -> anyhow::Result<Vec<bool>> {
        let mut liveness = Vec::with_capacity(self.disks.len());
        for (i, disk) in self.disks.iter_mut().enumerate() {
            let alive = disk.probe();
            liveness.push(alive);
            if !alive {
                let path = format!("{data_path}/disk{i}");
                disk.rebuild(&path)?;
            }
        }
        Ok(liveness)
    }

    #[must_use]
    pub fn is_missing(&self, i: usize) -> bool {
        self.disks.get(i).is_none_or(Disk::is_missing)
    }

    /// Whether disk `i` was rebuilt from scratch and still holds stale
    /// (zero) bytes the controller has not recovered yet.
    #[must_use]
    pub fn needs_rebuild(&self, i: usize) -> bool {
        self.disks.get(i).is_some_and(Disk::needs_rebuild)
    }

    /// Clears the rebuild flag for disk `i`.
    pub fn clear_needs_rebuild(&mut self, i: usize) {
        if let Some(disk) = self.disks.get_mut(i) {
            disk.clear_needs_rebuild();
        }
    }

    pub fn fail(&mut self, i: usize) -> anyhow::Result<()> {
        let Some(disk) = self.disks.get_mut(i) else {
            anyhow::bail!("disk index out of range: {i} (width={})", self.disks.len());
        };
        disk.fail()
    }

    /// Rebuilds a fresh zero-filled backing store for disk `i` at its
    /// canonical `disk<i>` path under `data_path`, independent of a probe.
    ///
    /// # Errors
    /// Returns an error if `i` is out of range or the replacement cannot
    /// be created.
    pub fn replace(&mut self, i: usize, data_path: &str) -> anyhow::Result<()> {
        let Some(disk) = self.disks.get_mut(i) else {
            anyhow::bail!("disk index out of range: {i} (width={})", self.disks.len());
        };
        let path = format!("{data_path}/disk{i}");
        disk.rebuild(&path)
    }

    pub fn status_string(&self) -> String {
        let mut out = String::new();
        for (i, disk) in self.disks.iter().enumerate() {
            let state = if disk.is_missing() { "FAILED" } else { "OK" };
            out.push_str(&format!("disk {i}: {state} (path={})\n", disk.path().display()));
        }
        out
    }
}
