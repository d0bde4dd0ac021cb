//! The shared memory mapping a registry publishes into.
//!
//! A file-backed region is built in a staging file next to its final path and
//! renamed over that path once its generation is published. A published file
//! is never truncated or rewritten structurally: readers that mapped an older
//! generation keep its bytes until they reopen the path.
//!
//! Every write, structural or a single value, takes the region mutex. Value
//! writes are short fixed-size stores, so setters on different metrics contend
//! only for that copy.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};

use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use tempfile::TempPath;

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::protocol::{ByteWriter, Snapshot, ValueSlot, GEN2_OFFSET};
use mmvkit_core::Value;

use crate::hook::ValueSink;

/// A writable mapping, either file-backed or anonymous.
#[derive(Debug)]
pub struct Region {
    map: Mutex<MmapMut>,
    path: Option<PathBuf>,
    staging: Mutex<Option<TempPath>>,
    len: usize,
}

impl Region {
    /// Map `len` zeroed bytes in a staging file beside `path`. Nothing
    /// appears at `path` until [`Region::install`].
    pub fn create(path: &Path, len: usize) -> Result<Self> {
        let build = |e: std::io::Error| {
            MmvError::RegionBuild(format!("map {}: {e}", path.display()))
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(build)?;
        let staged = tempfile::Builder::new()
            .prefix(".mmv-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(build)?;
        staged.as_file().set_len(len as u64).map_err(build)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(build)?;
        }

        // SAFETY: the staging file has a fresh random name and is only
        // reachable by readers once it is complete.
        let map = unsafe { MmapOptions::new().len(len).map_mut(staged.as_file()) }.map_err(build)?;

        Ok(Self {
            map: Mutex::new(map),
            path: Some(path.to_path_buf()),
            staging: Mutex::new(Some(staged.into_temp_path())),
            len,
        })
    }

    /// Map `len` zeroed bytes visible to this process only.
    pub fn anonymous(len: usize) -> Result<Self> {
        let map = MmapMut::map_anon(len)
            .map_err(|e| MmvError::RegionBuild(format!("anonymous map of {len} bytes: {e}")))?;
        Ok(Self {
            map: Mutex::new(map),
            path: None,
            staging: Mutex::new(None),
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` with exclusive access to the mapped bytes.
    pub fn with_bytes<T>(&self, f: impl FnOnce(&mut [u8]) -> Result<T>) -> Result<T> {
        let mut map = self.map.lock();
        f(&mut map[..])
    }

    /// Close a build: every structural write becomes visible before `gen2`.
    pub fn publish_generation(&self, generation: i64) -> Result<()> {
        let mut map = self.map.lock();
        fence(Ordering::Release);
        map[..].write_bytes(&generation.to_le_bytes(), GEN2_OFFSET)?;
        Ok(())
    }

    /// Rename the staged file over the region path, replacing any earlier
    /// generation in one step. No-op for anonymous or installed regions.
    pub fn install(&self) -> Result<()> {
        let (Some(path), Some(staged)) = (&self.path, self.staging.lock().take()) else {
            return Ok(());
        };
        staged.persist(path).map_err(|e| {
            MmvError::RegionBuild(format!("install {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }

    /// Delete the staging file of a build that never got installed.
    pub fn discard(&self) -> Result<()> {
        match self.staging.lock().take() {
            Some(staged) => Ok(staged.close()?),
            None => Ok(()),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.path.is_some() && self.staging.lock().is_none()
    }

    /// Copy of the current bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.map.lock().to_vec()
    }

    pub fn flush(&self) -> Result<()> {
        if self.path.is_none() {
            return Ok(());
        }
        self.map.lock().flush()?;
        Ok(())
    }

    /// Delete the installed file, if any.
    pub fn remove_file(&self) -> Result<()> {
        match &self.path {
            Some(path) if self.is_installed() => match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

impl ValueSink for Region {
    fn write_value(&self, slot: ValueSlot, value: &Value) -> Result<()> {
        let mut map = self.map.lock();
        slot.write(&mut map[..], value)?;
        Ok(())
    }
}

/// Copy a region file through a read-only mapping.
///
/// The copy is kept only if the generation pair is consistent and unchanged
/// across the whole copy; otherwise a retryable error is returned.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(MmvError::InvalidFormat(format!("{} is empty", path.display())));
    }
    // SAFETY: published region files are replaced by rename and never
    // resized in place, so the mapped length stays backed while we copy.
    let map = unsafe { MmapOptions::new().map(&file) }?;
    Snapshot::copy_consistent(&map)
}
