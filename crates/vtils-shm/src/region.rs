// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Named Region
//!
//! A fixed-shape, fixed-type numeric array living in a memory-mapped file
//! that any process can attach to by name.
//!
//! Lifecycle:
//! - exactly one process creates the region (`create*`), becoming its owner
//! - any number of views attach with `open*`
//! - every view detaches independently with `close` (or on drop)
//! - exactly one `delete` removes the backing object, after all other views
//!   have closed. Deleting while other processes still hold views is a caller
//!   error: their mappings stay valid but the name is gone.
//!
//! Writes through one view are visible to every other view immediately; there
//! is no buffering and no locking. Readers that need an untorn snapshot use
//! [`NamedRegion::read_consistent`], which pairs with writes performed inside
//! [`NamedRegion::write_with`].

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::marker::PhantomData;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicU64, Ordering};

use memmap2::MmapMut;
use serde::Serialize;
use tracing::{debug, info};

use crate::dir::RegionDir;
use crate::error::{ShmError, ShmResult};
use crate::layout::{
    decode_header, describe, element_count, encode_header, region_size, DType, Element,
    GENERATION_OFFSET, HEADER_SIZE,
};

/// Header snapshot of a region, obtained without attaching a typed view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionInfo {
    pub name: String,
    pub path: PathBuf,
    pub dtype: DType,
    pub shape: Vec<usize>,
    /// Payload size in bytes (element count x element size)
    pub byte_size: usize,
    pub generation: u64,
}

/// A typed view of a named shared memory region.
pub struct NamedRegion<T: Element> {
    name: String,
    path: PathBuf,
    shape: Vec<usize>,
    len: usize,
    owner: bool,
    mmap: Option<MmapMut>,
    /// Start of the mapping; null once closed
    base: *mut u8,
    _marker: PhantomData<T>,
}

// Safety: the mapping is owned by the view and outlives every pointer derived
// from `base`. Mutation requires `&mut self` except for the atomic words
// (generation counter, `atomics()`), which are accessed through `AtomicU64`.
unsafe impl<T: Element> Send for NamedRegion<T> {}
unsafe impl<T: Element> Sync for NamedRegion<T> {}

fn map_open_error(name: &str, err: std::io::Error) -> ShmError {
    match err.kind() {
        ErrorKind::NotFound => ShmError::NotFound(name.to_string()),
        ErrorKind::AlreadyExists => ShmError::AlreadyExists(name.to_string()),
        _ => ShmError::Io(err),
    }
}

fn open_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}

impl<T: Element> NamedRegion<T> {
    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a 1-D region in the default directory holding `initial`.
    ///
    /// # Errors
    /// `AlreadyExists` if the name is taken.
    pub fn create(name: &str, initial: &[T]) -> ShmResult<Self> {
        Self::create_in(&RegionDir::system_default(), name, initial)
    }

    /// Create a 1-D region in `dir` holding `initial`.
    pub fn create_in(dir: &RegionDir, name: &str, initial: &[T]) -> ShmResult<Self> {
        Self::create_with_shape_in(dir, name, &[initial.len()], initial)
    }

    /// Create a region of the given shape; `initial` is row-major and must
    /// hold exactly as many elements as the shape.
    pub fn create_with_shape_in(
        dir: &RegionDir,
        name: &str,
        shape: &[usize],
        initial: &[T],
    ) -> ShmResult<Self> {
        let count = element_count(shape)?;
        if initial.len() != count {
            return Err(ShmError::LengthMismatch {
                expected: count,
                actual: initial.len(),
            });
        }
        Self::create_inner(dir, name, shape, Some(initial))
    }

    /// Like [`Self::create_with_shape_in`] in the default directory.
    pub fn create_with_shape(name: &str, shape: &[usize], initial: &[T]) -> ShmResult<Self> {
        Self::create_with_shape_in(&RegionDir::system_default(), name, shape, initial)
    }

    pub fn create_zeroed(name: &str, shape: &[usize]) -> ShmResult<Self> {
        Self::create_zeroed_in(&RegionDir::system_default(), name, shape)
    }

    /// Create a zero-initialized region of the given shape.
    pub fn create_zeroed_in(dir: &RegionDir, name: &str, shape: &[usize]) -> ShmResult<Self> {
        Self::create_inner(dir, name, shape, None)
    }

    /// The region is fully initialized in a private staging file and then
    /// published under its name with a hard link, so an opener never observes
    /// a half-written header and two creators cannot both succeed. Each call
    /// stages in its own file; a losing creator never touches the published
    /// inode.
    fn create_inner(
        dir: &RegionDir,
        name: &str,
        shape: &[usize],
        initial: Option<&[T]>,
    ) -> ShmResult<Self> {
        let path = dir.path_of(name)?;
        let total_size = region_size(T::DTYPE, shape)?;
        let len = element_count(shape)?;

        if path.exists() {
            return Err(ShmError::AlreadyExists(name.to_string()));
        }
        std::fs::create_dir_all(dir.root())?;

        // Unique per call, created exclusively (mode 0600); removed on drop
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".staging")
            .tempfile_in(dir.root())?;

        let mut mmap = {
            let file = staging.as_file();
            file.set_len(total_size as u64)?;
            let mut mmap = unsafe { MmapMut::map_mut(file)? };
            encode_header(&mut mmap[..HEADER_SIZE], T::DTYPE, shape);
            if let Some(values) = initial {
                mmap[HEADER_SIZE..].copy_from_slice(bytemuck::cast_slice(values));
            }
            mmap
        };
        std::fs::hard_link(staging.path(), &path).map_err(|e| map_open_error(name, e))?;
        if let Err(e) = staging.close() {
            debug!("Failed to remove staging file for '{}': {}", name, e);
        }

        info!(
            "Created shared memory region '{}' ({}, {} bytes) at {}",
            name,
            describe(T::DTYPE, shape),
            total_size,
            path.display()
        );

        let base = mmap.as_mut_ptr();
        Ok(Self {
            name: name.to_string(),
            path,
            shape: shape.to_vec(),
            len,
            owner: true,
            mmap: Some(mmap),
            base,
            _marker: PhantomData,
        })
    }

    // ------------------------------------------------------------------
    // Attach
    // ------------------------------------------------------------------

    /// Attach to an existing region in the default directory.
    ///
    /// # Errors
    /// `NotFound` if no region has this name; `ShapeMismatch` if the element
    /// type or shape recorded by the creator differs from `shape`/`T`.
    pub fn open(name: &str, shape: &[usize]) -> ShmResult<Self> {
        Self::open_in(&RegionDir::system_default(), name, shape)
    }

    /// Attach to an existing region in `dir`, checking type and shape.
    pub fn open_in(dir: &RegionDir, name: &str, shape: &[usize]) -> ShmResult<Self> {
        element_count(shape)?;
        Self::attach(dir, name, Some(shape))
    }

    pub fn open_any(name: &str) -> ShmResult<Self> {
        Self::open_any_in(&RegionDir::system_default(), name)
    }

    /// Attach to an existing region, taking the shape from its header.
    /// The element type is still checked.
    pub fn open_any_in(dir: &RegionDir, name: &str) -> ShmResult<Self> {
        Self::attach(dir, name, None)
    }

    fn attach(dir: &RegionDir, name: &str, expected: Option<&[usize]>) -> ShmResult<Self> {
        let path = dir.path_of(name)?;
        let file = open_options()
            .open(&path)
            .map_err(|e| map_open_error(name, e))?;

        let file_len = file.metadata()?.len() as usize;
        if file_len < HEADER_SIZE {
            return Err(ShmError::InvalidHeader {
                name: name.to_string(),
                reason: format!("backing object is only {} bytes", file_len),
            });
        }

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        let header = decode_header(name, &mmap[..HEADER_SIZE])?;

        let shape_ok = expected.map_or(true, |s| s == header.shape.as_slice());
        if header.dtype != T::DTYPE || !shape_ok {
            return Err(ShmError::ShapeMismatch {
                name: name.to_string(),
                expected: describe(T::DTYPE, expected.unwrap_or(&header.shape)),
                actual: describe(header.dtype, &header.shape),
            });
        }

        let expected_size = region_size(header.dtype, &header.shape)?;
        if file_len != expected_size {
            return Err(ShmError::InvalidHeader {
                name: name.to_string(),
                reason: format!(
                    "backing object is {} bytes, header implies {}",
                    file_len, expected_size
                ),
            });
        }

        debug!(
            "Attached to shared memory region '{}' ({})",
            name,
            describe(header.dtype, &header.shape)
        );

        let len = element_count(&header.shape)?;
        let base = mmap.as_mut_ptr();
        Ok(Self {
            name: name.to_string(),
            path,
            shape: header.shape,
            len,
            owner: false,
            mmap: Some(mmap),
            base,
            _marker: PhantomData,
        })
    }

    /// Attach if the region exists, otherwise create it from `initial`.
    ///
    /// The existing region must be 1-D with `initial.len()` elements of `T`.
    pub fn create_or_open_in(dir: &RegionDir, name: &str, initial: &[T]) -> ShmResult<Self> {
        match Self::open_in(dir, name, &[initial.len()]) {
            Ok(region) => {
                info!("Shared memory region '{}' found", name);
                Ok(region)
            }
            Err(ShmError::NotFound(_)) => match Self::create_in(dir, name, initial) {
                // Lost a creation race: someone published it in between
                Err(ShmError::AlreadyExists(_)) => Self::open_in(dir, name, &[initial.len()]),
                other => other,
            },
            Err(e) => Err(e),
        }
    }

    /// Like [`Self::create_or_open_in`] in the default directory.
    pub fn create_or_open(name: &str, initial: &[T]) -> ShmResult<Self> {
        Self::create_or_open_in(&RegionDir::system_default(), name, initial)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Detach this process's view. Idempotent; the region itself remains.
    pub fn close(&mut self) {
        if self.mmap.take().is_some() {
            self.base = std::ptr::null_mut();
            debug!("Closed shared memory region '{}'", self.name);
        }
    }

    /// Close this view and destroy the backing object.
    ///
    /// Call once, from one process, after every other view has closed.
    ///
    /// # Errors
    /// `NotFound` if the region was already deleted.
    pub fn delete(&mut self) -> ShmResult<()> {
        self.close();
        std::fs::remove_file(&self.path).map_err(|e| map_open_error(&self.name, e))?;
        info!("Deleted shared memory region '{}'", self.name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Payload size in bytes
    pub fn byte_size(&self) -> usize {
        self.len * T::DTYPE.size()
    }

    /// True for the view that created the region
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn is_closed(&self) -> bool {
        self.mmap.is_none()
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    fn base(&self) -> ShmResult<*mut u8> {
        if self.mmap.is_some() {
            Ok(self.base)
        } else {
            Err(ShmError::Closed(self.name.clone()))
        }
    }

    fn generation_word(&self) -> ShmResult<&AtomicU64> {
        let base = self.base()?;
        // Page-aligned mapping, 8-aligned offset
        Ok(unsafe { &*(base.add(GENERATION_OFFSET) as *const AtomicU64) })
    }

    /// Borrow the payload in place.
    ///
    /// Best effort only: another view of the same region, in this process or
    /// another, may write while the slice is alive, which Rust's aliasing
    /// rules do not sanction. Prefer [`Self::to_vec`] or
    /// [`Self::read_consistent`] when another writer may be active.
    pub fn values(&self) -> ShmResult<&[T]> {
        let base = self.base()?;
        Ok(unsafe { std::slice::from_raw_parts(base.add(HEADER_SIZE) as *const T, self.len) })
    }

    pub fn values_mut(&mut self) -> ShmResult<&mut [T]> {
        let base = self.base()?;
        Ok(unsafe { std::slice::from_raw_parts_mut(base.add(HEADER_SIZE) as *mut T, self.len) })
    }

    pub fn get(&self, index: usize) -> ShmResult<T> {
        let base = self.base()?;
        if index >= self.len {
            return Err(ShmError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(unsafe { std::ptr::read_volatile((base.add(HEADER_SIZE) as *const T).add(index)) })
    }

    pub fn set(&mut self, index: usize, value: T) -> ShmResult<()> {
        let len = self.len;
        let slot = self
            .values_mut()?
            .get_mut(index)
            .ok_or(ShmError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn fill(&mut self, value: T) -> ShmResult<()> {
        self.values_mut()?.fill(value);
        Ok(())
    }

    /// Overwrite every element from `values` (must have `len()` elements).
    pub fn copy_from(&mut self, values: &[T]) -> ShmResult<()> {
        if values.len() != self.len {
            return Err(ShmError::LengthMismatch {
                expected: self.len,
                actual: values.len(),
            });
        }
        self.values_mut()?.copy_from_slice(values);
        Ok(())
    }

    /// Copy the payload out without borrowing shared memory.
    pub fn to_vec(&self) -> ShmResult<Vec<T>> {
        let mut out = vec![T::zeroed(); self.len];
        self.copy_volatile(&mut out)?;
        Ok(out)
    }

    // `out.len()` must equal `self.len`
    fn copy_volatile(&self, out: &mut [T]) -> ShmResult<()> {
        debug_assert_eq!(out.len(), self.len);
        let base = self.base()?;
        // Volatile: other views may write at any time
        unsafe {
            let src = base.add(HEADER_SIZE) as *const T;
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = std::ptr::read_volatile(src.add(i));
            }
        }
        Ok(())
    }

    /// Ask the OS to write dirty pages back (only meaningful for disk-backed dirs).
    pub fn flush(&self) -> ShmResult<()> {
        match &self.mmap {
            Some(mmap) => Ok(mmap.flush()?),
            None => Err(ShmError::Closed(self.name.clone())),
        }
    }

    // ------------------------------------------------------------------
    // Generation protocol
    // ------------------------------------------------------------------

    /// Generation counter; odd while a [`Self::write_with`] is in progress.
    pub fn generation(&self) -> ShmResult<u64> {
        Ok(self.generation_word()?.load(Ordering::Acquire))
    }

    /// Run `f` on the payload inside a generation bump.
    ///
    /// Readers using [`Self::read_consistent`] never accept a snapshot that
    /// overlaps this write.
    pub fn write_with<R>(&mut self, f: impl FnOnce(&mut [T]) -> R) -> ShmResult<R> {
        let generation = self.generation_word()? as *const AtomicU64;
        // Safety: the atomic lives in the header, disjoint from the payload slice.
        let generation = unsafe { &*generation };

        let current = generation.load(Ordering::Relaxed);
        // A writer that died mid-write leaves the counter odd
        let begin = if current % 2 == 0 { current + 1 } else { current + 2 };
        generation.store(begin, Ordering::Relaxed);
        fence(Ordering::Release);

        let result = f(self.values_mut()?);

        generation.store(begin.wrapping_add(1), Ordering::Release);
        Ok(result)
    }

    /// Copy the payload into `out` without tearing.
    ///
    /// Returns the generation of the snapshot. Retries while a write is in
    /// progress or completed during the copy.
    ///
    /// # Errors
    /// `TornRead` once `max_retries` further attempts have failed.
    pub fn read_consistent_into(&self, out: &mut [T], max_retries: usize) -> ShmResult<u64> {
        if out.len() != self.len {
            return Err(ShmError::LengthMismatch {
                expected: self.len,
                actual: out.len(),
            });
        }
        let generation = self.generation_word()?;

        for _ in 0..=max_retries {
            let before = generation.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            self.copy_volatile(out)?;
            fence(Ordering::Acquire);
            let after = generation.load(Ordering::Relaxed);
            if before == after {
                return Ok(before);
            }
        }

        Err(ShmError::TornRead {
            name: self.name.clone(),
            attempts: max_retries + 1,
        })
    }

    /// Allocating form of [`Self::read_consistent_into`].
    pub fn read_consistent(&self, max_retries: usize) -> ShmResult<(u64, Vec<T>)> {
        let mut out = vec![T::zeroed(); self.len];
        let generation = self.read_consistent_into(&mut out, max_retries)?;
        Ok((generation, out))
    }
}

impl NamedRegion<u64> {
    /// View the payload as atomic words, for control blocks shared between
    /// processes.
    pub fn atomics(&self) -> ShmResult<&[AtomicU64]> {
        let base = self.base()?;
        // AtomicU64 has the same size and alignment as u64; the payload is 8-aligned.
        Ok(unsafe {
            std::slice::from_raw_parts(base.add(HEADER_SIZE) as *const AtomicU64, self.len)
        })
    }
}

impl<T: Element> Drop for NamedRegion<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Element> std::fmt::Debug for NamedRegion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedRegion")
            .field("name", &self.name)
            .field("dtype", &T::DTYPE)
            .field("shape", &self.shape)
            .field("owner", &self.owner)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Read a region's header without attaching a typed view.
pub fn inspect_in(dir: &RegionDir, name: &str) -> ShmResult<RegionInfo> {
    let path = dir.path_of(name)?;
    let mut file = File::open(&path).map_err(|e| map_open_error(name, e))?;
    let mut header = [0u8; HEADER_SIZE];
    file.read_exact(&mut header).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => ShmError::InvalidHeader {
            name: name.to_string(),
            reason: "backing object is shorter than the header".to_string(),
        },
        _ => ShmError::Io(e),
    })?;
    let decoded = decode_header(name, &header)?;
    let byte_size = element_count(&decoded.shape)? * decoded.dtype.size();
    Ok(RegionInfo {
        name: name.to_string(),
        path,
        dtype: decoded.dtype,
        shape: decoded.shape,
        byte_size,
        generation: decoded.generation,
    })
}

/// [`inspect_in`] on the default directory
pub fn inspect(name: &str) -> ShmResult<RegionInfo> {
    inspect_in(&RegionDir::system_default(), name)
}

/// [`unlink_in`] on the default directory
pub fn unlink(name: &str) -> ShmResult<()> {
    unlink_in(&RegionDir::system_default(), name)
}

/// Destroy the backing object of `name` without attaching.
pub fn unlink_in(dir: &RegionDir, name: &str) -> ShmResult<()> {
    let path = dir.path_of(name)?;
    std::fs::remove_file(&path).map_err(|e| map_open_error(name, e))?;
    info!("Unlinked shared memory region '{}'", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> (tempfile::TempDir, RegionDir) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = RegionDir::new(tmp.path());
        (tmp, dir)
    }

    #[test]
    fn test_create_then_open_sees_initial_values() {
        let (_tmp, dir) = temp_dir();
        let initial = [1.0, 1.0, 2.0, 3.0, 5.0, 8.0];
        let owner = NamedRegion::<f64>::create_in(&dir, "fib", &initial).unwrap();
        let view = NamedRegion::<f64>::open_in(&dir, "fib", &[6]).unwrap();

        assert!(owner.is_owner());
        assert!(!view.is_owner());
        assert_eq!(view.values().unwrap(), &initial);
        assert_eq!(view.byte_size(), 48);
    }

    #[test]
    fn test_create_twice_fails() {
        let (_tmp, dir) = temp_dir();
        let _first = NamedRegion::<f32>::create_in(&dir, "dup", &[0.0; 4]).unwrap();
        let second = NamedRegion::<f32>::create_in(&dir, "dup", &[0.0; 4]);
        assert!(matches!(second, Err(ShmError::AlreadyExists(name)) if name == "dup"));
    }

    #[test]
    fn test_open_missing_fails() {
        let (_tmp, dir) = temp_dir();
        let result = NamedRegion::<f64>::open_in(&dir, "ghost", &[4]);
        assert!(matches!(result, Err(ShmError::NotFound(_))));
    }

    #[test]
    fn test_open_with_wrong_shape_fails() {
        let (_tmp, dir) = temp_dir();
        let _owner = NamedRegion::<f64>::create_zeroed_in(&dir, "grid", &[2, 3]).unwrap();

        let wrong_shape = NamedRegion::<f64>::open_in(&dir, "grid", &[6]);
        assert!(matches!(wrong_shape, Err(ShmError::ShapeMismatch { .. })));

        let wrong_type = NamedRegion::<f32>::open_in(&dir, "grid", &[2, 3]);
        match wrong_type {
            Err(ShmError::ShapeMismatch { expected, actual, .. }) => {
                assert_eq!(expected, "f32[2, 3]");
                assert_eq!(actual, "f64[2, 3]");
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_open_any_infers_shape() {
        let (_tmp, dir) = temp_dir();
        let _owner = NamedRegion::<i32>::create_zeroed_in(&dir, "cube", &[2, 2, 2]).unwrap();
        let view = NamedRegion::<i32>::open_any_in(&dir, "cube").unwrap();
        assert_eq!(view.shape(), &[2, 2, 2]);
        assert_eq!(view.len(), 8);
    }

    #[test]
    fn test_create_with_wrong_initial_length_fails() {
        let (_tmp, dir) = temp_dir();
        let result = NamedRegion::<u8>::create_with_shape_in(&dir, "bad", &[2, 2], &[1, 2, 3]);
        assert!(matches!(
            result,
            Err(ShmError::LengthMismatch { expected: 4, actual: 3 })
        ));
        assert!(!dir.exists("bad"));
    }

    #[test]
    fn test_empty_initial_rejected() {
        let (_tmp, dir) = temp_dir();
        let result = NamedRegion::<f64>::create_in(&dir, "empty", &[]);
        assert!(matches!(result, Err(ShmError::InvalidShape { .. })));
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_access() {
        let (_tmp, dir) = temp_dir();
        let mut region = NamedRegion::<f64>::create_in(&dir, "c", &[1.0]).unwrap();
        region.close();
        region.close();
        assert!(region.is_closed());
        assert!(matches!(region.values(), Err(ShmError::Closed(_))));
        assert!(matches!(region.set(0, 2.0), Err(ShmError::Closed(_))));
        assert!(matches!(region.get(0), Err(ShmError::Closed(_))));
        assert!(matches!(region.to_vec(), Err(ShmError::Closed(_))));
        // Closing never removes the region
        assert!(dir.exists("c"));
    }

    #[test]
    fn test_delete_removes_and_second_delete_fails() {
        let (_tmp, dir) = temp_dir();
        let mut region = NamedRegion::<f64>::create_in(&dir, "d", &[1.0]).unwrap();
        region.delete().unwrap();
        assert!(!dir.exists("d"));
        assert!(matches!(region.delete(), Err(ShmError::NotFound(_))));
    }

    #[test]
    fn test_drop_does_not_delete() {
        let (_tmp, dir) = temp_dir();
        {
            let _region = NamedRegion::<f64>::create_in(&dir, "kept", &[3.0]).unwrap();
        }
        let view = NamedRegion::<f64>::open_in(&dir, "kept", &[1]).unwrap();
        assert_eq!(view.get(0).unwrap(), 3.0);
    }

    #[test]
    fn test_get_set_bounds() {
        let (_tmp, dir) = temp_dir();
        let mut region = NamedRegion::<i64>::create_zeroed_in(&dir, "b", &[3]).unwrap();
        region.set(2, -7).unwrap();
        assert_eq!(region.get(2).unwrap(), -7);
        assert!(matches!(
            region.get(3),
            Err(ShmError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_to_vec_is_detached_snapshot() {
        let (_tmp, dir) = temp_dir();
        let mut writer = NamedRegion::<u32>::create_in(&dir, "snap", &[1, 2, 3]).unwrap();
        let reader = NamedRegion::<u32>::open_in(&dir, "snap", &[3]).unwrap();

        let before = reader.to_vec().unwrap();
        writer.copy_from(&[7, 8, 9]).unwrap();

        assert_eq!(before, vec![1, 2, 3]);
        assert_eq!(reader.to_vec().unwrap(), vec![7, 8, 9]);
        assert_eq!(reader.get(1).unwrap(), 8);
    }

    #[test]
    fn test_create_or_open() {
        let (_tmp, dir) = temp_dir();
        let first = NamedRegion::<f64>::create_or_open_in(&dir, "ui", &[0.0; 10]).unwrap();
        assert!(first.is_owner());
        let second = NamedRegion::<f64>::create_or_open_in(&dir, "ui", &[9.0; 10]).unwrap();
        assert!(!second.is_owner());
        // Existing contents win over the second caller's initial values
        assert_eq!(second.values().unwrap(), &[0.0; 10]);
    }

    #[test]
    fn test_write_with_bumps_generation_by_two() {
        let (_tmp, dir) = temp_dir();
        let mut region = NamedRegion::<f64>::create_zeroed_in(&dir, "g", &[4]).unwrap();
        assert_eq!(region.generation().unwrap(), 0);

        region.write_with(|v| v.fill(1.5)).unwrap();
        assert_eq!(region.generation().unwrap(), 2);

        let (generation, snapshot) = region.read_consistent(4).unwrap();
        assert_eq!(generation, 2);
        assert_eq!(snapshot, vec![1.5; 4]);
    }

    #[test]
    fn test_read_consistent_fails_while_write_open() {
        let (_tmp, dir) = temp_dir();
        let mut writer = NamedRegion::<u64>::create_zeroed_in(&dir, "w", &[2]).unwrap();
        let reader = NamedRegion::<u64>::open_in(&dir, "w", &[2]).unwrap();

        writer
            .write_with(|_| {
                // Reader observes an odd generation for the whole closure
                assert!(matches!(
                    reader.read_consistent(3),
                    Err(ShmError::TornRead { attempts: 4, .. })
                ));
            })
            .unwrap();
        assert!(reader.read_consistent(0).is_ok());
    }

    #[test]
    fn test_atomics_shared_between_views() {
        let (_tmp, dir) = temp_dir();
        let owner = NamedRegion::<u64>::create_zeroed_in(&dir, "ctl", &[4]).unwrap();
        let view = NamedRegion::<u64>::open_in(&dir, "ctl", &[4]).unwrap();
        owner.atomics().unwrap()[3].store(42, Ordering::SeqCst);
        assert_eq!(view.atomics().unwrap()[3].load(Ordering::SeqCst), 42);
        assert_eq!(view.get(3).unwrap(), 42);
    }

    #[test]
    fn test_inspect_and_unlink() {
        let (_tmp, dir) = temp_dir();
        let _owner = NamedRegion::<f32>::create_zeroed_in(&dir, "meta", &[5, 2]).unwrap();

        let info = inspect_in(&dir, "meta").unwrap();
        assert_eq!(info.dtype, DType::F32);
        assert_eq!(info.shape, vec![5, 2]);
        assert_eq!(info.byte_size, 40);

        unlink_in(&dir, "meta").unwrap();
        assert!(matches!(inspect_in(&dir, "meta"), Err(ShmError::NotFound(_))));
    }

    #[test]
    fn test_truncated_backing_file_rejected() {
        let (tmp, dir) = temp_dir();
        let _owner = NamedRegion::<f64>::create_zeroed_in(&dir, "t", &[8]).unwrap();
        let file = OpenOptions::new().write(true).open(tmp.path().join("t")).unwrap();
        file.set_len((HEADER_SIZE + 8) as u64).unwrap();

        let result = NamedRegion::<f64>::open_in(&dir, "t", &[8]);
        assert!(matches!(result, Err(ShmError::InvalidHeader { .. })));
    }
}
