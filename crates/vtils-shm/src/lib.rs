// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # vtils-shm
//!
//! Named, typed, shape-checked numeric arrays shared between processes.
//!
//! A region is a file in a [`RegionDir`] (`/dev/shm` on Linux) that every
//! participating process maps into memory. The creator records the element
//! type and shape in a fixed header; openers must agree with it.
//!
//! ```rust,no_run
//! use vtils_shm::{NamedRegion, RegionDir};
//!
//! let dir = RegionDir::system_default();
//! let mut owner = NamedRegion::<f64>::create_in(&dir, "demo", &[0.0; 4])?;
//! let view = NamedRegion::<f64>::open_in(&dir, "demo", &[4])?;
//!
//! owner.set(2, 1.5)?;
//! assert_eq!(view.get(2)?, 1.5);
//!
//! drop(view);
//! owner.delete()?;
//! # Ok::<(), vtils_shm::ShmError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dir;
pub mod error;
pub mod layout;
pub mod region;

pub use dir::{validate_name, RegionDir, MAX_NAME_LEN};
pub use error::{ShmError, ShmResult};
pub use layout::{element_count, region_size, DType, Element, HEADER_SIZE, REGION_MAGIC};
pub use region::{inspect, inspect_in, unlink, unlink_in, NamedRegion, RegionInfo};
