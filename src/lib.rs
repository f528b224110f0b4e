// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # vtils - live telemetry over named shared memory
//!
//! Two components, usable independently or together:
//!
//! - [`shm`]: named, typed, shape-checked numeric arrays shared between
//!   processes ([`NamedRegion`](shm::NamedRegion))
//! - [`srv`] (feature `srv`): a fixed-capacity cyclic (x, y) buffer per
//!   series, drawn live by a separate viewer process
//!   ([`CircularSeriesBuffer`](srv::CircularSeriesBuffer))
//!
//! ## Feature Flags
//! - **`srv`** (default): series buffers and the `srv-viewer` process
//! - **`gui`** (default): windowed viewer backend; without it the viewer is headless
//! - **`file-logging`**: daily-rolling log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vtils::prelude::*;
//!
//! let mut srv = CircularSeriesBuffer::new(
//!     SrvOptions::default().with_legends(["loss", "reward"]),
//! )?;
//! srv.append_values(&[("loss", 0.9), ("reward", 0.1)])?;
//! srv.close()?;
//! # Ok::<(), vtils::srv::SrvError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use vtils_config as config;
pub use vtils_observability as observability;
pub use vtils_shm as shm;

#[cfg(feature = "srv")]
pub use vtils_srv as srv;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::config::{load_config_or_default, VtilsConfig};
    pub use crate::observability::{init_logging, CrateDebugFlags};
    pub use crate::shm::{DType, Element, NamedRegion, RegionDir, ShmError, ShmResult};

    #[cfg(feature = "srv")]
    pub use crate::srv::{
        CircularSeriesBuffer, Color, DictPlot, Fill, LaunchMode, SeriesSnapshot, SrvError,
        SrvOptions, SrvResult,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        assert_eq!(<f64 as Element>::DTYPE, DType::F64);
        assert!(crate::config::validate_config(&VtilsConfig::default()).is_ok());
    }
}
