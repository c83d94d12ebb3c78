//! Per-subsystem kickstart command tables.  Each module contributes
//! its own commands, data record types, sections and addons; the
//! composer in [`crate::spec`] merges them.
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub mod deployment;
pub mod network;
pub mod payload;
pub mod storage;
pub mod system;

/// Baseline kickstart syntax version for the builtin modules.
pub(crate) const BASE_VERSION: u32 = 30;
/// Current syntax version; options introduced later than
/// [`BASE_VERSION`] cite the release that added them.
pub(crate) const CURRENT_VERSION: u32 = 34;
