/*
 * SPDX-FileCopyrightText: 2023 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

//! fixbootimg is primarily an application. The library API exists so that the
//! patching logic can be tested and fuzzed without going through the CLI, and
//! may change at any time.
//!
//! The CLI source files deal with paths and console output, while the
//! [`format`] and [`patch`] modules only operate on in-memory buffers.

pub mod cli;
pub mod format;
pub mod patch;
pub mod stream;
pub mod util;
