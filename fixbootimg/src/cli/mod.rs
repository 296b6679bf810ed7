/*
 * SPDX-FileCopyrightText: 2023 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

pub mod args;
pub mod patch;

macro_rules! status {
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*))
    }
}

macro_rules! warning {
    ($($arg:tt)*) => {
        println!("Warning: {}", format!($($arg)+))
    }
}

pub(crate) use status;
pub(crate) use warning;
