/*
 * SPDX-FileCopyrightText: 2023 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

pub mod avb;
pub mod bootimage;
pub mod padding;
pub mod signer;
