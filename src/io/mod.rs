// SPDX-License-Identifier: AGPL-3.0-or-later
//! External I/O: instrument description files and path exporters (spec
//! §4.I).

pub mod export;
pub mod xml;
