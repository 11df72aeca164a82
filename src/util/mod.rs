// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Common utility functions.

mod network;
mod slug;

pub use network::*;
pub use slug::*;
