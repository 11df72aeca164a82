// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

pub mod cloud;
pub mod coordinator;
pub mod entity;
pub mod hierarchy;
pub mod registry;
pub mod server;
pub mod service;
pub mod util;

pub mod configuration;
pub mod errors;
pub mod startup;

pub use coordinator::*;
pub use startup::*;
