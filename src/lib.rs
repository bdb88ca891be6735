// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod astro_time;
pub mod catalog;
pub mod config;
pub mod horizon;
pub mod interpreter_trait;
pub mod localize;
pub mod optics;
pub mod riseset;
pub mod sun_moon;
