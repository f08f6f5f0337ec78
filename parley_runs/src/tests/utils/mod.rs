// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod env;

pub(crate) use env::{all_glyphs, assert_runs_partition, container, Manager, TestEnv};
