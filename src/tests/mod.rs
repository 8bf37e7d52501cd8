// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! This module contains integration tests for the scheduler core.
//! These tests drive the scheduler and its queue clients together.

mod donation_tests;
