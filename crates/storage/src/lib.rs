// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the shared job table

mod state;
mod table;
mod wal;

pub use state::{JobOperation, MaterializedJobs};
pub use table::JobTable;
pub use wal::{Wal, WalError};
