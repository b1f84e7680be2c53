// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Backend module - execution backends behind the WPS-T service.

pub mod mock;
mod traits;

pub use mock::MockBackend;
pub use traits::*;
