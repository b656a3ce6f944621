// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in domain handlers.

mod remote_op;
mod vin;

pub use remote_op::{DeviceMessenger, RemoteOperationHandler};
pub use vin::VinHandler;
