// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod predict;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{router, start_server, AppState, WELCOME_MESSAGE};
pub use predict::{predict_handler, DetectionResult, PredictionResponse};
