// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (API key authentication, security headers).

pub mod api_key;
pub mod security;

pub use api_key::require_api_key;
