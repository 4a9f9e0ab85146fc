// ABOUTME: Application-wide constants for request limits, headers, and fallback values
// ABOUTME: Shared between the HTTP layer, the enrichment task, and the persistence layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Input length limits enforced by request validation
pub mod limits {
    /// Maximum chat message length in characters
    pub const MESSAGE_MAX_CHARS: usize = 300;
    /// Maximum recommendation text length in characters
    pub const IDEAS_MAX_CHARS: usize = 4000;
    /// Maximum recommendation source type length in characters
    pub const SOURCE_TYPE_MAX_CHARS: usize = 64;
    /// Required length of an ISO 3166-1 alpha-2 country code
    pub const COUNTRY_CODE_LEN: usize = 2;
    /// Largest request body accepted on any route
    pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
}

/// HTTP header names
pub mod headers {
    /// Header carrying the tenant secret key
    pub const API_KEY: &str = "x-api-key";
    /// Header used to read the originating client address behind a proxy
    pub const FORWARDED_FOR: &str = "x-forwarded-for";
}

/// Values attached to streamed events and persisted rows
pub mod relay {
    /// Cache marker on the `meta` event; there is no caching layer
    pub const CACHE_STATUS_MISS: &str = "miss";
    /// Topic stored when the classifier yields nothing usable
    pub const FALLBACK_TOPIC: &str = "general";
    /// Status assigned to newly submitted recommendations
    pub const RECOMMENDATION_STATUS_NEW: &str = "New";
}

/// Service identity used in logs
pub mod service_names {
    /// Name of the relay server binary
    pub const CHAT_RELAY_SERVER: &str = "chat-relay-server";
}
