// ABOUTME: The fixed three-event SSE sequence (meta, token, done) for a generated reply
// ABOUTME: Events are built before the stream opens; the stream owns the persistence guard
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::recorder::{ExchangeRecorder, RecordOnDrop};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use relay_core::constants::relay::CACHE_STATUS_MISS;
use relay_core::errors::AppError;
use relay_core::models::Exchange;
use serde::Serialize;
use std::convert::Infallible;

/// Event names in emission order
pub const EVENT_META: &str = "meta";
/// Event carrying the reply text
pub const EVENT_TOKEN: &str = "token";
/// Final event
pub const EVENT_DONE: &str = "done";

/// Payload of the `meta` event
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPayload<'a> {
    /// Always true
    pub ok: bool,
    /// Always "miss"
    pub cache: &'static str,
    /// Server receipt time of the request
    pub received_at: String,
    /// Effective conversation id
    pub conversation_id: &'a str,
}

/// Payload of the `token` event
#[derive(Debug, Serialize)]
pub struct TokenPayload<'a> {
    /// Full reply text
    pub text: &'a str,
}

/// Payload of the `done` event
#[derive(Debug, Serialize)]
pub struct DonePayload {
    /// Always true
    pub ok: bool,
}

fn receipt_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the three events for `exchange`
///
/// # Errors
///
/// Returns an error if a payload cannot be serialized
pub fn build_events(exchange: &Exchange) -> Result<[Event; 3], AppError> {
    let serialize = |e: axum::Error| AppError::internal(format!("Failed to encode event: {e}"));

    let meta = Event::default()
        .event(EVENT_META)
        .json_data(MetaPayload {
            ok: true,
            cache: CACHE_STATUS_MISS,
            received_at: receipt_timestamp(&exchange.received_at),
            conversation_id: &exchange.conversation_id,
        })
        .map_err(serialize)?;
    let token = Event::default()
        .event(EVENT_TOKEN)
        .json_data(TokenPayload {
            text: &exchange.assistant_reply,
        })
        .map_err(serialize)?;
    let done = Event::default()
        .event(EVENT_DONE)
        .json_data(DonePayload { ok: true })
        .map_err(serialize)?;

    Ok([meta, token, done])
}

/// Stream the reply, then hand the exchange to the recorder
///
/// Nothing fallible happens once the stream is returned. The recorder runs
/// when the stream is exhausted or dropped, whichever comes first.
///
/// # Errors
///
/// Returns an error if the events cannot be built; no stream is opened then,
/// and the exchange is still recorded
pub fn stream_exchange(recorder: &ExchangeRecorder, exchange: Exchange) -> Result<Response, AppError> {
    let events = match build_events(&exchange) {
        Ok(events) => events,
        Err(e) => {
            recorder.record(exchange);
            return Err(e);
        }
    };
    let guard = RecordOnDrop::new(recorder.clone(), exchange);

    let stream = async_stream::stream! {
        let _guard = guard;
        for event in events {
            yield Ok::<Event, Infallible>(event);
        }
    };

    Ok(([("x-accel-buffering", "no")], Sse::new(stream)).into_response())
}
