//! Answers a pending filesystem-watch request with a chunk of the watched
//! file's published snapshot.
//!
//! The live response is discarded: the window is replaced with a complete
//! HTTP/1.1 response of exactly `RESP_WINDOW_LEN` bytes whose body is
//!
//! ```text
//! <CHUNK_LEN bytes of data, '_' padded>\n<op><key>
//! ```
//!
//! where `op` is `#` when another chunk follows (and `key` names it) or `_`
//! when the snapshot is exhausted (`key` is `____`). Requests are the watched
//! path, optionally suffixed with `#<key>` to ask for a later chunk. A request
//! whose last `#` is not followed by a valid key is rejected.

use dashmap::DashMap;
use std::sync::Arc;

use crate::{
    engine::{handler::ResponseHandler, window::ResponseWindow, RESP_WINDOW_LEN},
    errors::HandlerError,
};

const HEADER: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 088\r\n\r\n";
const BODY_LEN: usize = RESP_WINDOW_LEN - HEADER.len();
const TRAILER_LEN: usize = 6;

/// Snapshot bytes carried per response.
pub const CHUNK_LEN: usize = BODY_LEN - TRAILER_LEN;

const KEY_LEN: usize = 4;
const PAD: u8 = b'_';
const OP_MORE: u8 = b'#';
const OP_DONE: u8 = b'_';

// Content-Length in HEADER is hard-coded
const _: () = assert!(BODY_LEN == 88);

/// Encode a chunk index as four letters, `AAAA` being chunk 0.
pub fn encode_key(mut chunk: u32) -> Option<[u8; KEY_LEN]> {
    let mut key = [b'A'; KEY_LEN];
    for slot in key.iter_mut().rev() {
        *slot = b'A' + (chunk % 26) as u8;
        chunk /= 26;
    }
    if chunk == 0 {
        Some(key)
    } else {
        None
    }
}

pub fn decode_key(key: &[u8]) -> Option<u32> {
    if key.len() != KEY_LEN {
        return None;
    }
    key.iter().try_fold(0u32, |acc, &c| {
        c.is_ascii_uppercase().then(|| acc * 26 + (c - b'A') as u32)
    })
}

/// A parsed watch request.
#[derive(Debug, PartialEq, Eq)]
pub struct WatchRequest<'a> {
    pub path: &'a str,
    pub chunk: u32,
}

impl<'a> WatchRequest<'a> {
    pub fn parse(request: &'a [u8]) -> Result<Self, HandlerError> {
        let text = std::str::from_utf8(request).map_err(|_| HandlerError::BadRequest)?;

        // Anything after the last '#' must be a chunk key
        let (path, chunk) = match text.rsplit_once('#') {
            Some((path, key)) => {
                let chunk = decode_key(key.as_bytes()).ok_or(HandlerError::BadRequest)?;
                (path, chunk)
            }
            None => (text, 0),
        };

        if path.is_empty() {
            return Err(HandlerError::BadRequest);
        }
        Ok(WatchRequest { path, chunk })
    }
}

/// Write chunk `chunk` of `data` into `window` in the response format above.
pub fn encode_chunk(
    data: &[u8],
    chunk: u32,
    window: &mut ResponseWindow,
) -> Result<(), HandlerError> {
    let start = (chunk as usize)
        .checked_mul(CHUNK_LEN)
        .ok_or(HandlerError::ChunkOutOfRange(chunk))?;
    // Chunk 0 of an empty snapshot is a valid, empty answer
    if start > data.len() || (start == data.len() && chunk != 0) {
        return Err(HandlerError::ChunkOutOfRange(chunk));
    }
    let end = data.len().min(start + CHUNK_LEN);
    let piece = &data[start..end];

    let (op, key) = if end < data.len() {
        let next = encode_key(chunk + 1).ok_or(HandlerError::ChunkOutOfRange(chunk + 1))?;
        (OP_MORE, next)
    } else {
        (OP_DONE, [PAD; KEY_LEN])
    };

    let (head, body) = window.split_at_mut(HEADER.len());
    head.copy_from_slice(HEADER);

    let (payload, trailer) = body.split_at_mut(CHUNK_LEN);
    payload[..piece.len()].copy_from_slice(piece);
    payload[piece.len()..].fill(PAD);

    trailer[0] = b'\n';
    trailer[1] = op;
    trailer[2..].copy_from_slice(&key);
    Ok(())
}

/// Decoded body of a rewritten response.
#[derive(Debug, PartialEq, Eq)]
pub struct WatchChunk<'a> {
    /// Data area including any trailing padding.
    pub data: &'a [u8],
    pub next: Option<u32>,
}

/// Client-side view of a rewritten response window.
pub fn decode_chunk(window: &[u8]) -> Option<WatchChunk<'_>> {
    let body = window.strip_prefix(HEADER)?;
    if body.len() != BODY_LEN {
        return None;
    }
    let (data, trailer) = body.split_at(CHUNK_LEN);
    if trailer[0] != b'\n' {
        return None;
    }

    let next = match trailer[1] {
        OP_DONE => None,
        OP_MORE => Some(decode_key(&trailer[2..])?),
        _ => return None,
    };
    Some(WatchChunk { data, next })
}

/// Snapshots of watched files, published by the control plane.
#[derive(Default)]
pub struct WatchStore {
    snapshots: DashMap<String, Arc<[u8]>>,
}

impl WatchStore {
    pub fn new() -> Self {
        WatchStore {
            snapshots: DashMap::new(),
        }
    }

    pub fn publish(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.snapshots.insert(path.into(), Arc::from(data));
    }

    pub fn withdraw(&self, path: &str) -> bool {
        self.snapshots.remove(path).is_some()
    }

    pub fn snapshot(&self, path: &str) -> Option<Arc<[u8]>> {
        self.snapshots.get(path).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

pub struct FsWatchHandler {
    store: Arc<WatchStore>,
}

impl FsWatchHandler {
    pub fn new(store: Arc<WatchStore>) -> Self {
        FsWatchHandler { store }
    }
}

impl ResponseHandler for FsWatchHandler {
    fn name(&self) -> &'static str {
        "fs_watch"
    }

    fn handle(&self, request: &[u8], window: &mut ResponseWindow) -> Result<(), HandlerError> {
        let req = WatchRequest::parse(request)?;
        let snapshot = self.store.snapshot(req.path);
        let data = snapshot.as_deref().unwrap_or(&[]);
        encode_chunk(data, req.chunk, window)
    }
}
