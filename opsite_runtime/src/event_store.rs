//! Append-only op log: binary protobuf frames.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][ProtoOperation bytes][4-byte LE length][...]...
//!
//! Rules:
//!   - Strict append only: no mutation, no deletion, no reordering
//!   - fsync after every write
//!   - Timestamps non-decreasing (validated on append)
//!   - Frames the kernel rejects are skipped on load, not fatal

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use opsite_engine::events::Operation;
use prost::Message;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};
use crate::proto_bridge::{op_to_proto, proto_to_op};
use crate::proto_types::ProtoOperation;

const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Append-only op log backed by a binary file.
pub struct EventStore {
    path: PathBuf,
    /// (ms, original string) of the newest appended operation.
    last: Option<(i64, String)>,
    len: usize,
}

impl EventStore {
    /// Open or create a log at the given path. Reads existing frames to
    /// recover the append position.
    pub fn open(path: &Path) -> RuntimeResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = if path.exists() {
            read_frames(path)?
        } else {
            Vec::new()
        };
        let ops = decode_ops(&existing);
        let last = ops.last().map(|op| (op.ctx.ts_ms, op.ctx.ts.clone()));

        info!(path = %path.display(), frames = existing.len(), "opened op log");
        Ok(Self {
            path: path.to_path_buf(),
            last,
            len: existing.len(),
        })
    }

    /// Append one operation.
    ///
    /// Rejects an operation older than the last appended one, since replay
    /// trusts log order. Writes a length-prefixed frame and fsyncs.
    pub fn append(&mut self, op: &Operation) -> RuntimeResult<()> {
        if let Some((last_ms, last_ts)) = &self.last {
            if op.ctx.ts_ms < *last_ms {
                return Err(RuntimeError::OutOfOrder {
                    ts: op.ctx.ts.clone(),
                    last: last_ts.clone(),
                });
            }
        }

        let buf = op_to_proto(op).encode_to_vec();
        if buf.is_empty() || buf.len() > MAX_FRAME_LEN {
            return Err(RuntimeError::InvalidFrame(buf.len()));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        {
            let mut writer = BufWriter::new(&mut file);
            writer.write_all(&(buf.len() as u32).to_le_bytes())?;
            writer.write_all(&buf)?;
            writer.flush()?;
        }
        file.sync_all()?;

        debug!(event_id = %op.event_id, op = %op.op, target = %op.target, "appended");
        self.last = Some((op.ctx.ts_ms, op.ctx.ts.clone()));
        self.len += 1;
        Ok(())
    }

    /// Append every valid record of a JSON-lines file, in file order.
    /// Blank lines, unparsable JSON and malformed records are skipped.
    /// Returns the number of operations appended.
    pub fn import_jsonl(&mut self, source: &Path) -> RuntimeResult<usize> {
        let reader = BufReader::new(File::open(source)?);
        let mut appended = 0;
        for (position, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    debug!(line = position + 1, error = %e, "skipping unparsable line");
                    continue;
                }
            };
            let Some(op) = Operation::from_value(&record, self.len) else {
                debug!(line = position + 1, "skipping malformed record");
                continue;
            };
            self.append(&op)?;
            appended += 1;
        }
        info!(source = %source.display(), appended, "imported JSON lines");
        Ok(appended)
    }

    /// Load every operation in log order.
    pub fn load_all(&self) -> RuntimeResult<Vec<Operation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(decode_ops(&read_frames(&self.path)?))
    }

    /// Number of frames in the log.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Timestamp of the newest appended operation, as written.
    pub fn last_ts(&self) -> Option<&str> {
        self.last.as_ref().map(|(_, ts)| ts.as_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode_ops(frames: &[ProtoOperation]) -> Vec<Operation> {
    frames
        .iter()
        .enumerate()
        .filter_map(|(position, frame)| {
            let op = proto_to_op(frame, position);
            if op.is_none() {
                debug!(position, "skipping malformed frame");
            }
            op
        })
        .collect()
}

/// Read all frames from a file, validating frame integrity.
fn read_frames(path: &Path) -> RuntimeResult<Vec<ProtoOperation>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();
    let mut len_buf = [0u8; 4];

    loop {
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(RuntimeError::InvalidFrame(len));
        }

        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame)?;
        frames.push(ProtoOperation::decode(frame.as_slice())?);
    }

    Ok(frames)
}
