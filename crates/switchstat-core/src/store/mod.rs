// ── Record store ──
//
// Append-only time-series streams on disk, plus the reader used to
// verify and inspect them.

mod reader;
mod writer;

pub use reader::{read_flow_records, read_port_records};
pub use writer::RecordWriter;
