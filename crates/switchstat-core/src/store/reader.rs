// ── Record reader ──
//
// Parses a stream file back into records, checking the header first.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::{CoreError, RecordParseError};
use crate::model::{FlowStatRecord, PortStatRecord, RecordStream};

fn read_stream<T>(path: &Path, stream: RecordStream) -> Result<Vec<T>, CoreError>
where
    T: FromStr<Err = RecordParseError>,
{
    let read_err = |source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    };
    let parse_err = |line, source| CoreError::Parse {
        path: path.to_path_buf(),
        line,
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut lines = BufReader::new(file).lines();

    let header = lines.next().transpose().map_err(read_err)?.unwrap_or_default();
    if header != stream.header() {
        return Err(parse_err(
            1,
            RecordParseError::Header {
                expected: stream.header(),
                found: header,
            },
        ));
    }

    let mut records = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line.map_err(read_err)?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1, the first record is line 2.
        records.push(line.parse().map_err(|e| parse_err(idx + 2, e))?);
    }
    Ok(records)
}

/// Read every record from a flow stream file.
pub fn read_flow_records(path: impl AsRef<Path>) -> Result<Vec<FlowStatRecord>, CoreError> {
    read_stream(path.as_ref(), RecordStream::Flow)
}

/// Read every record from a port stream file.
pub fn read_port_records(path: impl AsRef<Path>) -> Result<Vec<PortStatRecord>, CoreError> {
    read_stream(path.as_ref(), RecordStream::Port)
}
