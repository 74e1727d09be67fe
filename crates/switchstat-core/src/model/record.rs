// ── Time-series records ──
//
// One line per record. Flow lines are comma-delimited, port lines are
// space-delimited; both are fixed-width and both parse back into the
// same field values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::ids::{DatapathId, MacAddress, PortNo};
use crate::error::RecordParseError;

pub const FLOW_HEADER: &str = "epoch-time,datapath,in-port,eth-dest,out-port,packets,bytes";
pub const PORT_HEADER: &str =
    "epoch-time,datapath,port,rx-pkts,rx-bytes,rx-error,tx-pkts,tx-bytes,tx-error";

/// The two record streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RecordStream {
    Flow,
    Port,
}

impl RecordStream {
    pub const fn header(self) -> &'static str {
        match self {
            Self::Flow => FLOW_HEADER,
            Self::Port => PORT_HEADER,
        }
    }
}

// ── Timestamps ──────────────────────────────────────────────────────

/// Seconds since the Unix epoch, with four decimals as written to the streams.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions,
    clippy::cast_precision_loss
)]
fn parse_epoch(raw: &str) -> Result<DateTime<Utc>, RecordParseError> {
    let invalid = || RecordParseError::InvalidField {
        field: "epoch-time",
        value: raw.to_owned(),
    };
    let secs: f64 = raw.parse().map_err(|_| invalid())?;
    if !secs.is_finite() || secs < 0.0 || secs > i64::MAX as f64 / 1_000_000.0 {
        return Err(invalid());
    }
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64).ok_or_else(invalid)
}

fn parse_dec(field: &'static str, raw: &str) -> Result<u64, RecordParseError> {
    raw.parse().map_err(|_| RecordParseError::InvalidField {
        field,
        value: raw.to_owned(),
    })
}

fn parse_port(field: &'static str, raw: &str) -> Result<PortNo, RecordParseError> {
    u32::from_str_radix(raw, 16)
        .map(PortNo)
        .map_err(|_| RecordParseError::InvalidField {
            field,
            value: raw.to_owned(),
        })
}

fn parse_datapath(raw: &str) -> Result<DatapathId, RecordParseError> {
    if raw.len() != 16 {
        return Err(RecordParseError::InvalidField {
            field: "datapath",
            value: raw.to_owned(),
        });
    }
    raw.parse().map_err(|_| RecordParseError::InvalidField {
        field: "datapath",
        value: raw.to_owned(),
    })
}

fn expect_fields<'a>(
    fields: Vec<&'a str>,
    expected: usize,
) -> Result<Vec<&'a str>, RecordParseError> {
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(RecordParseError::FieldCount {
            expected,
            found: fields.len(),
        })
    }
}

// ── FlowStatRecord ──────────────────────────────────────────────────

/// One learned flow rule's counters at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatRecord {
    pub timestamp: DateTime<Utc>,
    pub datapath: DatapathId,
    pub in_port: PortNo,
    pub eth_dst: MacAddress,
    pub out_port: PortNo,
    pub packets: u64,
    pub bytes: u64,
}

impl fmt::Display for FlowStatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4},{:016x},{:>8x},{:>17},{:>8x},{:>8},{:>8}",
            epoch_seconds(self.timestamp),
            self.datapath,
            self.in_port,
            self.eth_dst,
            self.out_port,
            self.packets,
            self.bytes,
        )
    }
}

impl FromStr for FlowStatRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = expect_fields(line.trim_end().split(',').map(str::trim).collect(), 7)?;
        let [ts, dp, in_port, eth_dst, out_port, packets, bytes] = fields.as_slice() else {
            return Err(RecordParseError::FieldCount {
                expected: 7,
                found: fields.len(),
            });
        };
        let mac = MacAddress::new(eth_dst);
        if !mac.is_well_formed() {
            return Err(RecordParseError::InvalidField {
                field: "eth-dest",
                value: (*eth_dst).to_owned(),
            });
        }
        Ok(Self {
            timestamp: parse_epoch(ts)?,
            datapath: parse_datapath(dp)?,
            in_port: parse_port("in-port", in_port)?,
            eth_dst: mac,
            out_port: parse_port("out-port", out_port)?,
            packets: parse_dec("packets", packets)?,
            bytes: parse_dec("bytes", bytes)?,
        })
    }
}

// ── PortStatRecord ──────────────────────────────────────────────────

/// One port's counters at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatRecord {
    pub timestamp: DateTime<Utc>,
    pub datapath: DatapathId,
    pub port_no: PortNo,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_errors: u64,
}

impl fmt::Display for PortStatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} {:016x} {:>8x} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            epoch_seconds(self.timestamp),
            self.datapath,
            self.port_no,
            self.rx_packets,
            self.rx_bytes,
            self.rx_errors,
            self.tx_packets,
            self.tx_bytes,
            self.tx_errors,
        )
    }
}

impl FromStr for PortStatRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = expect_fields(line.split_whitespace().collect(), 9)?;
        let [ts, dp, port, rx_p, rx_b, rx_e, tx_p, tx_b, tx_e] = fields.as_slice() else {
            return Err(RecordParseError::FieldCount {
                expected: 9,
                found: fields.len(),
            });
        };
        Ok(Self {
            timestamp: parse_epoch(ts)?,
            datapath: parse_datapath(dp)?,
            port_no: parse_port("port", port)?,
            rx_packets: parse_dec("rx-pkts", rx_p)?,
            rx_bytes: parse_dec("rx-bytes", rx_b)?,
            rx_errors: parse_dec("rx-error", rx_e)?,
            tx_packets: parse_dec("tx-pkts", tx_p)?,
            tx_bytes: parse_dec("tx-bytes", tx_b)?,
            tx_errors: parse_dec("tx-error", tx_e)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp_micros(1_700_000_000_123_400).unwrap()
    }

    fn flow() -> FlowStatRecord {
        FlowStatRecord {
            timestamp: ts(),
            datapath: DatapathId(1),
            in_port: PortNo(2),
            eth_dst: MacAddress::new("00:00:00:00:00:01"),
            out_port: PortNo(1),
            packets: 42,
            bytes: 4116,
        }
    }

    fn port() -> PortStatRecord {
        PortStatRecord {
            timestamp: ts(),
            datapath: DatapathId(0x2a),
            port_no: PortNo::LOCAL,
            rx_packets: 10,
            rx_bytes: 980,
            rx_errors: 0,
            tx_packets: 12,
            tx_bytes: 1200,
            tx_errors: 1,
        }
    }

    #[test]
    fn flow_line_layout() {
        insta::assert_snapshot!(
            flow().to_string(),
            @"1700000000.1234,0000000000000001,       2,00:00:00:00:00:01,       1,      42,    4116"
        );
    }

    #[test]
    fn port_line_layout() {
        insta::assert_snapshot!(
            port().to_string(),
            @"1700000000.1234 000000000000002a fffffffe       10      980        0       12     1200        1"
        );
    }

    #[test]
    fn flow_line_parses_back() {
        let parsed: FlowStatRecord = flow().to_string().parse().unwrap();
        assert_eq!(parsed, flow());
    }

    #[test]
    fn port_line_parses_back() {
        let parsed: PortStatRecord = port().to_string().parse().unwrap();
        assert_eq!(parsed, port());
    }

    #[test]
    fn wide_counters_still_parse() {
        let mut rec = port();
        rec.rx_bytes = 123_456_789_012;
        let parsed: PortStatRecord = rec.to_string().parse().unwrap();
        assert_eq!(parsed.rx_bytes, 123_456_789_012);
    }

    #[test]
    fn short_flow_line_is_rejected() {
        let err = "1.0,0000000000000001,1".parse::<FlowStatRecord>().unwrap_err();
        assert!(matches!(err, RecordParseError::FieldCount { expected: 7, found: 3 }));
    }

    #[test]
    fn bad_eth_dest_is_rejected() {
        let line = "1.0,0000000000000001,1,not-a-mac,2,3,4";
        let err = line.parse::<FlowStatRecord>().unwrap_err();
        assert!(matches!(err, RecordParseError::InvalidField { field: "eth-dest", .. }));
    }

    #[test]
    fn bad_hex_port_is_rejected() {
        let line = "1.0000 0000000000000001 zz 1 2 3 4 5 6";
        let err = line.parse::<PortStatRecord>().unwrap_err();
        assert!(matches!(err, RecordParseError::InvalidField { field: "port", .. }));
    }

    #[test]
    fn stream_names_round_trip() {
        assert_eq!(RecordStream::Flow.to_string(), "flow");
        assert_eq!("port".parse::<RecordStream>().unwrap(), RecordStream::Port);
        assert!(RecordStream::Port.header().starts_with("epoch-time,"));
    }
}
