// ── Stats formatter ──
//
// Pure mapping from reply payloads to ordered records. The caller
// supplies the timestamp, so identical inputs always produce identical
// output.

use chrono::{DateTime, Utc};

use crate::error::MalformedReplyError;
use crate::model::{
    Action, DatapathId, FlowStatRecord, FlowStatsEntry, MacAddress, PortNo, PortStatRecord,
    PortStatsEntry,
};

/// A learned flow entry whose shape has been checked.
///
/// Produced by [`learned_flows`]; turning one into a record cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFlow<'a> {
    pub in_port: PortNo,
    pub eth_dst: &'a MacAddress,
    pub out_port: PortNo,
    pub entry: &'a FlowStatsEntry,
}

/// Check a single learned entry and pull out the fields a record needs.
pub fn validate_flow(
    datapath: DatapathId,
    entry: &FlowStatsEntry,
) -> Result<ValidFlow<'_>, MalformedReplyError> {
    let in_port = entry
        .flow_match
        .in_port
        .ok_or(MalformedReplyError::MissingMatchField {
            datapath,
            field: "in_port",
        })?;
    let eth_dst = entry
        .flow_match
        .eth_dst
        .as_ref()
        .ok_or(MalformedReplyError::MissingMatchField {
            datapath,
            field: "eth_dst",
        })?;
    // The flow stream is comma-delimited; anything but a MAC could split a line.
    if !eth_dst.is_well_formed() {
        return Err(MalformedReplyError::InvalidEthDst {
            datapath,
            in_port,
            value: eth_dst.as_str().to_owned(),
        });
    }

    let instruction = entry
        .instructions
        .first()
        .ok_or(MalformedReplyError::NoInstructions { datapath, in_port })?;
    let action = instruction
        .actions()
        .and_then(<[Action]>::first)
        .ok_or(MalformedReplyError::NoActions { datapath, in_port })?;
    let Action::Output { port: out_port, .. } = action else {
        return Err(MalformedReplyError::NotOutput {
            datapath,
            in_port,
            kind: action.kind().to_owned(),
        });
    };

    Ok(ValidFlow {
        in_port,
        eth_dst,
        out_port: *out_port,
        entry,
    })
}

/// Keep learned entries, validate them, and order them by
/// `(in_port, eth_dst)`. The sort is stable, so equal keys keep their
/// reply order. Any malformed learned entry rejects the whole body.
pub fn learned_flows(
    datapath: DatapathId,
    body: &[FlowStatsEntry],
) -> Result<Vec<ValidFlow<'_>>, MalformedReplyError> {
    let mut flows = body
        .iter()
        .filter(|entry| entry.is_learned())
        .map(|entry| validate_flow(datapath, entry))
        .collect::<Result<Vec<_>, _>>()?;
    flows.sort_by(|a, b| (a.in_port, a.eth_dst).cmp(&(b.in_port, b.eth_dst)));
    Ok(flows)
}

/// Map one validated flow to its record.
pub fn flow_record(datapath: DatapathId, flow: &ValidFlow<'_>, now: DateTime<Utc>) -> FlowStatRecord {
    FlowStatRecord {
        timestamp: now,
        datapath,
        in_port: flow.in_port,
        eth_dst: flow.eth_dst.clone(),
        out_port: flow.out_port,
        packets: flow.entry.packet_count,
        bytes: flow.entry.byte_count,
    }
}

/// Map one port entry to its record.
pub fn port_record(datapath: DatapathId, entry: &PortStatsEntry, now: DateTime<Utc>) -> PortStatRecord {
    PortStatRecord {
        timestamp: now,
        datapath,
        port_no: entry.port_no,
        rx_packets: entry.rx_packets,
        rx_bytes: entry.rx_bytes,
        rx_errors: entry.rx_errors,
        tx_packets: entry.tx_packets,
        tx_bytes: entry.tx_bytes,
        tx_errors: entry.tx_errors,
    }
}

/// Port entries ordered by port number. Nothing is filtered: a reserved
/// aggregate entry is kept if the switch reported one.
pub fn sorted_ports(body: &[PortStatsEntry]) -> Vec<&PortStatsEntry> {
    let mut ports: Vec<&PortStatsEntry> = body.iter().collect();
    ports.sort_by_key(|p| p.port_no);
    ports
}

/// All flow records for a reply body, stamped with `now`.
pub fn flow_records(
    datapath: DatapathId,
    body: &[FlowStatsEntry],
    now: DateTime<Utc>,
) -> Result<Vec<FlowStatRecord>, MalformedReplyError> {
    Ok(learned_flows(datapath, body)?
        .iter()
        .map(|flow| flow_record(datapath, flow, now))
        .collect())
}

/// All port records for a reply body, stamped with `now`.
pub fn port_records(
    datapath: DatapathId,
    body: &[PortStatsEntry],
    now: DateTime<Utc>,
) -> Vec<PortStatRecord> {
    sorted_ports(body)
        .into_iter()
        .map(|entry| port_record(datapath, entry, now))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{FlowMatch, Instruction};

    const DP: DatapathId = DatapathId(0x1);

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn mac(last: u8) -> String {
        format!("aa:bb:cc:dd:ee:{last:02x}")
    }

    #[test]
    fn keeps_only_priority_one_sorted_by_port_then_dst() {
        let body = vec![
            FlowStatsEntry::table_miss(),
            FlowStatsEntry::learned(2u32, mac(2).as_str(), 1u32).with_counters(5, 500),
            FlowStatsEntry::learned(1u32, mac(1).as_str(), 2u32).with_counters(7, 700),
            FlowStatsEntry::learned(1u32, mac(9).as_str(), 3u32).with_priority(2),
        ];

        let records = flow_records(DP, &body, now()).unwrap();
        let keys: Vec<(u32, &str, u64)> = records
            .iter()
            .map(|r| (r.in_port.get(), r.eth_dst.as_str(), r.packets))
            .collect();
        assert_eq!(keys, vec![(1, "aa:bb:cc:dd:ee:01", 7), (2, "aa:bb:cc:dd:ee:02", 5)]);
        assert!(records.iter().all(|r| r.timestamp == now() && r.datapath == DP));
    }

    #[test]
    fn equal_keys_keep_reply_order() {
        let body = vec![
            FlowStatsEntry::learned(1u32, mac(1).as_str(), 2u32).with_counters(1, 0),
            FlowStatsEntry::learned(1u32, mac(1).as_str(), 3u32).with_counters(2, 0),
        ];
        let records = flow_records(DP, &body, now()).unwrap();
        assert_eq!(records[0].out_port, PortNo(2));
        assert_eq!(records[1].out_port, PortNo(3));
    }

    #[test]
    fn dst_breaks_port_ties() {
        let body = vec![
            FlowStatsEntry::learned(3u32, mac(0xb0).as_str(), 1u32),
            FlowStatsEntry::learned(3u32, mac(0x0a).as_str(), 1u32),
        ];
        let records = flow_records(DP, &body, now()).unwrap();
        assert_eq!(records[0].eth_dst.as_str(), "aa:bb:cc:dd:ee:0a");
    }

    #[test]
    fn out_port_comes_from_first_action_of_first_instruction() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.instructions.push(Instruction::ApplyActions {
            actions: vec![Action::output(9u32)],
        });
        let records = flow_records(DP, &[entry], now()).unwrap();
        assert_eq!(records[0].out_port, PortNo(4));
    }

    #[test]
    fn empty_instructions_are_malformed() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.instructions.clear();
        let err = flow_records(DP, &[entry], now()).unwrap_err();
        assert_eq!(err, MalformedReplyError::NoInstructions { datapath: DP, in_port: PortNo(1) });
    }

    #[test]
    fn empty_actions_are_malformed() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.instructions = vec![Instruction::ApplyActions { actions: vec![] }];
        let err = flow_records(DP, &[entry], now()).unwrap_err();
        assert!(matches!(err, MalformedReplyError::NoActions { .. }));
    }

    #[test]
    fn goto_table_first_is_malformed() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.instructions.insert(0, Instruction::GotoTable { table_id: 1 });
        assert!(matches!(
            flow_records(DP, &[entry], now()),
            Err(MalformedReplyError::NoActions { .. })
        ));
    }

    #[test]
    fn non_output_first_action_is_malformed() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.instructions = vec![Instruction::ApplyActions {
            actions: vec![Action::SetQueue { queue_id: 1 }, Action::output(4u32)],
        }];
        let err = flow_records(DP, &[entry], now()).unwrap_err();
        assert!(matches!(err, MalformedReplyError::NotOutput { ref kind, .. } if kind == "set_queue"));
    }

    #[test]
    fn missing_match_field_is_malformed() {
        let mut entry = FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32);
        entry.flow_match = FlowMatch {
            in_port: Some(PortNo(1)),
            eth_dst: None,
        };
        let err = flow_records(DP, &[entry], now()).unwrap_err();
        assert_eq!(err, MalformedReplyError::MissingMatchField { datapath: DP, field: "eth_dst" });
    }

    #[test]
    fn non_mac_eth_dst_is_malformed() {
        let body = vec![
            FlowStatsEntry::learned(1u32, mac(1).as_str(), 4u32),
            FlowStatsEntry::learned(2u32, "aa:bb,cc:dd:ee:ff", 4u32),
        ];
        let err = flow_records(DP, &body, now()).unwrap_err();
        assert_eq!(
            err,
            MalformedReplyError::InvalidEthDst {
                datapath: DP,
                in_port: PortNo(2),
                value: "aa:bb,cc:dd:ee:ff".into(),
            }
        );
    }

    #[test]
    fn malformed_non_learned_entries_are_ignored() {
        let mut entry = FlowStatsEntry::table_miss();
        entry.instructions.clear();
        assert!(flow_records(DP, &[entry], now()).unwrap().is_empty());
    }

    #[test]
    fn ports_sorted_and_unfiltered() {
        let body = vec![
            PortStatsEntry::new(3u32),
            PortStatsEntry::new(PortNo::LOCAL),
            PortStatsEntry::new(1u32),
            PortStatsEntry::new(2u32),
        ];
        let ports: Vec<u32> = port_records(DP, &body, now()).iter().map(|r| r.port_no.get()).collect();
        assert_eq!(ports, vec![1, 2, 3, 0xffff_fffe]);
    }

    #[test]
    fn port_record_copies_every_counter() {
        let entry = PortStatsEntry {
            port_no: PortNo(5),
            rx_packets: 1,
            rx_bytes: 2,
            rx_errors: 3,
            tx_packets: 4,
            tx_bytes: 5,
            tx_errors: 6,
        };
        let rec = port_record(DP, &entry, now());
        assert_eq!(
            (rec.rx_packets, rec.rx_bytes, rec.rx_errors, rec.tx_packets, rec.tx_bytes, rec.tx_errors),
            (1, 2, 3, 4, 5, 6)
        );
    }
}
