//! IP range membership

use crate::error::ExceptionId;
use crate::interp::{EvalError, EvalResult, Value};
use std::net::IpAddr;

/// Inclusive address range within one family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IpRange {
    v6: bool,
    start: u128,
    end: u128,
}

impl IpRange {
    /// Accepts `addr/prefix`, `first - last` and a single address
    fn parse(text: &str) -> Option<IpRange> {
        let text = text.trim();
        if let Some((addr, prefix)) = text.split_once('/') {
            let (v6, bits) = to_bits(addr.trim().parse().ok()?);
            let width = if v6 { 128 } else { 32 };
            let prefix: u32 = prefix.trim().parse().ok()?;
            if prefix > width {
                return None;
            }
            let host_bits = width - prefix;
            let host_mask = if host_bits == 128 {
                u128::MAX
            } else {
                (1u128 << host_bits) - 1
            };
            let start = bits & !host_mask;
            return Some(IpRange {
                v6,
                start,
                end: start | host_mask,
            });
        }

        if let Some((first, last)) = text.split_once('-') {
            let (v6, start) = to_bits(first.trim().parse().ok()?);
            let (last_v6, end) = to_bits(last.trim().parse().ok()?);
            return (v6 == last_v6 && start <= end).then_some(IpRange { v6, start, end });
        }

        let (v6, bits) = to_bits(text.parse().ok()?);
        Some(IpRange {
            v6,
            start: bits,
            end: bits,
        })
    }

    fn contains(&self, addr: IpAddr) -> bool {
        let (v6, bits) = to_bits(addr);
        v6 == self.v6 && (self.start..=self.end).contains(&bits)
    }
}

fn to_bits(addr: IpAddr) -> (bool, u128) {
    match addr {
        IpAddr::V4(v4) => (false, u128::from(u32::from(v4))),
        IpAddr::V6(v6) => (true, u128::from(v6)),
    }
}

fn parse_range(range: &Value, pos: usize) -> EvalResult<IpRange> {
    let text = range.to_str()?;
    IpRange::parse(&text)
        .ok_or_else(|| EvalError::user(ExceptionId::InvalidIpRange, pos, vec![text]))
}

/// `ip_in_range(ip, range)`. A malformed range is an error; a malformed
/// address is simply not in range.
pub(super) fn ip_in_range(args: &[Value], pos: usize) -> EvalResult<Value> {
    let range = parse_range(&args[1], pos)?;
    let found = args[0]
        .to_str()?
        .trim()
        .parse::<IpAddr>()
        .is_ok_and(|addr| range.contains(addr));
    Ok(Value::Bool(found))
}

/// `ip_in_ranges(ip, range, ...)`. Every range is validated.
pub(super) fn ip_in_ranges(args: &[Value], pos: usize) -> EvalResult<Value> {
    let ranges = args[1..]
        .iter()
        .map(|range| parse_range(range, pos))
        .collect::<EvalResult<Vec<_>>>()?;
    let found = args[0]
        .to_str()?
        .trim()
        .parse::<IpAddr>()
        .is_ok_and(|addr| ranges.iter().any(|range| range.contains(addr)));
    Ok(Value::Bool(found))
}
