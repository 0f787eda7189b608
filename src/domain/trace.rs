use hyper::Version;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Timings of the final hop of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceInfo {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    /// Includes the proxy CONNECT exchange when tunnelling
    pub tls_handshake: Duration,
    /// From sending the request, once the HTTP/1 or HTTP/2 handshake is done,
    /// to the response head arriving
    pub first_byte: Duration,
    pub content_transfer: Duration,
    pub total: Duration,
    pub remote_addr: Option<SocketAddr>,
    pub version: Version,
}

impl TraceInfo {
    /// Names the phase that dominated the request
    pub fn blame(&self) -> String {
        if self.total.is_zero() {
            return "trace info not available".to_string();
        }
        let phases = [
            (
                self.dns_lookup,
                "dns lookup, maybe the dns server is slow or the domain does not resolve well",
            ),
            (
                self.tcp_connect,
                "tcp connect, maybe the network is unstable or the server is far away",
            ),
            (
                self.tls_handshake,
                "tls handshake, maybe the server's tls setup or the network is slow",
            ),
            (
                self.first_byte,
                "waiting for the first response byte, maybe the server is slow to process the request",
            ),
            (
                self.content_transfer,
                "reading the response body, maybe the body is large or the network is slow",
            ),
        ];
        let (spent, reason) = phases
            .iter()
            .max_by_key(|(spent, _)| *spent)
            .copied()
            .unwrap_or((Duration::ZERO, "unknown"));
        let share = spent.as_secs_f64() / self.total.as_secs_f64() * 100.0;
        format!(
            "the request took {:?} in total, {:?} ({share:.0}%) of it in {reason}",
            self.total, spent
        )
    }
}

impl fmt::Display for TraceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DNSLookupTime        : {:?}", self.dns_lookup)?;
        writeln!(f, "TCPConnectTime       : {:?}", self.tcp_connect)?;
        writeln!(f, "TLSHandshakeTime     : {:?}", self.tls_handshake)?;
        writeln!(f, "FirstResponseTime    : {:?}", self.first_byte)?;
        writeln!(f, "ResponseTime         : {:?}", self.content_transfer)?;
        writeln!(f, "TotalTime            : {:?}", self.total)?;
        writeln!(f, "Protocol             : {:?}", self.version)?;
        match self.remote_addr {
            Some(addr) => write!(f, "RemoteAddr           : {addr}"),
            None => write!(f, "RemoteAddr           : -"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blames_the_slowest_phase() {
        let trace = TraceInfo {
            dns_lookup: Duration::from_millis(5),
            tcp_connect: Duration::from_millis(10),
            tls_handshake: Duration::from_millis(20),
            first_byte: Duration::from_millis(200),
            content_transfer: Duration::from_millis(15),
            total: Duration::from_millis(250),
            ..TraceInfo::default()
        };
        let blame = trace.blame();
        assert!(blame.contains("first response byte"), "{blame}");
        assert!(blame.contains("80%"), "{blame}");
    }

    #[test]
    fn empty_trace_is_reported_as_unavailable() {
        assert_eq!(TraceInfo::default().blame(), "trace info not available");
    }

    #[test]
    fn display_lists_every_phase() {
        let text = TraceInfo::default().to_string();
        for label in ["DNSLookupTime", "TCPConnectTime", "TLSHandshakeTime", "TotalTime"] {
            assert!(text.contains(label), "missing {label}");
        }
    }
}
