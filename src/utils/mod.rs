/// Validate an IPv4 address (e.g., "192.168.1.1").
/// Returns true if the string is a valid dotted-decimal IPv4 address.
pub fn is_valid_ipv4(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|p| p.parse::<u8>().is_ok())
}

/// Validate a GPON interface id such as "1/2/1:7" before it is spliced into device commands.
/// Digits separated by '/', with an optional ":<ont id>" suffix.
pub fn is_valid_gpon_interface(iface: &str) -> bool {
    if iface.is_empty() || iface.len() > 32 {
        return false;
    }
    let (port, ont) = match iface.split_once(':') {
        Some((port, ont)) => (port, Some(ont)),
        None => (iface, None),
    };

    let port_ok = port
        .split('/')
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    let ont_ok = ont.map_or(true, |o| !o.is_empty() && o.chars().all(|c| c.is_ascii_digit()));

    port_ok && ont_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ipv4() {
        assert!(is_valid_ipv4("192.168.1.1"));
        assert!(is_valid_ipv4("0.0.0.0"));
        assert!(is_valid_ipv4("255.255.255.255"));
        assert!(!is_valid_ipv4(""));
        assert!(!is_valid_ipv4("not-an-ip"));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("1.2.3"));
        assert!(!is_valid_ipv4("1.2.3.4.5"));
        assert!(!is_valid_ipv4("1.2.3.-1"));
        assert!(!is_valid_ipv4("; rm -rf /"));
    }

    #[test]
    fn test_is_valid_gpon_interface() {
        assert!(is_valid_gpon_interface("1/2/1:7"));
        assert!(is_valid_gpon_interface("0/1/2:5"));
        assert!(is_valid_gpon_interface("0/1/2"));
        assert!(!is_valid_gpon_interface(""));
        assert!(!is_valid_gpon_interface("1/2/1:"));
        assert!(!is_valid_gpon_interface("1//1:3"));
        assert!(!is_valid_gpon_interface("1/2/1:7\nshutdown")); // newline
        assert!(!is_valid_gpon_interface("1/2/1:7 ; reload")); // injected command
        assert!(!is_valid_gpon_interface("a/b/c:d"));
    }
}
