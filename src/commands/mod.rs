//! Vendor CLI command sequences for interface state changes.
//!
//! Builders are pure: the same operation, interface and dialect parameters
//! always produce the same command list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Command-syntax family spoken by an OLT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorDialect {
    #[serde(rename = "A", alias = "a", alias = "zte", alias = "ZTE")]
    A,
    #[serde(rename = "B", alias = "b", alias = "huawei", alias = "HUAWEI")]
    B,
}

impl VendorDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorDialect::A => "A",
            VendorDialect::B => "B",
        }
    }

    /// Guess the dialect from a vendor or model name
    pub fn from_model_name(model: &str) -> Option<Self> {
        let model = model.to_ascii_lowercase();
        if model.contains("zte") || model.starts_with("c3") || model.starts_with("c6") {
            Some(VendorDialect::A)
        } else if model.contains("huawei") || model.starts_with("ma5") || model.starts_with("ea5") {
            Some(VendorDialect::B)
        } else {
            None
        }
    }
}

impl fmt::Display for VendorDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorDialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(VendorDialect::A),
            "B" | "b" => Ok(VendorDialect::B),
            other => VendorDialect::from_model_name(other)
                .ok_or_else(|| anyhow::anyhow!("Unknown vendor dialect: {}", other)),
        }
    }
}

/// Fixed object ids dialect B reuses for custom speed profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticIds {
    pub profile_id: u32,
    pub inbound_table_id: u32,
    pub outbound_table_id: u32,
}

impl Default for SyntheticIds {
    fn default() -> Self {
        Self {
            profile_id: 20,
            inbound_table_id: 900,
            outbound_table_id: 901,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Activate,
    Deactivate,
    SetSpeed {
        up_mbps: u32,
        down_mbps: u32,
        channel: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Activate,
    Deactivate,
    SetSpeed,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Activate => OperationKind::Activate,
            Operation::Deactivate => OperationKind::Deactivate,
            Operation::SetSpeed { .. } => OperationKind::SetSpeed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectParams {
    A,
    B { service_port: u32, ids: SyntheticIds },
}

impl DialectParams {
    pub fn dialect(&self) -> VendorDialect {
        match self {
            DialectParams::A => VendorDialect::A,
            DialectParams::B { .. } => VendorDialect::B,
        }
    }
}

/// Ordered commands for one state change on one interface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCommandSet {
    pub dialect: VendorDialect,
    pub operation: OperationKind,
    pub commands: Vec<String>,
}

/// Interface id a dialect cannot address for the requested operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidInterfaceError {
    pub interface: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidInterfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid interface {}: {}", self.interface, self.reason)
    }
}

impl std::error::Error for InvalidInterfaceError {}

pub fn build_commands(
    operation: Operation,
    interface: &str,
    params: DialectParams,
) -> Result<DeviceCommandSet, InvalidInterfaceError> {
    let commands = match params {
        DialectParams::A => dialect_a(operation, interface),
        DialectParams::B { service_port, ids } => dialect_b(operation, interface, service_port, ids)?,
    };

    Ok(DeviceCommandSet {
        dialect: params.dialect(),
        operation: operation.kind(),
        commands,
    })
}

fn dialect_a(operation: Operation, interface: &str) -> Vec<String> {
    let mut commands = vec![
        "configure terminal".to_string(),
        format!("interface gpon-onu_{}", interface),
    ];

    match operation {
        Operation::Activate => {
            commands.push("no shutdown".to_string());
            commands.push("exit".to_string());
        }
        Operation::Deactivate => {
            commands.push("shutdown".to_string());
            commands.push("exit".to_string());
        }
        Operation::SetSpeed {
            up_mbps,
            down_mbps,
            channel,
        } => {
            commands.push(format!(
                "channel {} traffic-limit upstream {}Mbps downstream {}Mbps",
                channel, up_mbps, down_mbps
            ));
        }
    }

    commands
}

fn mbps_to_kbps(mbps: u32) -> u64 {
    u64::from(mbps) * 1024
}

/// Split `<gpon port>:<ont id>`, both parts required
fn split_interface(interface: &str) -> Result<(&str, &str), InvalidInterfaceError> {
    match interface.split_once(':') {
        Some((port, ont)) if !port.is_empty() && !ont.is_empty() => Ok((port, ont)),
        _ => Err(InvalidInterfaceError {
            interface: interface.to_string(),
            reason: "expected <port>:<ont id>",
        }),
    }
}

fn dialect_b(
    operation: Operation,
    interface: &str,
    service_port: u32,
    ids: SyntheticIds,
) -> Result<Vec<String>, InvalidInterfaceError> {
    let commands = match operation {
        Operation::Activate => vec![format!("service-port {} adminstatus enable", service_port)],
        Operation::Deactivate => vec![format!("service-port {} adminstatus disable", service_port)],
        Operation::SetSpeed {
            up_mbps, down_mbps, ..
        } => {
            // Validated before the first undo so a bad id never tears down the profile
            let (port, ont) = split_interface(interface)?;
            let up_k = mbps_to_kbps(up_mbps);
            let down_k = mbps_to_kbps(down_mbps);
            let SyntheticIds {
                profile_id: p,
                inbound_table_id: inbound,
                outbound_table_id: outbound,
            } = ids;

            vec![
                "configure".to_string(),
                format!("undo dba-profile profile-id {}", p),
                format!(
                    "dba-profile add profile-id {} profile-name \"custom_up_{}\" type3 assure {} max {}",
                    p, up_mbps, up_k, up_k
                ),
                format!("undo traffic table ip index {}", inbound),
                format!(
                    "traffic table ip index {} name \"custom_up_{}\" cir {} pir {} priority 0 priority-policy local-setting",
                    inbound, up_mbps, up_k, up_k
                ),
                format!("undo traffic table ip index {}", outbound),
                format!(
                    "traffic table ip index {} name \"custom_down_{}\" cir {} pir {} priority 0 priority-policy local-setting",
                    outbound, down_mbps, down_k, down_k
                ),
                format!("interface gpon {}", port),
                format!("ont modify {} tcont 1 dba-profile-id {}", ont, p),
                "quit".to_string(),
                format!(
                    "service-port {} inbound traffic-table index {} outbound traffic-table index {}",
                    service_port, inbound, outbound
                ),
                "commit".to_string(),
                "quit".to_string(),
            ]
        }
    };
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b_params(service_port: u32) -> DialectParams {
        DialectParams::B {
            service_port,
            ids: SyntheticIds::default(),
        }
    }

    #[test]
    fn test_dialect_a_activate_deactivate() {
        let set = build_commands(Operation::Activate, "1/2/3:4", DialectParams::A).unwrap();
        assert_eq!(
            set.commands,
            vec!["configure terminal", "interface gpon-onu_1/2/3:4", "no shutdown", "exit"]
        );
        assert_eq!(set.dialect, VendorDialect::A);
        assert_eq!(set.operation, OperationKind::Activate);

        let set = build_commands(Operation::Deactivate, "1/2/3:4", DialectParams::A).unwrap();
        assert_eq!(
            set.commands,
            vec!["configure terminal", "interface gpon-onu_1/2/3:4", "shutdown", "exit"]
        );
    }

    #[test]
    fn test_dialect_a_set_speed() {
        let op = Operation::SetSpeed {
            up_mbps: 100,
            down_mbps: 950,
            channel: 1,
        };
        let set = build_commands(op, "1/2/3:4", DialectParams::A).unwrap();
        assert_eq!(set.commands.len(), 3);
        assert_eq!(
            set.commands.last().map(String::as_str),
            Some("channel 1 traffic-limit upstream 100Mbps downstream 950Mbps")
        );
        assert_eq!(set.operation, OperationKind::SetSpeed);
    }

    #[test]
    fn test_dialect_b_activate_deactivate() {
        let set = build_commands(Operation::Activate, "0/1/2:5", b_params(48)).unwrap();
        assert_eq!(set.commands, vec!["service-port 48 adminstatus enable"]);
        assert_eq!(set.dialect, VendorDialect::B);

        let set = build_commands(Operation::Deactivate, "0/1/2:5", b_params(48)).unwrap();
        assert_eq!(set.commands, vec!["service-port 48 adminstatus disable"]);
    }

    #[test]
    fn test_dialect_b_set_speed() {
        let op = Operation::SetSpeed {
            up_mbps: 10,
            down_mbps: 100,
            channel: 1,
        };
        let set = build_commands(op, "0/1/2:5", b_params(48)).unwrap();
        assert_eq!(
            set.commands,
            vec![
                "configure",
                "undo dba-profile profile-id 20",
                "dba-profile add profile-id 20 profile-name \"custom_up_10\" type3 assure 10240 max 10240",
                "undo traffic table ip index 900",
                "traffic table ip index 900 name \"custom_up_10\" cir 10240 pir 10240 priority 0 priority-policy local-setting",
                "undo traffic table ip index 901",
                "traffic table ip index 901 name \"custom_down_100\" cir 102400 pir 102400 priority 0 priority-policy local-setting",
                "interface gpon 0/1/2",
                "ont modify 5 tcont 1 dba-profile-id 20",
                "quit",
                "service-port 48 inbound traffic-table index 900 outbound traffic-table index 901",
                "commit",
                "quit",
            ]
        );
    }

    #[test]
    fn test_dialect_b_set_speed_requires_ont_id() {
        let op = Operation::SetSpeed {
            up_mbps: 1,
            down_mbps: 1,
            channel: 1,
        };
        let err = build_commands(op, "0/1/2", b_params(7)).unwrap_err();
        assert_eq!(err.interface, "0/1/2");
        assert!(build_commands(op, "0/1/2:", b_params(7)).is_err());

        // Service-port operations don't address the ONT
        let set = build_commands(Operation::Activate, "0/1/2", b_params(7)).unwrap();
        assert_eq!(set.commands, vec!["service-port 7 adminstatus enable".to_string()]);
    }

    #[test]
    fn test_dialect_parsing() {
        assert_eq!("A".parse::<VendorDialect>().unwrap(), VendorDialect::A);
        assert_eq!("Huawei MA5608T".parse::<VendorDialect>().unwrap(), VendorDialect::B);
        assert_eq!(VendorDialect::from_model_name("ZTE C320"), Some(VendorDialect::A));
        assert!("nokia".parse::<VendorDialect>().is_err());

        let dialect: VendorDialect = serde_json::from_str("\"zte\"").unwrap();
        assert_eq!(dialect, VendorDialect::A);
    }

    #[test]
    fn test_operation_deserialize() {
        let op: Operation =
            serde_json::from_str(r#"{"operation":"set_speed","up_mbps":20,"down_mbps":200,"channel":2}"#)
                .unwrap();
        assert_eq!(
            op,
            Operation::SetSpeed {
                up_mbps: 20,
                down_mbps: 200,
                channel: 2
            }
        );
    }
}
