use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{build_commands, DeviceCommandSet, DialectParams, Operation, SyntheticIds, VendorDialect};
use crate::config::Config;
use crate::db::{NotFoundError, Store};
use crate::gateway::{execute_read, CommandGateway, GatewayError};
use crate::models::{ObtainedInterface, ObtainedInterfaceUpsert, Olt, UpsertOutcome};
use crate::parser::{
    extract_channels, format_speed_descriptor, parse_sections, resolve_main_service, speed_descriptor, state,
    ChannelKey, ChannelMap, ResolvedService,
};
use crate::sync::orchestrator::detail_command;
use crate::sync::SyncRepository;

/// Bandwidth view of one interface, centred on its main service channel
#[derive(Debug, Clone, Serialize)]
pub struct SpeedSummary {
    pub olt_id: i64,
    pub gpon_interface: String,
    pub dialect: VendorDialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub channels: ChannelMap,
    pub main_service: ResolvedService,
    pub up_mbps: Option<f64>,
    pub down_mbps: Option<f64>,
    pub summary_up: Option<String>,
    pub summary_down: Option<String>,
    pub raw_output: String,
}

impl SpeedSummary {
    fn from_output(olt: &Olt, gpon_interface: &str, output: String) -> Self {
        let channels = extract_channels(&output);
        let lines: Vec<String> = output.lines().map(|l| l.trim().to_string()).collect();
        let main_service = resolve_main_service(&channels, &lines);

        let main = main_service
            .channel
            .as_ref()
            .and_then(|key| channels.get(key))
            .or_else(|| channels.iter().next());
        let up_mbps = main.map(|e| e.upstream_mbps);
        let down_mbps = main.map(|e| e.downstream_mbps);

        Self {
            olt_id: olt.id,
            gpon_interface: gpon_interface.to_string(),
            dialect: olt.dialect,
            customer_name: state::customer_name(&output),
            summary_up: up_mbps.map(format_speed_descriptor),
            summary_down: down_mbps.map(format_speed_descriptor),
            up_mbps,
            down_mbps,
            channels,
            main_service,
            raw_output: output,
        }
    }
}

/// Everything known about one interface from a live read
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    pub olt_id: i64,
    pub gpon_interface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    pub admin_state: bool,
    pub operational_state: String,
    pub raw_config: String,
    pub raw_detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<ObtainedInterface>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub command_set: DeviceCommandSet,
    pub outputs: Vec<String>,
    /// Whether the cached record was refreshed after the change
    pub refreshed: bool,
}

/// On-demand reads and state changes for single interfaces
pub struct InterfaceService {
    store: Store,
    gateway: Arc<dyn CommandGateway>,
    read_timeout: Duration,
    change_timeout: Duration,
    read_attempts: u32,
    default_service_port: u32,
    synthetic_ids: SyntheticIds,
}

impl InterfaceService {
    pub fn new(store: Store, gateway: Arc<dyn CommandGateway>, config: &Config) -> Self {
        Self {
            store,
            gateway,
            read_timeout: config.gateway.read_timeout(),
            change_timeout: config.gateway.change_timeout(),
            read_attempts: config.sync.read_attempts.max(1),
            default_service_port: config.default_service_port,
            synthetic_ids: config.dialect_b_ids,
        }
    }

    async fn olt(&self, olt_id: i64) -> Result<Olt> {
        self.store
            .get_olt(olt_id)
            .await?
            .ok_or_else(|| NotFoundError::new("OLT", &olt_id.to_string()).into())
    }

    async fn read(&self, olt: &Olt, commands: &[String]) -> Result<Vec<String>> {
        execute_read(self.gateway.as_ref(), olt, commands, self.read_timeout, self.read_attempts)
            .await
            .map_err(|e| GatewayError::new(olt, &e).into())
    }

    fn service_port(&self, olt: &Olt, requested: Option<u32>) -> u32 {
        requested
            .or(olt.service_port)
            .unwrap_or(self.default_service_port)
    }

    fn dialect_params(&self, olt: &Olt, service_port: Option<u32>) -> DialectParams {
        match olt.dialect {
            VendorDialect::A => DialectParams::A,
            VendorDialect::B => DialectParams::B {
                service_port: self.service_port(olt, service_port),
                ids: self.synthetic_ids,
            },
        }
    }

    /// Read an interface's traffic limits and pick its main service
    pub async fn speed_summary(&self, olt_id: i64, gpon_interface: &str, service_port: Option<u32>) -> Result<SpeedSummary> {
        let olt = self.olt(olt_id).await?;
        let commands = match olt.dialect {
            VendorDialect::A => vec![format!("show running-config interface gpon-onu_{}", gpon_interface)],
            VendorDialect::B => vec![
                format!("display service-port {}", self.service_port(&olt, service_port)),
                "display traffic table ip from-index 0".to_string(),
            ],
        };

        let output = self.read(&olt, &commands).await?.join("\n");
        Ok(SpeedSummary::from_output(&olt, gpon_interface, output))
    }

    /// Live configuration and detail for one interface, plus its cached record
    pub async fn interface_info(&self, olt_id: i64, gpon_interface: &str) -> Result<InterfaceInfo> {
        let olt = self.olt(olt_id).await?;
        self.read_interface(&olt, gpon_interface).await
    }

    async fn read_interface(&self, olt: &Olt, gpon_interface: &str) -> Result<InterfaceInfo> {
        let commands = [
            format!("show running-config interface gpon-onu_{}", gpon_interface),
            detail_command(gpon_interface),
        ];
        let mut outputs = self.read(olt, &commands).await?.into_iter();
        let raw_config = outputs.next().unwrap_or_default();
        let raw_detail = outputs.next().unwrap_or_default();

        if state::is_error_output(&raw_config) {
            return Err(NotFoundError::new("Interface", &format!("{} on OLT {}", gpon_interface, olt.name)).into());
        }

        let cached = self.store.find_obtained_interface(olt.id, gpon_interface).await?;

        Ok(InterfaceInfo {
            olt_id: olt.id,
            gpon_interface: gpon_interface.to_string(),
            customer_name: state::customer_name(&raw_config),
            speed: speed_descriptor(&raw_config),
            admin_state: state::admin_state(&raw_detail, &raw_config),
            operational_state: state::operational_state(&raw_detail),
            raw_config,
            raw_detail,
            cached,
        })
    }

    /// Build a set-speed operation. Without an explicit channel the interface's
    /// main service channel is used, or channel 1 when none can be resolved.
    pub async fn set_speed_operation(
        &self,
        olt_id: i64,
        gpon_interface: &str,
        up_mbps: u32,
        down_mbps: u32,
        channel: Option<u32>,
    ) -> Result<Operation> {
        let channel = match channel {
            Some(channel) => channel,
            None => {
                let olt = self.olt(olt_id).await?;
                match olt.dialect {
                    VendorDialect::B => 1,
                    VendorDialect::A => match self.speed_summary(olt_id, gpon_interface, None).await?.main_service.channel {
                        Some(ChannelKey::Id(id)) => id,
                        _ => 1,
                    },
                }
            }
        };

        Ok(Operation::SetSpeed {
            up_mbps,
            down_mbps,
            channel,
        })
    }

    /// Commands that `apply` would send, without contacting the device
    pub async fn preview(
        &self,
        olt_id: i64,
        gpon_interface: &str,
        operation: Operation,
        service_port: Option<u32>,
    ) -> Result<DeviceCommandSet> {
        let olt = self.olt(olt_id).await?;
        Ok(build_commands(operation, gpon_interface, self.dialect_params(&olt, service_port))?)
    }

    /// Send a state change once, then refresh the cached record from the device
    pub async fn apply(
        &self,
        olt_id: i64,
        gpon_interface: &str,
        operation: Operation,
        service_port: Option<u32>,
    ) -> Result<ApplyOutcome> {
        let olt = self.olt(olt_id).await?;
        let command_set = build_commands(operation, gpon_interface, self.dialect_params(&olt, service_port))?;

        tracing::info!(
            "Applying {:?} to {} on OLT {} ({} commands)",
            command_set.operation,
            gpon_interface,
            olt.name,
            command_set.commands.len()
        );

        let outputs = self
            .gateway
            .execute(&olt, &command_set.commands, self.change_timeout)
            .await
            .map_err(|e| GatewayError::new(&olt, &e))?;

        let refreshed = match self.refresh(&olt, gpon_interface).await {
            Ok(outcome) => outcome.is_some(),
            Err(e) => {
                tracing::warn!("Refresh of {} on OLT {} failed: {:#}", gpon_interface, olt.name, e);
                false
            }
        };

        Ok(ApplyOutcome {
            command_set,
            outputs,
            refreshed,
        })
    }

    /// Re-read one interface and upsert its cached record. Fails without writing when the
    /// device answers with an error; skipped when no customer name is known for it.
    async fn refresh(&self, olt: &Olt, gpon_interface: &str) -> Result<Option<UpsertOutcome>> {
        let info = self.read_interface(olt, gpon_interface).await?;

        let section = parse_sections(&info.raw_config)
            .into_iter()
            .find(|s| s.interface == gpon_interface);
        let customer_name = section
            .as_ref()
            .map(|s| s.customer_name.clone())
            .or_else(|| info.customer_name.clone())
            .or_else(|| info.cached.as_ref().map(|c| c.customer_name.clone()));

        let Some(customer_name) = customer_name else {
            tracing::debug!("No customer name for {} on OLT {}, skipping refresh", gpon_interface, olt.name);
            return Ok(None);
        };

        let config = section
            .map(|s| s.raw_text())
            .unwrap_or_else(|| info.raw_config.trim().to_string());

        let record = ObtainedInterfaceUpsert {
            olt_id: olt.id,
            gpon_interface: gpon_interface.to_string(),
            customer_name,
            admin_state: info.admin_state,
            speed: speed_descriptor(&config),
            config,
            synced_at: Utc::now(),
        };

        Ok(Some(self.store.upsert_obtained_interface(&record).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OperationKind;
    use crate::models::{CreateOltRequest, ObtainedInterfaceQuery};
    use crate::sync::orchestrator::tests::FakeGateway;

    const INTERFACE_CONFIG: &str = "\
interface gpon-onu_1/2/1:7
  name ACME CORP
  gemport 1 name VOIP tcont 1
  gemport 1 traffic-limit upstream 2Mbps downstream 2Mbps
  gemport 2 name INTERNET tcont 2
  gemport 2 traffic-limit upstream 100Mbps downstream 1.5Gbps
  no shutdown
!
";

    fn test_config() -> Config {
        let mut config = Config::load();
        config.sync.read_attempts = 2;
        config
    }

    async fn setup(dialect: VendorDialect, gateway: FakeGateway) -> (InterfaceService, Arc<FakeGateway>, Store, i64) {
        let store = Store::with_pool_size(":memory:", 1).await.unwrap();
        let olt = store
            .create_olt(&CreateOltRequest {
                name: "centro".to_string(),
                ip_address: "10.0.0.1".to_string(),
                dialect,
                username: None,
                password: None,
                enable_password: None,
                port: None,
                service_port: Some(31),
                active: true,
            })
            .await
            .unwrap();

        let gateway = Arc::new(gateway);
        let svc = InterfaceService::new(store.clone(), gateway.clone(), &test_config());
        (svc, gateway, store, olt.id)
    }

    fn gateway_with_config() -> FakeGateway {
        let mut gateway = FakeGateway::default();
        gateway.configs.insert("centro".to_string(), INTERFACE_CONFIG.to_string());
        gateway
    }

    #[tokio::test]
    async fn test_speed_summary_uses_main_service() {
        let (svc, gateway, _, olt_id) = setup(VendorDialect::A, gateway_with_config()).await;

        let summary = svc.speed_summary(olt_id, "1/2/1:7", None).await.unwrap();
        assert_eq!(summary.channels.len(), 2);
        assert_eq!(summary.main_service.channel, Some(ChannelKey::Id(2)));
        assert_eq!(summary.up_mbps, Some(100.0));
        assert_eq!(summary.down_mbps, Some(1500.0));
        assert_eq!(summary.summary_down.as_deref(), Some("1.5Gbps"));
        assert_eq!(summary.customer_name.as_deref(), Some("ACME CORP"));

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec!["show running-config interface gpon-onu_1/2/1:7".to_string()]);
    }

    #[tokio::test]
    async fn test_speed_summary_dialect_b_commands() {
        let mut gateway = FakeGateway::default();
        gateway.replies.insert(
            "display traffic table ip from-index 0".to_string(),
            "channel 1 traffic-limit upstream 20Mbps downstream 200Mbps".to_string(),
        );
        let (svc, gateway, _, olt_id) = setup(VendorDialect::B, gateway).await;

        // Rates come from the traffic-table listing, the second output
        let summary = svc.speed_summary(olt_id, "0/1/2:5", None).await.unwrap();
        assert_eq!(summary.channels.len(), 1);
        assert_eq!(summary.up_mbps, Some(20.0));
        assert_eq!(summary.summary_down.as_deref(), Some("200Mbps"));

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            vec!["display service-port 31".to_string(), "display traffic table ip from-index 0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_olt_is_not_found() {
        let (svc, _, _, olt_id) = setup(VendorDialect::A, FakeGateway::default()).await;
        let err = svc.interface_info(olt_id + 100, "1/1/1:1").await.unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_interface_info() {
        let (svc, _, _, olt_id) = setup(VendorDialect::A, gateway_with_config()).await;

        let info = svc.interface_info(olt_id, "1/2/1:7").await.unwrap();
        assert_eq!(info.customer_name.as_deref(), Some("ACME CORP"));
        assert_eq!(info.speed.as_deref(), Some("1.5Gbps"));
        assert!(info.admin_state);
        assert_eq!(info.operational_state, "enable");
        assert!(info.cached.is_none());
    }

    #[tokio::test]
    async fn test_set_speed_channel_defaults_to_main_service() {
        let (svc, _, _, olt_id) = setup(VendorDialect::A, gateway_with_config()).await;

        let op = svc.set_speed_operation(olt_id, "1/2/1:7", 50, 500, None).await.unwrap();
        assert_eq!(
            op,
            Operation::SetSpeed {
                up_mbps: 50,
                down_mbps: 500,
                channel: 2
            }
        );

        let op = svc.set_speed_operation(olt_id, "1/2/1:7", 50, 500, Some(4)).await.unwrap();
        assert!(matches!(op, Operation::SetSpeed { channel: 4, .. }));
    }

    #[tokio::test]
    async fn test_preview_uses_olt_service_port() {
        let (svc, gateway, _, olt_id) = setup(VendorDialect::B, FakeGateway::default()).await;

        let set = svc.preview(olt_id, "0/1/2:5", Operation::Activate, None).await.unwrap();
        assert_eq!(set.commands, vec!["service-port 31 adminstatus enable".to_string()]);

        let set = svc.preview(olt_id, "0/1/2:5", Operation::Deactivate, Some(77)).await.unwrap();
        assert_eq!(set.commands, vec!["service-port 77 adminstatus disable".to_string()]);

        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_sends_once_and_refreshes_cache() {
        let (svc, gateway, store, olt_id) = setup(VendorDialect::A, gateway_with_config()).await;

        let outcome = svc.apply(olt_id, "1/2/1:7", Operation::Deactivate, None).await.unwrap();
        assert_eq!(outcome.command_set.operation, OperationKind::Deactivate);
        assert_eq!(outcome.outputs.len(), 4);
        assert!(outcome.refreshed);

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls[0].1, outcome.command_set.commands);
        assert_eq!(calls.len(), 2);

        let cached = store
            .list_obtained_interfaces(&ObtainedInterfaceQuery::default())
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].customer_name, "ACME CORP");
        assert_eq!(cached[0].speed.as_deref(), Some("1.5Gbps"));
    }

    #[tokio::test]
    async fn test_apply_failure_is_not_retried() {
        let gateway = FakeGateway {
            failing: vec!["centro".to_string()],
            ..Default::default()
        };
        let (svc, gateway, _, olt_id) = setup(VendorDialect::A, gateway).await;

        let err = svc.apply(olt_id, "1/2/1:7", Operation::Activate, None).await.unwrap_err();
        assert!(err.downcast_ref::<GatewayError>().is_some());
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_answer_keeps_cached_record() {
        let mut gateway = FakeGateway::default();
        gateway.configs.insert(
            "centro".to_string(),
            "%Error 20200: Invalid input detected at '^' marker.".to_string(),
        );
        let (svc, _, store, olt_id) = setup(VendorDialect::A, gateway).await;

        let seeded = ObtainedInterfaceUpsert {
            olt_id,
            gpon_interface: "1/2/1:7".to_string(),
            customer_name: "ACME CORP".to_string(),
            config: INTERFACE_CONFIG.trim().to_string(),
            admin_state: true,
            speed: Some("100Mbps".to_string()),
            synced_at: Utc::now(),
        };
        store.upsert_obtained_interface(&seeded).await.unwrap();

        let err = svc.interface_info(olt_id, "1/2/1:7").await.unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());

        let outcome = svc.apply(olt_id, "1/2/1:7", Operation::Activate, None).await.unwrap();
        assert!(!outcome.refreshed);

        let cached = store.find_obtained_interface(olt_id, "1/2/1:7").await.unwrap().unwrap();
        assert_eq!(cached.speed.as_deref(), Some("100Mbps"));
        assert_eq!(cached.config, INTERFACE_CONFIG.trim());
        assert!(cached.admin_state);
    }
}
