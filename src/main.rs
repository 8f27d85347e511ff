use anyhow::Context;
use embassy_executor::Spawner;
use embassy_time::{with_timeout, Duration, Timer};
use log::{error, info, warn};
use relink_rs::acquisition::ConnectionOrchestrator;
use relink_rs::ble::SimulatedRadio;
use relink_rs::display::StatusView;
use relink_rs::system::{
    AcquisitionConfig, Activation, AttemptSupervisor, ConfigManager, StateRegister,
};
use relink_rs::types::{ConnectionState, DeviceAddress};
use std::sync::Arc;

const CONFIG_ENV: &str = "RELINK_CONFIG";
const STEP_TIMEOUT: Duration = Duration::from_secs(5);
const SHORT_DEADLINE_MS: u64 = 300;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Starting relink demo");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            return;
        }
    };
    info!(
        "Target {} (manufacturer {}), deadline {:?}",
        config.target_address, config.manufacturer_id, config.attempt_timeout_ms
    );

    let radio = SimulatedRadio::new();
    let target = config.target_address;
    let manufacturer_id = config.manufacturer_id;
    let config_manager = ConfigManager::new(config);
    let orchestrator = Arc::new(ConnectionOrchestrator::new(
        radio.clone(),
        config_manager.clone(),
    ));
    let register = Arc::new(StateRegister::new());
    let activation = Activation::new();
    let supervisor =
        AttemptSupervisor::new(orchestrator.clone(), register.clone(), activation.clone());

    if let Err(e) = spawner.spawn(supervisor_task(supervisor)) {
        error!("Failed to spawn supervisor task: {:?}", e);
        return;
    }
    if let Err(e) = spawner.spawn(display_task(register.clone())) {
        warn!("Display task not started: {:?}", e);
    }
    if let Err(e) = spawner.spawn(advertiser_task(radio.clone(), target, manufacturer_id)) {
        error!("Failed to spawn advertiser task: {:?}", e);
        return;
    }

    run_scenario(&radio, &activation, &register, &config_manager).await;

    info!(
        "🏁 Demo finished, peak concurrent attempts: {}",
        orchestrator.peak_attempts_in_flight()
    );
    std::process::exit(0);
}

fn load_config() -> anyhow::Result<AcquisitionConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path))?;
            let config =
                AcquisitionConfig::from_json(&raw).with_context(|| format!("parsing {}", path))?;
            info!("📄 Loaded config from {}", path);
            Ok(config)
        }
        Err(_) => Ok(AcquisitionConfig {
            attempt_timeout_ms: Some(10_000),
            ..AcquisitionConfig::default()
        }),
    }
}

async fn run_scenario(
    radio: &SimulatedRadio,
    activation: &Activation,
    register: &StateRegister,
    config: &ConfigManager,
) {
    info!("▶️ Foreground: first connection");
    activation.activate();
    wait_for(register, ConnectionState::Connected).await;

    info!("📴 Radio toggled off and on");
    radio.power_off();
    wait_for(register, ConnectionState::Failure).await;
    activation.deactivate();
    activation.deactivate();
    Timer::after_millis(100).await;
    radio.power_on();

    info!("▶️ Foreground again: reconnection");
    activation.activate();
    wait_for(register, ConnectionState::Reconnected).await;

    info!("⏸️ Paused");
    activation.deactivate();
    activation.deactivate();
    wait_for(register, ConnectionState::Cancelled).await;

    info!("▶️ Resumed");
    activation.activate();
    wait_for(register, ConnectionState::Reconnected).await;
    activation.deactivate();
    wait_for(register, ConnectionState::Cancelled).await;

    info!("🐢 Slow peripheral, deadline tightened to {}ms", SHORT_DEADLINE_MS);
    let previous = config.get_config().await.attempt_timeout_ms;
    config
        .update_config(|c| c.attempt_timeout_ms = Some(SHORT_DEADLINE_MS))
        .await;
    radio.set_connect_delay(Duration::from_millis(SHORT_DEADLINE_MS * 4));
    activation.activate();
    wait_for(register, ConnectionState::Timeout).await;
    activation.deactivate();
    radio.set_connect_delay(Duration::from_millis(0));
    config.update_config(|c| c.attempt_timeout_ms = previous).await;
    Timer::after_millis(100).await;

    info!("🔒 Scan permission revoked");
    radio.set_scan_granted(false);
    activation.activate();
    wait_for(register, ConnectionState::SecurityFailure).await;
    activation.deactivate();
    Timer::after_millis(100).await;
}

async fn wait_for(register: &StateRegister, expected: ConnectionState) {
    let reached = with_timeout(STEP_TIMEOUT, async {
        while register.current() != expected {
            Timer::after_millis(25).await;
        }
    })
    .await;
    if reached.is_err() {
        warn!(
            "Timed out waiting for {:?}, still at {:?}",
            expected,
            register.current()
        );
    }
}

#[embassy_executor::task]
async fn supervisor_task(mut supervisor: AttemptSupervisor<SimulatedRadio>) {
    supervisor.run().await;
}

#[embassy_executor::task]
async fn display_task(register: Arc<StateRegister>) {
    let mut view = StatusView::new();
    loop {
        view.follow(&register).await;
        info!("🖥️ {}", view.render());
    }
}

/// Plays the peripheral: advertises the target (and a bystander) whenever a
/// scan is listening.
#[embassy_executor::task]
async fn advertiser_task(radio: SimulatedRadio, target: DeviceAddress, manufacturer_id: u16) {
    let bystander = DeviceAddress::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);
    loop {
        if radio.active_scans() > 0 {
            radio.advertise(SimulatedRadio::advert(bystander, true, manufacturer_id));
            radio.advertise(SimulatedRadio::advert(target, true, manufacturer_id));
        }
        Timer::after_millis(100).await;
    }
}
