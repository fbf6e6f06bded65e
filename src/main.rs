//! Homie device firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │   NvsAdapter        WifiDriver         HomieClient           │
//! │   (StoragePort)     (LinkDriver)       (ProtocolClient)      │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  Orchestrator · ConnectivityMonitor · ReadinessGate    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info};

use homie_bootstrap::adapters::homie::HomieClient;
use homie_bootstrap::adapters::nvs::NvsAdapter;
use homie_bootstrap::adapters::ota;
use homie_bootstrap::adapters::wifi::WifiDriver;
use homie_bootstrap::app::orchestrator::{idle_forever, Orchestrator};
use homie_bootstrap::config::{BootstrapConfig, BootstrapTimeouts};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("homie-bootstrap v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = match BootstrapConfig::from_build_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config invalid: {}", e);
            idle_forever(BootstrapTimeouts::default().idle_interval());
        }
    };
    info!("Config: {:?}", config.mqtt);

    // ── 3. Peripherals ────────────────────────────────────────
    // Only claimed here; the radio comes up after storage, inside the
    // orchestrator.
    let taken = Peripherals::take().and_then(|p| Ok((p, EspSystemEventLoop::take()?)));
    let (peripherals, sysloop) = match taken {
        Ok(taken) => taken,
        Err(e) => {
            error!("Peripherals unavailable: {:?}", e);
            idle_forever(config.timeouts.idle_interval());
        }
    };
    let wifi = WifiDriver::new(peripherals.modem, sysloop, &config.wifi);

    // ── 4. Bootstrap ──────────────────────────────────────────
    let ready =
        Orchestrator::new(NvsAdapter::new(), wifi, HomieClient::new(), &config).run_or_idle();

    if config.features.ota_enabled {
        ota::confirm_running_image();
    }

    // ── 5. Steady state ───────────────────────────────────────
    // The client and the link monitor run on their own tasks; this task
    // only reports readiness changes.
    let _session = ready.session;
    let mut last = ready.gate.bits();
    loop {
        std::thread::sleep(config.timeouts.idle_interval());
        let now = ready.gate.bits();
        if now != last {
            info!("Readiness: {:?} -> {:?}", last, now);
            last = now;
        }
    }
}
