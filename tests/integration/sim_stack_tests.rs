//! Full bootstrap over the simulation adapters, as the host build of the
//! firmware would run it.

use homie_bootstrap::adapters::homie::HomieClient;
use homie_bootstrap::adapters::nvs::NvsAdapter;
use homie_bootstrap::adapters::wifi::WifiDriver;
use homie_bootstrap::app::orchestrator::Orchestrator;
use homie_bootstrap::diagnostics::{BootLog, BootOutcome};
use homie_bootstrap::gate::ReadinessFlag;

use crate::mocks::test_config;

#[test]
fn simulated_device_comes_online() {
    let cfg = test_config();
    let orchestrator = Orchestrator::new(
        NvsAdapter::new(),
        WifiDriver::new(&cfg.wifi),
        HomieClient::new(),
        &cfg,
    );
    let gate = orchestrator.gate();

    let ready = orchestrator.run().unwrap();

    assert_eq!(ready.identity.topic_root.as_str(), "homie/deadbeefcafe/#");
    assert!(
        gate.bits()
            .contains_all(ReadinessFlag::LinkConnected | ReadinessFlag::ProtocolConnected)
    );
    assert_eq!(
        BootLog::load(&ready.storage).last_outcome,
        BootOutcome::Ready
    );
}
