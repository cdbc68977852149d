use infrastructure::EventBus;
use settings::Settings;

use crate::adapter::melcloud::MelcloudClient;
use crate::adapter::room_sensor::ExternalRoomSensor;
use crate::control::DeviceRunner;
use crate::frontends::homekit::HomekitEvent;
use crate::weather::OpenMeteoClient;

mod adapter;
mod control;
mod core;
mod frontends;
mod port;
mod sensor;
mod settings;
mod weather;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");
    settings.monitoring.init().expect("Error initializing monitoring");

    //status events flow towards whatever bridge surfaces the accessory,
    //triggers flow back from it
    let status_bus: EventBus<HomekitEvent> = EventBus::new(64);
    let trigger_bus: EventBus<HomekitEvent> = EventBus::new(64);

    let ac_client = MelcloudClient::new(settings.melcloud.clone()).expect("Error initializing AC client");
    let sensor_client = ExternalRoomSensor::new(&settings.room_sensor).expect("Error initializing room sensor client");
    let weather_client =
        OpenMeteoClient::new(settings.weather.location).expect("Error initializing weather client");
    let metrics_sink = settings.metrics.as_ref().map(|metrics| metrics.new_sink());

    let runner = DeviceRunner::new(
        settings.runner_config(),
        settings.orchestrator_config(),
        ac_client,
        sensor_client,
        weather_client,
        metrics_sink,
        status_bus.emitter(),
        trigger_bus.subscribe(),
    );

    tracing::info!("Starting climate control");

    tokio::select!(
        _ = runner.run() => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        },
    );
}
