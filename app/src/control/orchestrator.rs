use super::{
    ActionExecutor, CalculatorConfig, ControlContext, ExecutorConfig, HvacState, HvacStateMachine, PredictionResult,
    SeasonMode, SetpointCalculator, StateMachineConfig, StateMachineDecision,
};
use crate::adapter::melcloud::DeviceSnapshot;
use crate::adapter::metrics::MetricPoint;
use crate::core::time::Duration;
use crate::core::unit::{DegreeCelsius, WattsPerSquareMeter};
use crate::frontends::homekit::{AccessoryCommand, HeaterCooler, HomekitEvent};
use crate::port::{AcClient, RoomSensorClient, TimeSeriesSink};
use crate::sensor::{SensorTracker, TrackerConfig};
use crate::t;
use crate::weather::{Forecast, OpenMeteoClient, WeatherCache};

use infrastructure::{EventEmitter, EventListener};

/// Accessory-facing mode selector. Heat and cool pin the season; auto
/// derives it from the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ModeSelector {
    Heat,
    Cool,
    Auto,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Comfort band midpoint; user writes may move ±3 °C around it.
    pub base_target: DegreeCelsius,
    pub comfort_band_halfwidth: f64,
    pub calculator: CalculatorConfig,
    pub state_machine: StateMachineConfig,
    pub executor: ExecutorConfig,
    pub tracker: TrackerConfig,
    pub weather_validity: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_target: DegreeCelsius(23.0),
            comfort_band_halfwidth: 3.0,
            calculator: CalculatorConfig::default(),
            state_machine: StateMachineConfig::default(),
            executor: ExecutorConfig::default(),
            tracker: TrackerConfig::default(),
            weather_validity: t!(120 minutes),
        }
    }
}

/// Everything one tick produced, for the accessory surface and metrics.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub room_temp: Option<DegreeCelsius>,
    pub display_room_temp: Option<DegreeCelsius>,
    pub outdoor_temp: Option<DegreeCelsius>,
    pub solar: Option<WattsPerSquareMeter>,
    pub user_target: DegreeCelsius,
    pub season: SeasonMode,
    pub mode: ModeSelector,
    pub state: HvacState,
    pub power: bool,
    pub prediction: PredictionResult,
    pub decision_reason: String,
    pub compensated_setpoint: Option<DegreeCelsius>,
}

/// Single writer of one device's control state. Runs once per AC snapshot;
/// the runner owns the timers that feed it.
pub struct Orchestrator<A: AcClient> {
    config: OrchestratorConfig,
    calculator: SetpointCalculator,
    machine: HvacStateMachine,
    executor: ActionExecutor<A>,
    tracker: SensorTracker,
    weather: WeatherCache,
    user_target: Option<DegreeCelsius>,
    mode_selector: ModeSelector,
}

impl<A: AcClient> Orchestrator<A> {
    pub fn new(config: OrchestratorConfig, ac_client: A) -> Self {
        let calculator = SetpointCalculator::new(config.calculator.clone());
        let machine = HvacStateMachine::new(config.state_machine.clone());
        let executor = ActionExecutor::new(ac_client, config.executor.clone());
        let tracker = SensorTracker::new(config.tracker.clone());
        let weather = WeatherCache::new(config.weather_validity);

        Self {
            config,
            calculator,
            machine,
            executor,
            tracker,
            weather,
            user_target: None,
            mode_selector: ModeSelector::Auto,
        }
    }

    pub fn tracker_mut(&mut self) -> &mut SensorTracker {
        &mut self.tracker
    }

    pub fn weather_mut(&mut self) -> &mut WeatherCache {
        &mut self.weather
    }

    pub fn user_target(&self) -> DegreeCelsius {
        self.user_target.unwrap_or(self.config.base_target)
    }

    /// Accessory write. Out-of-band values are clamped silently.
    pub fn set_user_target(&mut self, target: DegreeCelsius) {
        let clamped = self.clamp_to_band(target).round_half();
        if clamped != target {
            tracing::debug!("User target {} clamped to comfort band as {}", target, clamped);
        }
        self.user_target = Some(clamped);
    }

    pub fn set_mode_selector(&mut self, selector: ModeSelector) {
        tracing::info!("Mode selector set to {}", selector);
        self.mode_selector = selector;
    }

    /// Direct power toggle from the accessory, bypassing prediction.
    pub async fn set_power(&mut self, on: bool) {
        self.executor.set_power(on).await;
    }

    pub fn season(&self) -> SeasonMode {
        match self.mode_selector {
            ModeSelector::Heat => SeasonMode::Winter,
            ModeSelector::Cool => SeasonMode::Summer,
            ModeSelector::Auto => match self.weather.average_temp(24) {
                Some(avg) if avg > self.user_target() => SeasonMode::Summer,
                Some(_) => SeasonMode::Winter,
                //cautious default while the forecast is unavailable
                None => SeasonMode::Winter,
            },
        }
    }

    pub async fn handle_snapshot(&mut self, snapshot: DeviceSnapshot) -> TickReport {
        self.tracker.refresh_offset(snapshot.ac_sensor_temp);

        if self.user_target.is_none() {
            let initial = snapshot.ac_set_temp.unwrap_or(self.config.base_target);
            self.set_user_target(initial);
            tracing::info!("User comfort target initialized to {}", self.user_target());
        }

        let season = self.season();
        let ctx = ControlContext {
            user_comfort_target: self.user_target(),
            room_temp: self.tracker.room_temp(),
            outdoor_temp: self.weather.current_outdoor_temp(),
            forecast_temps: self.weather.temps_for_next_hours(Forecast::HORIZON_HOURS),
            forecast_solar: self.weather.solar_for_next_hours(24),
            season,
            ac_power: snapshot.is_powered(),
        };

        let prediction = self.calculator.calculate(&ctx);
        let decision = self.machine.step(&ctx, prediction.predicted_room_target);

        self.dispatch(&decision, &prediction, snapshot.user_prohibit).await;

        TickReport {
            room_temp: ctx.room_temp,
            display_room_temp: self.tracker.last_reading().map(|r| r.room_temp),
            outdoor_temp: ctx.outdoor_temp,
            solar: self.weather.current_solar(),
            user_target: self.user_target(),
            season,
            mode: self.mode_selector,
            state: decision.state,
            power: snapshot.is_powered(),
            prediction,
            decision_reason: decision.reason,
            compensated_setpoint: self.executor.last_compensated_setpoint(),
        }
    }

    async fn dispatch(&mut self, decision: &StateMachineDecision, prediction: &PredictionResult, prohibited: bool) {
        match &decision.action {
            Some(action) => {
                self.executor.execute(action, &self.tracker, prohibited).await;
            }
            None => {
                //no transition, but the compensated setpoint may have
                //drifted under the standing one
                let standing = self
                    .machine
                    .action_for(self.machine.current_state(), prediction.predicted_room_target);
                self.executor
                    .redispatch_on_drift(standing.as_ref(), &self.tracker, prohibited)
                    .await;
            }
        }
    }

    fn clamp_to_band(&self, target: DegreeCelsius) -> DegreeCelsius {
        let half = self.config.comfort_band_halfwidth;
        target.clamp(
            self.config.base_target + DegreeCelsius(-half),
            self.config.base_target + DegreeCelsius(half),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub device_id: String,
    pub ac_refresh: Duration,
    pub sensor_poll: Duration,
    pub weather_refresh: Duration,
}

/// One cooperative loop per device over its three poll sources and the
/// accessory trigger stream. Dropping the task tears the device down; all
/// state is in memory.
pub struct DeviceRunner<A, S, M>
where
    A: AcClient,
    S: RoomSensorClient,
    M: TimeSeriesSink,
{
    config: RunnerConfig,
    orchestrator: Orchestrator<A>,
    ac_client: A,
    sensor_client: S,
    weather_client: OpenMeteoClient,
    sink: Option<M>,
    accessory: HeaterCooler,
    status_tx: EventEmitter<HomekitEvent>,
    trigger_rx: EventListener<HomekitEvent>,
}

impl<A, S, M> DeviceRunner<A, S, M>
where
    A: AcClient + Clone,
    S: RoomSensorClient,
    M: TimeSeriesSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunnerConfig,
        orchestrator_config: OrchestratorConfig,
        ac_client: A,
        sensor_client: S,
        weather_client: OpenMeteoClient,
        sink: Option<M>,
        status_tx: EventEmitter<HomekitEvent>,
        trigger_rx: EventListener<HomekitEvent>,
    ) -> Self {
        let accessory = HeaterCooler::new(config.device_id.clone());
        let orchestrator = Orchestrator::new(orchestrator_config, ac_client.clone());

        Self {
            config,
            orchestrator,
            ac_client,
            sensor_client,
            weather_client,
            sink,
            accessory,
            status_tx,
            trigger_rx,
        }
    }

    pub async fn run(self) {
        let DeviceRunner {
            config,
            mut orchestrator,
            ac_client,
            sensor_client,
            weather_client,
            sink,
            mut accessory,
            status_tx,
            mut trigger_rx,
        } = self;

        let mut ac_tick = tokio::time::interval(config.ac_refresh.into_std());
        //external sensor wants at least a second between requests
        let sensor_poll = config.sensor_poll.as_secs().max(1);
        let mut sensor_tick = tokio::time::interval(std::time::Duration::from_secs(sensor_poll as u64));
        let mut weather_tick = tokio::time::interval(config.weather_refresh.into_std());

        tracing::info!("Device {} control loop started", config.device_id);

        loop {
            tokio::select! {
                _ = weather_tick.tick() => {
                    match weather_client.fetch_forecast().await {
                        Ok(forecast) => orchestrator.weather_mut().store(forecast),
                        Err(e) => {
                            tracing::warn!("Weather refresh failed, keeping cached forecast: {:?}", e);
                            orchestrator.weather_mut().mark_unavailable();
                        }
                    }
                }

                _ = sensor_tick.tick() => {
                    match sensor_client.fetch_reading().await {
                        Ok(reading) => orchestrator.tracker_mut().record_reading(reading),
                        Err(e) => {
                            tracing::warn!("Room sensor poll failed: {:?}", e);
                            orchestrator.tracker_mut().record_failure();
                        }
                    }
                }

                _ = ac_tick.tick() => {
                    match ac_client.fetch_state().await {
                        Ok(snapshot) => {
                            let report = orchestrator.handle_snapshot(snapshot).await;

                            for event in accessory.export_report(&report) {
                                status_tx.send(event);
                            }

                            if let Some(sink) = &sink {
                                let point = MetricPoint::from_report(&config.device_id, &report);
                                if let Err(e) = sink.write_point(point).await {
                                    tracing::warn!("Error writing metrics point: {:?}", e);
                                }
                            }
                        }
                        Err(e) => tracing::warn!("AC state poll failed: {:?}", e),
                    }
                }

                trigger = trigger_rx.recv() => {
                    let command = trigger.as_ref().and_then(|t| accessory.process_trigger(t));
                    match command {
                        Some(AccessoryCommand::TargetTemperature(target)) => orchestrator.set_user_target(target),
                        Some(AccessoryCommand::TargetMode(selector)) => orchestrator.set_mode_selector(selector),
                        Some(AccessoryCommand::Active(on)) => orchestrator.set_power(on).await,
                        None => {}
                    }
                }
            }
        }
    }
}
