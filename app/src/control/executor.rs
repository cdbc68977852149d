use super::HvacAction;
use crate::adapter::melcloud::DeviceUpdate;
use crate::core::time::{DateTime, Duration};
use crate::core::unit::DegreeCelsius;
use crate::port::AcClient;
use crate::sensor::SensorTracker;
use crate::t;

/// Room targets closer than this to the last dispatched one are not worth a
/// cloud round trip.
const DRIFT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub min_action_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_action_interval: t!(60 seconds),
        }
    }
}

/// Turns state-machine decisions into rate-limited, sensor-compensated cloud
/// commands. The single timestamp is the whole rate limiter; ticks of one
/// device never run concurrently.
pub struct ActionExecutor<C: AcClient> {
    client: C,
    config: ExecutorConfig,
    last_command_at: Option<DateTime>,
    last_compensated: Option<DegreeCelsius>,
}

impl<C: AcClient> ActionExecutor<C> {
    pub fn new(client: C, config: ExecutorConfig) -> Self {
        Self {
            client,
            config,
            last_command_at: None,
            last_compensated: None,
        }
    }

    pub fn last_compensated_setpoint(&self) -> Option<DegreeCelsius> {
        self.last_compensated
    }

    /// Dispatches a decision's action. Returns true when a command went out.
    pub async fn execute(&mut self, action: &HvacAction, tracker: &SensorTracker, prohibited: bool) -> bool {
        if prohibited {
            tracing::info!("AC is user-prohibited, suppressing {:?}", action);
            return false;
        }

        if let Some(last) = self.last_command_at {
            let since = DateTime::now().elapsed_since(last);
            if since < self.config.min_action_interval {
                tracing::debug!("Command rate limited, last one {} ago: {:?}", since, action);
                return false;
            }
        }

        let compensated = tracker.compensate(action.setpoint());

        let update = match action {
            HvacAction::SetMode { mode, setpoint: _ } => DeviceUpdate::set_mode((*mode).into(), compensated),
            HvacAction::Coast { .. } => DeviceUpdate::coast(compensated),
        };

        //the attempt consumes the rate-limit slot either way, a failing
        //cloud API gets no extra traffic
        self.last_command_at = Some(DateTime::now());

        match self.client.send(update).await {
            Ok(()) => {
                tracing::info!("Dispatched {:?} as compensated setpoint {}", action, compensated);
                self.last_compensated = Some(compensated);
                true
            }
            Err(e) => {
                tracing::warn!("AC command failed, next tick retries: {:?}", e);
                false
            }
        }
    }

    /// Re-issues the standing setpoint when only the sensor offset moved.
    /// Called with the state machine's standing action on ticks where no
    /// transition happened.
    pub async fn redispatch_on_drift(
        &mut self,
        standing: Option<&HvacAction>,
        tracker: &SensorTracker,
        prohibited: bool,
    ) -> bool {
        let Some(action) = standing else {
            return false;
        };

        let compensated = tracker.compensate(action.setpoint());
        let drifted = match self.last_compensated {
            Some(last) => (compensated - last).abs() >= DRIFT_THRESHOLD,
            None => true,
        };

        if !drifted {
            return false;
        }

        tracing::debug!(
            "Compensated setpoint drifted from {:?} to {}, re-dispatching",
            self.last_compensated,
            compensated
        );

        let coast = HvacAction::Coast {
            setpoint: action.setpoint(),
        };
        self.execute(&coast, tracker, prohibited).await
    }

    /// Direct power toggle for the accessory's Active switch. Bypasses the
    /// predictive path but not the rate limit.
    pub async fn set_power(&mut self, on: bool) -> bool {
        if let Some(last) = self.last_command_at {
            if DateTime::now().elapsed_since(last) < self.config.min_action_interval {
                tracing::debug!("Power toggle rate limited");
                return false;
            }
        }

        self.last_command_at = Some(DateTime::now());

        match self.client.send(DeviceUpdate::set_power(on)).await {
            Ok(()) => {
                tracing::info!("AC power switched {}", if on { "on" } else { "off" });
                true
            }
            Err(e) => {
                tracing::warn!("AC power toggle failed: {:?}", e);
                false
            }
        }
    }
}
