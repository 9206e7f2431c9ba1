/// Serving / update mode state machine
///
/// The controller owns the services it switches between and is driven
/// from the main task by button gestures and a periodic `tick`.
use std::fmt;
use std::time::Duration;

use crate::gesture::Gesture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Serving,
    UpdateListening,
}

impl DeviceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceMode::Serving => "serving",
            DeviceMode::UpdateListening => "update",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub service: &'static str,
    pub reason: String,
}

impl ServiceError {
    pub fn new(service: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            service,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.service, self.reason)
    }
}

impl std::error::Error for ServiceError {}

pub trait CommandService {
    fn start(&mut self) -> Result<(), ServiceError>;
    fn stop(&mut self);
}

pub trait StreamingService {
    fn start(&mut self) -> Result<(), ServiceError>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePoll {
    Idle,
    /// A new image has been written and marked bootable
    RestartRequested,
}

pub trait UpdateListener {
    fn start(&mut self) -> Result<(), ServiceError>;
    fn poll(&mut self) -> UpdatePoll;
    fn stop(&mut self);
}

/// Board level side effects
pub trait SystemControl {
    fn pause(&mut self, duration: Duration);
    fn disconnect_network(&mut self);
    /// Reboot the device. Hardware implementations do not return.
    fn restart(&mut self);
    fn set_status_indicator(&mut self, on: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredUpdateMode,
    Restarting,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Transitioning,
    Restarting,
}

pub struct ModeController<C, S, U, Y> {
    command: C,
    streaming: S,
    update: U,
    system: Y,
    mode: DeviceMode,
    phase: Phase,
    shutdown_grace: Duration,
}

impl<C, S, U, Y> ModeController<C, S, U, Y>
where
    C: CommandService,
    S: StreamingService,
    U: UpdateListener,
    Y: SystemControl,
{
    pub fn new(command: C, streaming: S, update: U, system: Y, shutdown_grace: Duration) -> Self {
        Self {
            command,
            streaming,
            update,
            system,
            mode: DeviceMode::Serving,
            phase: Phase::Idle,
            shutdown_grace,
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn is_restarting(&self) -> bool {
        self.phase == Phase::Restarting
    }

    pub fn system(&self) -> &Y {
        &self.system
    }

    /// Start the serving tasks. Called once after network bring-up.
    pub fn activate(&mut self) -> Result<(), ServiceError> {
        self.streaming.start()?;
        self.command.start()?;
        self.system.set_status_indicator(false);
        log::info!("Serving mode active");
        Ok(())
    }

    pub fn on_gesture(&mut self, gesture: Gesture) -> Transition {
        if self.phase != Phase::Idle {
            log::warn!("Ignoring {:?} during {:?}", gesture, self.phase);
            return Transition::Ignored;
        }

        match (gesture, self.mode) {
            (Gesture::SingleClick, DeviceMode::Serving) => self.enter_update_mode(),
            (Gesture::SingleClick, DeviceMode::UpdateListening) => {
                log::info!("Leaving update mode");
                self.update.stop();
                self.restart()
            }
            (Gesture::DoubleClick, _) => {
                log::info!("Double click, disconnecting and restarting");
                self.system.pause(self.shutdown_grace);
                self.system.disconnect_network();
                self.restart()
            }
        }
    }

    /// Service the update listener while in update mode
    pub fn tick(&mut self) {
        if self.phase != Phase::Idle || self.mode != DeviceMode::UpdateListening {
            return;
        }
        if self.update.poll() == UpdatePoll::RestartRequested {
            log::info!("Update complete, restarting");
            self.update.stop();
            self.restart();
        }
    }

    fn enter_update_mode(&mut self) -> Transition {
        self.phase = Phase::Transitioning;
        log::info!("Stopping serving tasks for update mode");

        self.command.stop();
        self.streaming.stop();
        self.system.pause(self.shutdown_grace);

        if let Err(e) = self.update.start() {
            log::error!("{}; restarting", e);
            return self.restart();
        }

        self.mode = DeviceMode::UpdateListening;
        self.phase = Phase::Idle;
        self.system.set_status_indicator(true);
        log::info!("Update mode active");
        Transition::EnteredUpdateMode
    }

    fn restart(&mut self) -> Transition {
        self.phase = Phase::Restarting;
        self.system.restart();
        Transition::Restarting
    }
}
