//! Periodic temperature check driving a solid-state relay
//!
//! All state lives in [`TemperatureMonitor`]; the task that owns it also
//! owns the bus for the duration of a poll.

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::{Error, OneWire, Sensor};

/// Output stage the monitor switches, e.g. an SSR on a PWM channel
pub trait RelayOutput {
    /// Duty cycle in percent, 0 switches off
    fn set_duty(&mut self, percent: u8);
}

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per poll, at least one is always made
    pub attempts: u8,
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Relay switches fully on at or above this temperature
    pub threshold_c: f32,
    pub retry: RetryPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_c: 28.5,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError<E: Debug> {
    /// Every attempt of one poll failed, `last` is the final error
    GaveUp { attempts: u8, last: Error<E> },
}

/// Relay state decided by the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    On,
    Off,
}

pub struct TemperatureMonitor<S, R> {
    sensor: S,
    relay: R,
    config: MonitorConfig,
    last_celsius: Option<f32>,
    failed_polls: u32,
    relay_state: RelayState,
}

impl<S: Sensor, R: RelayOutput> TemperatureMonitor<S, R> {
    pub fn new(sensor: S, mut relay: R, config: MonitorConfig) -> Self {
        relay.set_duty(0);
        Self {
            sensor,
            relay,
            config,
            last_celsius: None,
            failed_polls: 0,
            relay_state: RelayState::Off,
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn last_celsius(&self) -> Option<f32> {
        self.last_celsius
    }

    /// Polls that gave up since the last successful one
    pub fn failed_polls(&self) -> u32 {
        self.failed_polls
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay_state
    }

    /// Measures once (retrying per policy) and updates the relay.
    ///
    /// After giving up the relay is switched off; the caller decides whether
    /// repeated failures warrant resetting the bus or the device.
    pub fn poll<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<f32, MonitorError<B::PortError>> {
        let attempts = self.config.retry.attempts.max(1);
        let mut attempt = 0;
        let celsius = loop {
            attempt += 1;
            match self.sensor.measure(bus, delay) {
                Ok(celsius) => break celsius,
                Err(e) if attempt < attempts => {
                    warn!("measurement attempt {}/{} failed: {}", attempt, attempts, e);
                    delay.delay_ms(self.config.retry.backoff_ms);
                }
                Err(e) => {
                    self.failed_polls = self.failed_polls.saturating_add(1);
                    error!("giving up after {} attempts: {}", attempts, e);
                    self.switch(RelayState::Off);
                    return Err(MonitorError::GaveUp { attempts, last: e });
                }
            }
        };

        self.failed_polls = 0;
        self.last_celsius = Some(celsius);
        info!("temperature: {} C", celsius);
        self.switch(if celsius >= self.config.threshold_c {
            RelayState::On
        } else {
            RelayState::Off
        });
        Ok(celsius)
    }

    fn switch(&mut self, state: RelayState) {
        if state != self.relay_state {
            info!("relay {:?}", state);
        }
        self.relay.set_duty(match state {
            RelayState::On => 100,
            RelayState::Off => 0,
        });
        self.relay_state = state;
    }
}
