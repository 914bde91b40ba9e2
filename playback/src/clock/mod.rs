//! A virtual clock that normally runs forward on its own, but whose hands can also be dragged to
//! scrub through time.

mod hands;

use chrono::{Datelike, Duration, NaiveDateTime, TimeZone, Utc};

pub use self::hands::{
    apply_drag, begin_drag, end_drag, time_of_day, ClockState, Drag, Hand, HandAngles,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HourSystem {
    Twelve,
    TwentyFour,
}

/// All times are UTC wall-clock times.
#[derive(Clone, Debug)]
pub struct VirtualClock {
    state: ClockState,
    hour_system: HourSystem,
}

impl VirtualClock {
    pub fn new(date: NaiveDateTime) -> Self {
        Self {
            state: ClockState::new(date),
            hour_system: HourSystem::Twelve,
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    /// None if the timestamp is out of range
    pub fn from_timestamp_ms(timestamp_ms: f64) -> Option<Self> {
        let date = Utc
            .timestamp_millis_opt(timestamp_ms.round() as i64)
            .single()?
            .naive_utc();
        Some(Self::new(date))
    }

    /// Runs the clock forward, unless somebody is dragging a hand. Returns the current timestamp
    /// in milliseconds either way.
    pub fn advance(&mut self, elapsed_ms: f64) -> f64 {
        if self.is_dragging() {
            return self.timestamp_ms();
        }
        if !elapsed_ms.is_finite() {
            warn!("Ignoring a clock advance of {elapsed_ms}ms");
            return self.timestamp_ms();
        }

        let before = self.timestamp_ms();
        let nanos = (elapsed_ms * 1_000_000.0).round() as i64;
        match self
            .state
            .date
            .checked_add_signed(Duration::nanoseconds(nanos))
        {
            Some(date) => self.state.date = date,
            None => {
                warn!("Clock advance of {elapsed_ms}ms from {} overflows", self.state.date);
                return before;
            }
        }
        self.state.sync_from_date();

        // The hands only have one-second precision, so don't bother moving them every frame
        let after = self.timestamp_ms();
        if (before / 1000.0).floor() != (after / 1000.0).floor() {
            self.state.sync_hands();
        }
        after
    }

    pub fn begin_drag(&mut self, hand: Hand, pointer_deg: f64) {
        self.state = begin_drag(self.state, hand, pointer_deg);
        debug!("Dragging {hand:?}, offset {:?}", self.state.drag);
    }

    pub fn update_drag(&mut self, pointer_deg: f64) {
        self.state = apply_drag(self.state, pointer_deg);
    }

    pub fn end_drag(&mut self) {
        self.state = end_drag(self.state);
    }

    pub fn is_dragging(&self) -> bool {
        self.state.drag.is_some()
    }

    pub fn timestamp_ms(&self) -> f64 {
        let dt = Utc.from_utc_datetime(&self.state.date);
        dt.timestamp_millis() as f64 + (dt.timestamp_subsec_nanos() % 1_000_000) as f64 / 1e6
    }

    pub fn date(&self) -> NaiveDateTime {
        self.state.date
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    pub fn hands(&self) -> HandAngles {
        self.state.hands
    }

    /// Like "08:05 PM" or "20:05"
    pub fn time_string(&self) -> String {
        let hours = self.state.hours;
        match self.hour_system {
            HourSystem::TwentyFour => format!("{:02}:{:02}", hours, self.state.minutes),
            HourSystem::Twelve => {
                let hours = if hours % 12 == 0 { 12 } else { hours % 12 };
                let suffix = if self.state.is_pm { "PM" } else { "AM" };
                format!("{:02}:{:02} {suffix}", hours, self.state.minutes)
            }
        }
    }

    /// Like "2/29/2020"
    pub fn date_string(&self) -> String {
        let date = self.state.date;
        format!("{}/{}/{}", date.month(), date.day(), date.year())
    }

    pub fn hour_system(&self) -> HourSystem {
        self.hour_system
    }

    pub fn set_hour_system(&mut self, hour_system: HourSystem) {
        self.hour_system = hour_system;
    }

    pub fn toggle_hour_system(&mut self) {
        self.hour_system = match self.hour_system {
            HourSystem::Twelve => HourSystem::TwentyFour,
            HourSystem::TwentyFour => HourSystem::Twelve,
        };
    }

    /// Jump back to the real time. Cancels any drag.
    pub fn reset_to_now(&mut self) {
        self.reset_to(Utc::now().naive_utc());
    }

    pub fn reset_to(&mut self, date: NaiveDateTime) {
        self.state = ClockState::new(date);
    }

    /// Wraps around past 23, keeping the day.
    pub fn set_hours(&mut self, hours: u32) {
        self.set_time(hours % 24, self.state.minutes, self.state.seconds);
    }

    pub fn set_minutes(&mut self, minutes: u32) {
        self.set_time(self.state.hours, minutes % 60, self.state.seconds);
    }

    pub fn set_seconds(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.set_time(self.state.hours, self.state.minutes, seconds.rem_euclid(60.0));
    }

    fn set_time(&mut self, hours: u32, minutes: u32, seconds: f64) {
        let millis = (seconds * 1000.0).round() as i64;
        let midnight = self.state.date.date().and_hms_opt(0, 0, 0);
        if let Some(midnight) = midnight {
            let date = midnight
                + Duration::hours(hours as i64)
                + Duration::minutes(minutes as i64)
                + Duration::milliseconds(millis.min(59_999));
            let drag = self.state.drag;
            self.state = ClockState::new(date);
            self.state.drag = drag;
        }
    }
}
