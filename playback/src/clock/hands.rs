//! The analog clock's state and the pure transitions for dragging its hands. The hands are
//! coupled like a physical clock: moving the second hand drags the minute hand along a little,
//! which drags the hour hand along even less.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hand {
    Hour,
    Minute,
    Second,
}

/// Where each hand points, in degrees clockwise from 12 o'clock, in `[0, 360)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    pub fn from_time(hours: u32, minutes: u32, seconds: f64) -> Self {
        let second = seconds * 6.0;
        let minute = (minutes as f64 + second / 360.0) * 6.0;
        let hour = ((hours % 12) as f64 + minute / 360.0) * 30.0;
        Self {
            hour,
            minute,
            second,
        }
    }

    pub fn get(&self, hand: Hand) -> f64 {
        match hand {
            Hand::Hour => self.hour,
            Hand::Minute => self.minute,
            Hand::Second => self.second,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drag {
    pub hand: Hand,
    /// 180 when the hand was grabbed by its tail, so the pointer is opposite the tip
    pub offset: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockState {
    pub date: NaiveDateTime,
    /// 0 to 23
    pub hours: u32,
    pub minutes: u32,
    /// Millisecond precision
    pub seconds: f64,
    pub is_pm: bool,
    pub drag: Option<Drag>,
    pub hands: HandAngles,
}

impl ClockState {
    pub fn new(date: NaiveDateTime) -> Self {
        let mut state = Self {
            date,
            hours: 0,
            minutes: 0,
            seconds: 0.0,
            is_pm: false,
            drag: None,
            hands: HandAngles::from_time(0, 0, 0.0),
        };
        state.sync_from_date();
        state.sync_hands();
        state
    }

    /// Re-derive hours, minutes, seconds, and AM/PM from the date. Leaves the hands alone.
    pub fn sync_from_date(&mut self) {
        let time = self.date.time();
        self.hours = time.hour();
        self.minutes = time.minute();
        self.seconds = time.second() as f64 + (time.nanosecond() / 1_000_000) as f64 / 1000.0;
        self.is_pm = self.hours >= 12;
    }

    pub fn sync_hands(&mut self) {
        self.hands = HandAngles::from_time(self.hours, self.minutes, self.seconds);
    }
}

/// Start dragging a hand. If the pointer is roughly opposite the hand's tip (between 160 and 200
/// degrees away; exactly 180 counts), the user grabbed the tail, and every later pointer angle
/// gets flipped around.
pub fn begin_drag(state: ClockState, hand: Hand, pointer_deg: f64) -> ClockState {
    let mut state = state;
    // Automatic advance only refreshes the hands lazily
    state.sync_hands();
    let diff = (normalize_deg(pointer_deg) - state.hands.get(hand)).abs();
    let offset = if 160.0 < diff && diff < 200.0 {
        180.0
    } else {
        0.0
    };
    state.drag = Some(Drag { hand, offset });
    state
}

pub fn end_drag(state: ClockState) -> ClockState {
    ClockState { drag: None, ..state }
}

/// Move the dragged hand to follow the pointer, propagate to the coupled hands, and re-derive the
/// time and date. Nothing happens if no hand is being dragged.
pub fn apply_drag(state: ClockState, pointer_deg: f64) -> ClockState {
    let drag = match state.drag {
        Some(drag) => drag,
        None => return state,
    };
    let deg = normalize_deg(pointer_deg - drag.offset);
    let (hands, is_pm) = match drag.hand {
        Hand::Hour => drag_hour(state.hands, state.is_pm, deg),
        Hand::Minute => drag_minute(state.hands, state.is_pm, deg),
        Hand::Second => drag_second(state.hands, state.is_pm, deg),
    };
    let (hours, minutes, seconds) = time_of_day(hands, is_pm);

    // Flipping AM/PM means the drag passed midnight or noon. Whichever of the two is near the
    // resulting time is the one we crossed.
    let mut day = state.date.date();
    if state.is_pm && !is_pm && hours < 3 {
        day = day.succ_opt().unwrap_or(day);
    } else if !state.is_pm && is_pm && hours > 21 {
        day = day.pred_opt().unwrap_or(day);
    }
    let date = match naive_time(hours, minutes, seconds) {
        Some(time) => day.and_time(time),
        None => state.date,
    };

    ClockState {
        date,
        hours,
        minutes,
        seconds,
        is_pm,
        drag: state.drag,
        hands,
    }
}

/// The hour hand alone pins down the minute and second hands.
pub fn drag_hour(hands: HandAngles, is_pm: bool, deg: f64) -> (HandAngles, bool) {
    let is_pm = if straddles_twelve(hands.hour, deg) {
        !is_pm
    } else {
        is_pm
    };
    let minute = (deg % 30.0) * 12.0;
    (
        HandAngles {
            hour: deg,
            minute,
            second: (minute % 6.0) * 60.0,
        },
        is_pm,
    )
}

pub fn drag_minute(hands: HandAngles, is_pm: bool, deg: f64) -> (HandAngles, bool) {
    let (hour, is_pm) = follow_minute(hands.hour, hands.minute, deg, is_pm);
    (
        HandAngles {
            hour,
            minute: deg,
            second: (deg % 6.0) * 60.0,
        },
        is_pm,
    )
}

pub fn drag_second(hands: HandAngles, is_pm: bool, deg: f64) -> (HandAngles, bool) {
    let minute = normalize_deg(hands.minute + seam_delta(hands.second, deg) / 60.0);
    let (hour, is_pm) = follow_minute(hands.hour, hands.minute, minute, is_pm);
    (
        HandAngles {
            hour,
            minute,
            second: deg,
        },
        is_pm,
    )
}

/// Reads the time off the hands. The hour hand determines hours and minutes; the second hand
/// determines seconds.
pub fn time_of_day(hands: HandAngles, is_pm: bool) -> (u32, u32, f64) {
    let hours_float = hands.hour / 30.0;
    let mut hours = hours_float.floor() as u32;
    let minutes = (((hours_float - hours_float.floor()) * 60.0).floor() as u32).min(59);
    let seconds = ((hands.second / 6.0 * 1000.0).round() / 1000.0).min(59.999);
    if is_pm {
        hours += 12;
    }
    (hours, minutes, seconds)
}

/// Wraps any angle into `[0, 360)`.
pub fn normalize_deg(deg: f64) -> f64 {
    let deg = deg.rem_euclid(360.0);
    // rem_euclid of a tiny negative number rounds up to exactly 360
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

// Moves the hour hand by 1/12th of the minute hand's movement. The hour hand passing 12 o'clock
// flips AM/PM.
fn follow_minute(hour: f64, old_minute: f64, new_minute: f64, is_pm: bool) -> (f64, bool) {
    let crossed = straddles_twelve(old_minute, new_minute);
    let hour = normalize_deg(hour + seam_delta(old_minute, new_minute) / 12.0);
    let is_pm = if crossed && (hour > 345.0 || hour < 15.0) {
        !is_pm
    } else {
        is_pm
    };
    (hour, is_pm)
}

// One angle just before 12 o'clock and the other just after
fn straddles_twelve(old: f64, new: f64) -> bool {
    let before = |x: f64| 270.0 < x && x < 360.0;
    let after = |x: f64| (0.0..90.0).contains(&x);
    (before(old) && after(new)) || (after(old) && before(new))
}

// How far a hand moved, taking the short way across 12 o'clock instead of going most of the way
// around backwards.
fn seam_delta(old: f64, new: f64) -> f64 {
    let delta = new - old;
    if straddles_twelve(old, new) {
        delta - delta.signum() * 360.0
    } else {
        delta
    }
}

fn naive_time(hours: u32, minutes: u32, seconds: f64) -> Option<NaiveTime> {
    let whole = seconds.floor();
    let millis = ((seconds - whole) * 1000.0).round().min(999.0) as i64;
    NaiveTime::from_hms_opt(hours, minutes, whole as u32)
        .map(|time| time + Duration::milliseconds(millis))
}
