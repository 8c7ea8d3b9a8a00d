//! Clock and local-calendar date arithmetic
//!
//! Timestamps are stored in UTC. Everything that talks about "today", day
//! buckets or streaks works on the user's local calendar date, so the clock
//! supplies both "now" and the local UTC offset in effect at an instant.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Source of "now" and of the local day boundary
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Local UTC offset in effect at `instant`
    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset;

    /// Local calendar date of an instant
    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset_at(instant)).date_naive()
    }

    /// Today's local calendar date
    fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    /// The instant local midnight begins on `date`
    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        resolve_midnight(self, date)
    }

    /// Half-open `[start, end)` instant range covering one local calendar day
    fn day_range(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = date.succ_opt().unwrap_or(date);
        (self.start_of_day(date), self.start_of_day(next))
    }
}

/// Wall clock in the machine's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        Local.offset_from_utc_datetime(&instant.naive_utc()).fix()
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        // Ambiguous midnight takes the earlier instant; a skipped one falls back to offset search
        Local
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .map(|midnight| midnight.with_timezone(&Utc))
            .unwrap_or_else(|| resolve_midnight(self, date))
    }
}

/// Find the UTC instant of local midnight on `date` from the clock's offsets.
///
/// The first guess reads the offset as if midnight were UTC; the second reads
/// it at the guessed instant, which lands on the right side of a transition
/// unless the transition is itself within a few hours of midnight.
fn resolve_midnight<C: Clock + ?Sized>(clock: &C, date: NaiveDate) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let shift = |offset: FixedOffset| {
        Utc.from_utc_datetime(&(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))))
    };
    let guess = shift(clock.offset_at(Utc.from_utc_datetime(&local_midnight)));
    shift(clock.offset_at(guess))
}

/// Settable clock with a fixed offset
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Create a clock frozen at `now` in the given local offset
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    /// Create a UTC clock frozen at `now`
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    /// Create a clock at a local wall-clock time. Returns None for an invalid date/time or offset.
    pub fn at_local(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        offset_secs: i32,
    ) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_secs)?;
        let local = offset.with_ymd_and_hms(year, month, day, hour, minute, 0).single()?;
        Some(Self::new(local.with_timezone(&Utc), offset))
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn offset_at(&self, _instant: DateTime<Utc>) -> FixedOffset {
        self.offset
    }
}

/// Add whole days to an instant (exact 24h multiples)
pub fn add_days(instant: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    instant + Duration::days(i64::from(days))
}
