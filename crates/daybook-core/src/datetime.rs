use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveTime,
  Weekday
};
use regex::Regex;

use crate::error::ValidationError;

/// Parses a strict `HH:mm` 24-hour time.
///
/// Both fields need exactly two digits and
/// no surrounding whitespace is accepted.
/// Blank input is reported as missing
/// rather than malformed.
pub fn parse_time_of_day(
  raw: &str
) -> Result<NaiveTime, ValidationError> {
  if raw.trim().is_empty() {
    return Err(
      ValidationError::MissingTime
    );
  }

  parse_hour_minute(raw)
    .and_then(|(hour, minute)| {
      NaiveTime::from_hms_opt(
        hour, minute, 0
      )
    })
    .ok_or_else(|| {
      ValidationError::InvalidTimeFormat {
        input: raw.to_string()
      }
    })
}

fn parse_hour_minute(
  raw: &str
) -> Option<(u32, u32)> {
  let re = Regex::new(
    r"^(?P<hour>\d{2}):(?P<minute>\d{2})$"
  )
  .ok()?;
  let captures = re.captures(raw)?;

  let hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if hour > 23 || minute > 59 {
    return None;
  }
  Some((hour, minute))
}

/// Resolves a user-typed date relative to
/// `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(offset) =
    parse_day_offset(&lower)
  {
    return shift_days(today, offset);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, YYYY-MM-DD"
  })
}

/// Parses `YYYY-MM` into a (year, month)
/// pair.
pub fn parse_month_expr(
  input: &str
) -> anyhow::Result<(i32, u32)> {
  let token = input.trim();
  let first = NaiveDate::parse_from_str(
    &format!("{token}-01"),
    "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid month `{token}`; \
       expected YYYY-MM"
    )
  })?;
  Ok((first.year(), first.month()))
}

/// Every date of a month, first to last.
pub fn month_days(
  year: i32,
  month: u32
) -> anyhow::Result<Vec<NaiveDate>> {
  let first =
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month: \
         {year}-{month:02}"
      )
    })?;

  Ok(
    first
      .iter_days()
      .take_while(|d| {
        d.month() == month
      })
      .collect()
  )
}

fn shift_days(
  from: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      from.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {from} \
         {days:+} days"
      )
    })
}

fn parse_day_offset(
  token: &str
) -> Option<i64> {
  let re =
    Regex::new(r"^(?P<n>[+-]\d+)d$")
      .ok()?;
  let captures = re.captures(token)?;
  captures
    .name("n")?
    .as_str()
    .parse::<i64>()
    .ok()
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  Duration::try_days(delta)
    .and_then(|delta| {
      from.checked_add_signed(delta)
    })
    .unwrap_or(from)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    month_days,
    parse_date_expr,
    parse_month_expr,
    parse_time_of_day
  };
  use crate::error::ValidationError;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(
      2026, 2, 17
    )
    .expect("valid today")
  }

  #[test]
  fn parses_strict_hour_minute() {
    let time =
      parse_time_of_day("15:30")
        .expect("parse time");
    assert_eq!(
      time.format("%H:%M").to_string(),
      "15:30"
    );
    assert!(
      parse_time_of_day("00:00").is_ok()
    );
    assert!(
      parse_time_of_day("23:59").is_ok()
    );
  }

  #[test]
  fn rejects_malformed_or_out_of_range_times()
   {
    for raw in [
      "25:99", "24:00", "12:60",
      "9:00", "09:0", "09.00",
      " 09:00", "09:00pm"
    ] {
      assert_eq!(
        parse_time_of_day(raw),
        Err(
          ValidationError::InvalidTimeFormat {
            input: raw.to_string()
          }
        ),
        "{raw} should be rejected"
      );
    }
  }

  #[test]
  fn blank_time_is_missing() {
    assert_eq!(
      parse_time_of_day("   "),
      Err(ValidationError::MissingTime)
    );
  }

  #[test]
  fn parses_relative_dates() {
    assert_eq!(
      parse_date_expr("today", today())
        .expect("today"),
      today()
    );
    assert_eq!(
      parse_date_expr(
        "tomorrow",
        today()
      )
      .expect("tomorrow")
      .to_string(),
      "2026-02-18"
    );
    assert_eq!(
      parse_date_expr("-3d", today())
        .expect("offset")
        .to_string(),
      "2026-02-14"
    );
  }

  #[test]
  fn huge_day_offset_is_an_error() {
    assert!(
      parse_date_expr(
        "+999999999999999d",
        today()
      )
      .is_err()
    );
    assert!(
      parse_date_expr(
        "-99999999d",
        today()
      )
      .is_err()
    );
  }

  #[test]
  fn parses_weekday_name_as_next_occurrence()
   {
    // 2026-02-17 is a Tuesday.
    assert_eq!(
      parse_date_expr(
        "wednesday",
        today()
      )
      .expect("weekday")
      .to_string(),
      "2026-02-18"
    );
    assert_eq!(
      parse_date_expr("tue", today())
        .expect("same weekday")
        .to_string(),
      "2026-02-24"
    );
  }

  #[test]
  fn parses_iso_date_and_rejects_noise()
  {
    assert_eq!(
      parse_date_expr(
        "2024-05-01",
        today()
      )
      .expect("iso")
      .to_string(),
      "2024-05-01"
    );
    assert!(
      parse_date_expr(
        "someday",
        today()
      )
      .is_err()
    );
  }

  #[test]
  fn month_helpers() {
    assert_eq!(
      parse_month_expr("2024-02")
        .expect("month"),
      (2024, 2)
    );
    assert!(
      parse_month_expr("2024-13")
        .is_err()
    );
    assert_eq!(
      month_days(2024, 2)
        .expect("days")
        .len(),
      29
    );
  }
}

pub mod hhmm_serde {
  use chrono::NaiveTime;
  use serde::Serializer;

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S>(
    time: &NaiveTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &time.format(FORMAT).to_string()
    )
  }
}
