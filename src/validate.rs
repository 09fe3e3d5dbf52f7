//! Submission validation. Runs before anything is persisted; a failure here
//! never produces a record.

use std::sync::LazyLock;

use chrono::{NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::AppError;
use crate::models::{NewFlightOrder, NewHotelOrder};

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());

pub fn flight_order(req: &NewFlightOrder) -> Result<(), AppError> {
    require_len("departure_city", &req.departure_city, 2, 50)?;
    require_len("arrival_city", &req.arrival_city, 2, 50)?;
    require_len("flight_number", &req.flight_number, 3, 20)?;
    require_len("airline", &req.airline, 2, 50)?;
    require_len("purpose", &req.purpose, 5, 200)?;

    let departure = datetime("departure_time", req.departure_date, &req.departure_time)?;
    let arrival = datetime("arrival_time", req.arrival_date, &req.arrival_time)?;

    if arrival < departure {
        return Err(AppError::Validation(
            "Arrival must not be earlier than departure".to_string(),
        ));
    }

    if !(1..=10).contains(&req.passengers) {
        return Err(AppError::Validation(
            "Passengers must be between 1 and 10".to_string(),
        ));
    }

    max_len("luggage_info", req.luggage_info.as_deref(), 500)?;
    max_len("special_requests", req.special_requests.as_deref(), 500)?;

    Ok(())
}

pub fn hotel_order(req: &NewHotelOrder) -> Result<(), AppError> {
    require_len("city", &req.city, 2, 50)?;
    require_len("flight_number", &req.flight_number, 3, 20)?;
    time("check_in_time", &req.check_in_time)?;
    time("check_out_time", &req.check_out_time)?;

    if req.check_out_date <= req.check_in_date {
        return Err(AppError::Validation(
            "Check-out must be strictly after check-in".to_string(),
        ));
    }

    Ok(())
}

fn require_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn max_len(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    if let Some(v) = value {
        if v.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(())
}

fn time(field: &str, value: &str) -> Result<NaiveTime, AppError> {
    if !TIME_RE.is_match(value) {
        return Err(AppError::Validation(format!(
            "{field} must be in HH:MM format"
        )));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::Validation(format!("{field} must be in HH:MM format")))
}

fn datetime(
    field: &str,
    date: chrono::NaiveDate,
    time_str: &str,
) -> Result<NaiveDateTime, AppError> {
    let t = time(field, time_str)?;
    Ok(date.and_time(t))
}
