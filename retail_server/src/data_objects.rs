use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use retail_engine::{
    db_types::OrderStatusType,
    order_objects::{OrderQueryFilter, Pagination},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachPaymentIntentRequest {
    pub payment_intent_id: String,
}

/// Query parameters for `GET /api/orders`.
///
/// Dates may be given as RFC 3339 timestamps or as plain `YYYY-MM-DD` dates. A plain `end_date` includes the whole of
/// that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderListParams {
    pub fn into_query(self) -> Result<(OrderQueryFilter, Pagination), ServerError> {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            for s in status.split(',') {
                let status = s.parse::<OrderStatusType>().map_err(|e| ServerError::InvalidQuery(e.to_string()))?;
                filter = filter.with_status(status);
            }
        }
        if let Some(start) = self.start_date.as_deref() {
            filter = filter.since(parse_date(start, false)?);
        }
        if let Some(end) = self.end_date.as_deref() {
            filter = filter.until(parse_date(end, true)?);
        }
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err(ServerError::InvalidQuery("start_date is after end_date".into()));
            }
        }
        Ok((filter, Pagination::new(self.page, self.limit)))
    }
}

fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>, ServerError> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ServerError::InvalidQuery(format!("{s} is not a valid date. {e}")))?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    if end_of_day {
        Ok(start + Duration::days(1) - Duration::microseconds(1))
    } else {
        Ok(start)
    }
}
