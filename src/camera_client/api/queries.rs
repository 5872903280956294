use chrono::NaiveDate;
use serde::Serialize;

#[derive(Serialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct DeleteQuery {
    pub id: i64,
}
