use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{books::BookEntity, borrowings::BorrowingEntity},
    value_objects::{
        books::{BookDto, BookModel},
        payments::{MAX_CHARGE, PaymentDto, PaymentModel},
    },
};

/// Overdue days are charged at this multiple of the daily fee.
pub const FINE_MULTIPLIER: Decimal = dec!(2);

/// Whole calendar days between two instants; the time of day is discarded.
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BorrowingModel {
    pub id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub book: BookModel,
    pub user_id: Uuid,
}

impl From<(BorrowingEntity, BookEntity)> for BorrowingModel {
    fn from((borrowing, book): (BorrowingEntity, BookEntity)) -> Self {
        Self {
            id: borrowing.id,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
            book: BookModel::from(book),
            user_id: borrowing.user_id,
        }
    }
}

impl BorrowingModel {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }

    pub fn get_borrowing_days(&self) -> i64 {
        calendar_days_between(self.borrow_date, self.expected_return_date)
    }

    pub fn get_price(&self) -> Decimal {
        Decimal::from(self.get_borrowing_days()) * self.book.daily_fee
    }

    /// `None` while the book is still out or when it came back on time.
    pub fn get_overdue_days(&self) -> Option<i64> {
        let returned_at = self.actual_return_date?;
        let days = calendar_days_between(self.expected_return_date, returned_at);
        (days > 0).then_some(days)
    }

    /// Capped at [`MAX_CHARGE`] so a very late return can still be recorded.
    pub fn get_overdue_price(&self) -> Option<Decimal> {
        self.get_overdue_days().map(|days| {
            (Decimal::from(days) * self.book.daily_fee * FINE_MULTIPLIER).min(MAX_CHARGE)
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListBorrowingsFilter {
    pub is_active: Option<bool>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListBorrowingsQuery {
    pub is_active: Option<String>,
    pub user_id: Option<Uuid>,
}

impl ListBorrowingsQuery {
    /// Unrecognised `is_active` values are ignored rather than rejected.
    pub fn to_filter(&self) -> ListBorrowingsFilter {
        let is_active = match self.is_active.as_deref().map(str::to_ascii_lowercase) {
            Some(value) if value == "true" => Some(true),
            Some(value) if value == "false" => Some(false),
            _ => None,
        };

        ListBorrowingsFilter {
            is_active,
            user_id: self.user_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBorrowingRequest {
    pub book_id: Uuid,
    pub expected_return_date: DateTime<Utc>,
}

/// Result of a borrow or return: the borrowing plus the charge it raised, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowingOutcome {
    pub borrowing: BorrowingModel,
    pub payment: Option<PaymentModel>,
}

#[derive(Debug, Serialize)]
pub struct BorrowingDto {
    pub id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub book: BookDto,
    pub user_id: Uuid,
}

impl From<BorrowingModel> for BorrowingDto {
    fn from(value: BorrowingModel) -> Self {
        Self {
            id: value.id,
            borrow_date: value.borrow_date,
            expected_return_date: value.expected_return_date,
            actual_return_date: value.actual_return_date,
            book: BookDto::from(value.book),
            user_id: value.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BorrowingDetailDto {
    #[serde(flatten)]
    pub borrowing: BorrowingDto,
    pub rental_days: i64,
    pub rental_price: Decimal,
    pub overdue_days: Option<i64>,
    pub overdue_fine: Option<Decimal>,
}

impl From<BorrowingModel> for BorrowingDetailDto {
    fn from(value: BorrowingModel) -> Self {
        let rental_days = value.get_borrowing_days();
        let rental_price = value.get_price();
        let overdue_days = value.get_overdue_days();
        let overdue_fine = value.get_overdue_price();

        Self {
            borrowing: BorrowingDto::from(value),
            rental_days,
            rental_price,
            overdue_days,
            overdue_fine,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BorrowingCheckoutDto {
    pub borrowing: BorrowingDetailDto,
    pub payment: Option<PaymentDto>,
}

impl From<BorrowingOutcome> for BorrowingCheckoutDto {
    fn from(value: BorrowingOutcome) -> Self {
        Self {
            borrowing: BorrowingDetailDto::from(value.borrowing),
            payment: value.payment.map(PaymentDto::from),
        }
    }
}
