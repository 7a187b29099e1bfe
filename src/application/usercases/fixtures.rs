use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    entities::{
        books::BookEntity,
        borrowings::BorrowingEntity,
        payments::{PaymentEntity, UpsertPaymentSessionEntity},
    },
    value_objects::{
        enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
        iam::Requester,
    },
};

pub fn requester(is_staff: bool) -> Requester {
    Requester {
        user_id: Uuid::new_v4(),
        email: "reader@example.com".to_string(),
        is_staff,
    }
}

pub fn book(inventory: i32, daily_fee: Decimal) -> BookEntity {
    BookEntity {
        id: Uuid::new_v4(),
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        cover: "hard".to_string(),
        inventory,
        daily_fee,
        created_at: Utc::now(),
    }
}

pub fn borrowing(
    book: &BookEntity,
    user_id: Uuid,
    borrow_date: DateTime<Utc>,
    expected_return_date: DateTime<Utc>,
    actual_return_date: Option<DateTime<Utc>>,
) -> BorrowingEntity {
    BorrowingEntity {
        id: Uuid::new_v4(),
        borrow_date,
        expected_return_date,
        actual_return_date,
        book_id: book.id,
        user_id,
    }
}

pub fn payment(
    borrowing_id: Uuid,
    payment_type: PaymentType,
    status: PaymentStatus,
    session_id: Option<&str>,
    money_to_pay: Decimal,
) -> PaymentEntity {
    let now = Utc::now();
    PaymentEntity {
        id: Uuid::new_v4(),
        borrowing_id,
        type_: payment_type.to_string(),
        status: status.to_string(),
        session_id: session_id.map(str::to_string),
        session_url: session_id.map(|id| format!("https://checkout.stripe.com/c/pay/{id}")),
        money_to_pay,
        created_at: now,
        updated_at: now,
    }
}

/// What the upsert would leave in the table.
pub fn upserted(entity: UpsertPaymentSessionEntity) -> PaymentEntity {
    PaymentEntity {
        id: Uuid::new_v4(),
        borrowing_id: entity.borrowing_id,
        type_: entity.type_,
        status: entity.status,
        session_id: entity.session_id,
        session_url: entity.session_url,
        money_to_pay: entity.money_to_pay,
        created_at: entity.updated_at,
        updated_at: entity.updated_at,
    }
}
