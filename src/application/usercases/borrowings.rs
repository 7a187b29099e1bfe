use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usercases::checkout::CheckoutUseCase,
    domain::{
        entities::borrowings::InsertBorrowingEntity,
        repositories::{
            books::BookRepository, borrowings::BorrowingRepository, payments::PaymentRepository,
        },
        value_objects::{
            borrowings::{
                BorrowingModel, BorrowingOutcome, CreateBorrowingRequest, ListBorrowingsFilter,
                calendar_days_between,
            },
            enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
            iam::Requester,
            payments::{MAX_CHARGE, PaymentModel, PendingCharge},
        },
    },
    observability::notifier::NotificationSink,
    payments::gateway::PaymentGateway,
};

#[derive(Debug, Error)]
pub enum BorrowingError {
    #[error("book not found")]
    BookNotFound,
    #[error("borrowing not found")]
    BorrowingNotFound,
    #[error("no copies of this book are available")]
    InventoryExhausted,
    #[error(
        "you have an outstanding payment {payment_id} ({status}, {money_to_pay}); pay or renew it before borrowing again"
    )]
    OutstandingPaymentExists {
        payment_id: Uuid,
        status: PaymentStatus,
        money_to_pay: Decimal,
        session_url: Option<String>,
    },
    #[error("borrowing was already returned at {returned_at}")]
    AlreadyReturned { returned_at: DateTime<Utc> },
    #[error("expected_return_date must be at least one day after today")]
    InvalidReturnDate,
    #[error("rental price {amount} exceeds the {limit} limit; choose an earlier expected_return_date")]
    ChargeTooLarge { amount: Decimal, limit: Decimal },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BorrowingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BorrowingError::BookNotFound | BorrowingError::BorrowingNotFound => {
                StatusCode::NOT_FOUND
            }
            BorrowingError::InventoryExhausted
            | BorrowingError::OutstandingPaymentExists { .. }
            | BorrowingError::AlreadyReturned { .. }
            | BorrowingError::InvalidReturnDate
            | BorrowingError::ChargeTooLarge { .. } => StatusCode::BAD_REQUEST,
            BorrowingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type BorrowingResult<T> = std::result::Result<T, BorrowingError>;

pub struct BorrowingUseCase<B, K, P, G, N>
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    borrowing_repo: Arc<B>,
    book_repo: Arc<K>,
    payment_repo: Arc<P>,
    checkout: Arc<CheckoutUseCase<P, G>>,
    notifier: Arc<N>,
}

impl<B, K, P, G, N> BorrowingUseCase<B, K, P, G, N>
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    pub fn new(
        borrowing_repo: Arc<B>,
        book_repo: Arc<K>,
        payment_repo: Arc<P>,
        checkout: Arc<CheckoutUseCase<P, G>>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            borrowing_repo,
            book_repo,
            payment_repo,
            checkout,
            notifier,
        }
    }

    /// Takes a copy off the shelf and opens the rental charge. The inventory
    /// change, the borrowing and a session-less pending payment commit
    /// together; the checkout session is attached afterwards and its failure
    /// does not undo the borrow.
    pub async fn create_borrowing(
        &self,
        requester: &Requester,
        request: CreateBorrowingRequest,
    ) -> BorrowingResult<BorrowingOutcome> {
        let user_id = requester.user_id;
        let book_id = request.book_id;
        info!(%user_id, %book_id, "borrowings: create requested");

        let book = self
            .book_repo
            .find_by_id(book_id)
            .await
            .map_err(|err| {
                error!(%book_id, db_error = ?err, "borrowings: failed to load book");
                BorrowingError::Internal(err)
            })?
            .ok_or(BorrowingError::BookNotFound)?;

        if book.inventory <= 0 {
            warn!(%user_id, %book_id, "borrowings: book out of stock");
            return Err(BorrowingError::InventoryExhausted);
        }

        let outstanding = self
            .payment_repo
            .find_outstanding_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "borrowings: failed to check outstanding payments");
                BorrowingError::Internal(err)
            })?;
        if let Some(outstanding) = outstanding {
            let outstanding = PaymentModel::from(outstanding);
            warn!(
                %user_id,
                payment_id = %outstanding.id,
                status = %outstanding.status,
                "borrowings: blocked by outstanding payment"
            );
            return Err(BorrowingError::OutstandingPaymentExists {
                payment_id: outstanding.id,
                status: outstanding.status,
                money_to_pay: outstanding.money_to_pay,
                session_url: outstanding.session_url,
            });
        }

        let now = Utc::now();
        let rental_days = calendar_days_between(now, request.expected_return_date);
        if rental_days < 1 {
            return Err(BorrowingError::InvalidReturnDate);
        }
        let rental_price = Decimal::from(rental_days) * book.daily_fee;
        if rental_price > MAX_CHARGE {
            warn!(%user_id, %book_id, rental_days, %rental_price, "borrowings: rental price over limit");
            return Err(BorrowingError::ChargeTooLarge {
                amount: rental_price,
                limit: MAX_CHARGE,
            });
        }

        let created = self
            .borrowing_repo
            .create_borrowing(
                InsertBorrowingEntity {
                    borrow_date: now,
                    expected_return_date: request.expected_return_date,
                    book_id,
                    user_id,
                },
                PendingCharge {
                    payment_type: PaymentType::Payment,
                    money_to_pay: rental_price,
                },
            )
            .await
            .map_err(|err| {
                error!(%user_id, %book_id, db_error = ?err, "borrowings: failed to create borrowing");
                BorrowingError::Internal(err)
            })?;

        // Another borrower may have taken the last copy since the check above.
        let Some((borrowing, book, pending)) = created else {
            warn!(%user_id, %book_id, "borrowings: lost the race for the last copy");
            return Err(BorrowingError::InventoryExhausted);
        };
        let borrowing = BorrowingModel::from((borrowing, book));
        info!(
            %user_id,
            borrowing_id = %borrowing.id,
            inventory_left = borrowing.book.inventory,
            %rental_price,
            "borrowings: borrowing created"
        );

        let payment = self
            .attach_session(
                &borrowing,
                &requester.email,
                PendingCharge {
                    payment_type: PaymentType::Payment,
                    money_to_pay: rental_price,
                },
                rental_days,
                PaymentModel::from(pending),
            )
            .await;

        self.notify(new_borrowing_message(&borrowing)).await;

        Ok(BorrowingOutcome {
            borrowing,
            payment: Some(payment),
        })
    }

    /// Puts the copy back on the shelf. Only the first return wins; a late
    /// return also opens a fine charge.
    pub async fn return_borrowing(
        &self,
        requester: &Requester,
        borrowing_id: Uuid,
    ) -> BorrowingResult<BorrowingOutcome> {
        let current = self.get_borrowing(requester, borrowing_id).await?;
        if let Some(returned_at) = current.actual_return_date {
            return Err(BorrowingError::AlreadyReturned { returned_at });
        }

        let returned_at = Utc::now();
        let mut preview = current.clone();
        preview.actual_return_date = Some(returned_at);
        let fine = preview.get_overdue_price().map(|money_to_pay| PendingCharge {
            payment_type: PaymentType::Fine,
            money_to_pay,
        });

        let returned = self
            .borrowing_repo
            .return_borrowing(borrowing_id, returned_at, fine)
            .await
            .map_err(|err| {
                error!(%borrowing_id, db_error = ?err, "borrowings: failed to return borrowing");
                BorrowingError::Internal(err)
            })?;

        let Some((borrowing, book, fine_payment)) = returned else {
            let returned_at = self
                .find(borrowing_id)
                .await?
                .actual_return_date
                .unwrap_or(returned_at);
            warn!(%borrowing_id, "borrowings: concurrent return already applied");
            return Err(BorrowingError::AlreadyReturned { returned_at });
        };
        let borrowing = BorrowingModel::from((borrowing, book));
        info!(
            %borrowing_id,
            user_id = %borrowing.user_id,
            inventory = borrowing.book.inventory,
            overdue_days = ?borrowing.get_overdue_days(),
            "borrowings: borrowing returned"
        );

        // Staff may return on a member's behalf; the fine is billed to the borrower.
        let customer = if requester.user_id == borrowing.user_id {
            requester.email.clone()
        } else {
            borrowing.user_id.to_string()
        };
        let payment = match (fine, fine_payment) {
            (Some(charge), Some(pending)) => Some(
                self.attach_session(
                    &borrowing,
                    &customer,
                    charge,
                    borrowing.get_overdue_days().unwrap_or_default(),
                    PaymentModel::from(pending),
                )
                .await,
            ),
            _ => None,
        };

        Ok(BorrowingOutcome { borrowing, payment })
    }

    pub async fn list_borrowings(
        &self,
        requester: &Requester,
        filter: ListBorrowingsFilter,
    ) -> BorrowingResult<Vec<BorrowingModel>> {
        let filter = ListBorrowingsFilter {
            user_id: requester.scope(filter.user_id),
            ..filter
        };

        let borrowings = self
            .borrowing_repo
            .list_borrowings(&filter)
            .await
            .map_err(|err| {
                error!(?filter, db_error = ?err, "borrowings: failed to list borrowings");
                BorrowingError::Internal(err)
            })?;

        Ok(borrowings.into_iter().map(BorrowingModel::from).collect())
    }

    /// Someone else's borrowing reads as not found unless the requester is staff.
    pub async fn get_borrowing(
        &self,
        requester: &Requester,
        borrowing_id: Uuid,
    ) -> BorrowingResult<BorrowingModel> {
        let borrowing = self.find(borrowing_id).await?;
        if !requester.can_see(borrowing.user_id) {
            warn!(
                %borrowing_id,
                requester_id = %requester.user_id,
                "borrowings: borrowing requested by non-owner"
            );
            return Err(BorrowingError::BorrowingNotFound);
        }
        Ok(borrowing)
    }

    async fn find(&self, borrowing_id: Uuid) -> BorrowingResult<BorrowingModel> {
        let found = self
            .borrowing_repo
            .find_borrowing(borrowing_id)
            .await
            .map_err(|err| {
                error!(%borrowing_id, db_error = ?err, "borrowings: failed to load borrowing");
                BorrowingError::Internal(err)
            })?
            .ok_or(BorrowingError::BorrowingNotFound)?;

        Ok(BorrowingModel::from(found))
    }

    /// Best effort: on failure the caller still gets the committed charge,
    /// shown as expired so it can be renewed.
    async fn attach_session(
        &self,
        borrowing: &BorrowingModel,
        customer: &str,
        charge: PendingCharge,
        duration_days: i64,
        pending: PaymentModel,
    ) -> PaymentModel {
        match self
            .checkout
            .create_session(
                borrowing,
                customer,
                charge.payment_type,
                charge.money_to_pay,
                duration_days,
            )
            .await
        {
            Ok(payment) => payment,
            Err(err) => {
                warn!(
                    borrowing_id = %borrowing.id,
                    payment_type = %charge.payment_type,
                    error = %err,
                    "borrowings: checkout session unavailable, payment left for renewal"
                );
                PaymentModel {
                    status: PaymentStatus::Expired,
                    ..pending
                }
            }
        }
    }

    async fn notify(&self, text: String) {
        if let Err(err) = self.notifier.send(text).await {
            warn!(error = ?err, "borrowings: notification failed");
        }
    }
}

fn new_borrowing_message(borrowing: &BorrowingModel) -> String {
    format!(
        "New borrowing:\nborrowing id: {}\nbook: {}\nuser: {}\nexpected return date: {}",
        borrowing.id,
        borrowing.book.title,
        borrowing.user_id,
        borrowing.expected_return_date.date_naive()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::usercases::{checkout::CheckoutUrls, fixtures},
        domain::{
            entities::{books::BookEntity, borrowings::BorrowingEntity},
            repositories::{
                books::MockBookRepository, borrowings::MockBorrowingRepository,
                payments::MockPaymentRepository,
            },
        },
        observability::notifier::MockNotificationSink,
        payments::{
            gateway::{CheckoutSession, MockPaymentGateway},
            retry::RetryPolicy,
        },
    };
    use anyhow::anyhow;
    use chrono::Duration;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    type TestUseCase = BorrowingUseCase<
        MockBorrowingRepository,
        MockBookRepository,
        MockPaymentRepository,
        MockPaymentGateway,
        MockNotificationSink,
    >;

    fn usecase(
        borrowing_repo: MockBorrowingRepository,
        book_repo: MockBookRepository,
        payment_repo: MockPaymentRepository,
        gateway: MockPaymentGateway,
        notifier: MockNotificationSink,
    ) -> TestUseCase {
        let payment_repo = Arc::new(payment_repo);
        let checkout = Arc::new(CheckoutUseCase::new(
            Arc::clone(&payment_repo),
            Arc::new(gateway),
            CheckoutUrls {
                success_url: "http://localhost/api/v1/payments/success".to_string(),
                cancel_url: "http://localhost/api/v1/payments/cancel".to_string(),
            },
            RetryPolicy::none(),
        ));

        BorrowingUseCase::new(
            Arc::new(borrowing_repo),
            Arc::new(book_repo),
            payment_repo,
            checkout,
            Arc::new(notifier),
        )
    }

    fn book_repo_with(book: &BookEntity) -> MockBookRepository {
        let book = book.clone();
        let mut book_repo = MockBookRepository::new();
        book_repo
            .expect_find_by_id()
            .with(eq(book.id))
            .returning(move |_| Ok(Some(book.clone())));
        book_repo
    }

    fn accepting_notifier() -> MockNotificationSink {
        let mut notifier = MockNotificationSink::new();
        notifier.expect_send().returning(|_| Ok(()));
        notifier
    }

    fn gateway_returning(session_id: &'static str) -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_session().returning(move |_| {
            Ok(CheckoutSession {
                session_id: session_id.to_string(),
                session_url: format!("https://checkout.stripe.com/c/pay/{session_id}"),
            })
        });
        gateway
    }

    /// Mirrors what the postgres transaction hands back after a borrow.
    fn created_rows(
        book: &BookEntity,
        entity: InsertBorrowingEntity,
        charge: PendingCharge,
    ) -> (BorrowingEntity, BookEntity, crate::domain::entities::payments::PaymentEntity) {
        let borrowing = BorrowingEntity {
            id: Uuid::new_v4(),
            borrow_date: entity.borrow_date,
            expected_return_date: entity.expected_return_date,
            actual_return_date: None,
            book_id: entity.book_id,
            user_id: entity.user_id,
        };
        let payment = fixtures::payment(
            borrowing.id,
            charge.payment_type,
            PaymentStatus::Pending,
            None,
            charge.money_to_pay,
        );
        let book = BookEntity {
            inventory: book.inventory - 1,
            ..book.clone()
        };
        (borrowing, book, payment)
    }

    #[tokio::test]
    async fn borrowing_decrements_inventory_and_opens_rental_charge() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(10, dec!(1.50));
        let expected_return_date = Utc::now() + Duration::days(14);

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .with(eq(requester.user_id))
            .returning(|_| Ok(None));
        payment_repo
            .expect_upsert_session()
            .withf(|entity| entity.type_ == "payment" && entity.money_to_pay == dec!(21.00))
            .times(1)
            .returning(|entity| Ok(fixtures::upserted(entity)));

        let mut borrowing_repo = MockBorrowingRepository::new();
        let shelf = book.clone();
        borrowing_repo
            .expect_create_borrowing()
            .withf(|_, charge| {
                charge.payment_type == PaymentType::Payment && charge.money_to_pay == dec!(21.00)
            })
            .times(1)
            .returning(move |entity, charge| Ok(Some(created_rows(&shelf, entity, charge))));

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            payment_repo,
            gateway_returning("cs_test_rent"),
            accepting_notifier(),
        );

        let outcome = usecase
            .create_borrowing(
                &requester,
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.borrowing.book.inventory, 9);
        assert!(outcome.borrowing.is_active());
        assert_eq!(outcome.borrowing.get_price(), dec!(21.00));

        let payment = outcome.payment.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.money_to_pay, dec!(21.00));
        assert_eq!(payment.session_id.as_deref(), Some("cs_test_rent"));
    }

    #[tokio::test]
    async fn out_of_stock_book_cannot_be_borrowed() {
        let book = fixtures::book(0, dec!(1.50));
        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo.expect_create_borrowing().never();

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let err = usecase
            .create_borrowing(
                &fixtures::requester(false),
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(3),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BorrowingError::InventoryExhausted));
    }

    #[tokio::test]
    async fn losing_the_last_copy_race_reports_exhausted() {
        let book = fixtures::book(1, dec!(1.50));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .returning(|_| Ok(None));
        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo
            .expect_create_borrowing()
            .returning(|_, _| Ok(None));

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            payment_repo,
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let err = usecase
            .create_borrowing(
                &fixtures::requester(false),
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(3),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BorrowingError::InventoryExhausted));
    }

    #[tokio::test]
    async fn outstanding_payment_blocks_new_borrowing() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(4, dec!(1.50));
        let blocking = fixtures::payment(
            Uuid::new_v4(),
            PaymentType::Fine,
            PaymentStatus::Expired,
            Some("cs_test_old"),
            dec!(9.00),
        );
        let blocking_id = blocking.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .with(eq(requester.user_id))
            .returning(move |_| Ok(Some(blocking.clone())));
        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo.expect_create_borrowing().never();

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            payment_repo,
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let err = usecase
            .create_borrowing(
                &requester,
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(3),
                },
            )
            .await
            .unwrap_err();

        match err {
            BorrowingError::OutstandingPaymentExists {
                payment_id,
                status,
                money_to_pay,
                ..
            } => {
                assert_eq!(payment_id, blocking_id);
                assert_eq!(status, PaymentStatus::Expired);
                assert_eq!(money_to_pay, dec!(9.00));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_day_return_date_is_rejected() {
        let book = fixtures::book(4, dec!(1.50));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .returning(|_| Ok(None));

        let usecase = usecase(
            MockBorrowingRepository::new(),
            book_repo_with(&book),
            payment_repo,
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let err = usecase
            .create_borrowing(
                &fixtures::requester(false),
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() - Duration::days(1),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BorrowingError::InvalidReturnDate));
    }

    #[tokio::test]
    async fn rental_priced_over_the_charge_limit_is_rejected() {
        let book = fixtures::book(4, dec!(50.00));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .returning(|_| Ok(None));
        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo.expect_create_borrowing().never();

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            payment_repo,
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let err = usecase
            .create_borrowing(
                &fixtures::requester(false),
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(2_001),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        match err {
            BorrowingError::ChargeTooLarge { amount, limit } => {
                assert_eq!(amount, dec!(100050.00));
                assert_eq!(limit, MAX_CHARGE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_outage_still_commits_the_borrow() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(2, dec!(2.00));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .returning(|_| Ok(None));
        payment_repo
            .expect_upsert_session()
            .withf(|entity| entity.status == "expired")
            .times(1)
            .returning(|entity| Ok(fixtures::upserted(entity)));

        let mut borrowing_repo = MockBorrowingRepository::new();
        let shelf = book.clone();
        borrowing_repo
            .expect_create_borrowing()
            .times(1)
            .returning(move |entity, charge| Ok(Some(created_rows(&shelf, entity, charge))));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_session()
            .returning(|_| Err(anyhow!("connection refused")));

        let usecase = usecase(
            borrowing_repo,
            book_repo_with(&book),
            payment_repo,
            gateway,
            accepting_notifier(),
        );

        let outcome = usecase
            .create_borrowing(
                &requester,
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(2),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.borrowing.book.inventory, 1);
        let payment = outcome.payment.unwrap();
        assert_eq!(payment.status, PaymentStatus::Expired);
        assert_eq!(payment.money_to_pay, dec!(4.00));
        assert!(payment.session_url.is_none());
    }

    #[tokio::test]
    async fn late_return_restores_inventory_and_opens_fine() {
        let requester = fixtures::requester(false);
        // 9 copies on the shelf while this one is out.
        let book = fixtures::book(9, dec!(1.50));
        let borrow_date = Utc::now() - Duration::days(17);
        let expected = borrow_date + Duration::days(14);
        let borrowing = fixtures::borrowing(&book, requester.user_id, borrow_date, expected, None);
        let borrowing_id = borrowing.id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        let (found, shelf) = (borrowing.clone(), book.clone());
        borrowing_repo
            .expect_find_borrowing()
            .with(eq(borrowing_id))
            .returning(move |_| Ok(Some((found.clone(), shelf.clone()))));
        let (row, shelf) = (borrowing.clone(), book.clone());
        borrowing_repo
            .expect_return_borrowing()
            .withf(move |id, _, fine| {
                *id == borrowing_id
                    && *fine
                        == Some(PendingCharge {
                            payment_type: PaymentType::Fine,
                            money_to_pay: dec!(9.00),
                        })
            })
            .times(1)
            .returning(move |_, returned_at, fine| {
                let returned = BorrowingEntity {
                    actual_return_date: Some(returned_at),
                    ..row.clone()
                };
                let book = BookEntity {
                    inventory: shelf.inventory + 1,
                    ..shelf.clone()
                };
                let fine_row = fine.map(|charge| {
                    fixtures::payment(
                        returned.id,
                        charge.payment_type,
                        PaymentStatus::Pending,
                        None,
                        charge.money_to_pay,
                    )
                });
                Ok(Some((returned, book, fine_row)))
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_upsert_session()
            .withf(|entity| entity.type_ == "fine" && entity.money_to_pay == dec!(9.00))
            .times(1)
            .returning(|entity| Ok(fixtures::upserted(entity)));

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            payment_repo,
            gateway_returning("cs_test_fine"),
            MockNotificationSink::new(),
        );

        let outcome = usecase.return_borrowing(&requester, borrowing_id).await.unwrap();

        assert!(!outcome.borrowing.is_active());
        assert_eq!(outcome.borrowing.book.inventory, 10);
        assert_eq!(outcome.borrowing.get_overdue_days(), Some(3));

        let fine = outcome.payment.unwrap();
        assert_eq!(fine.payment_type, PaymentType::Fine);
        assert_eq!(fine.money_to_pay, dec!(9.00));
        assert_eq!(fine.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn on_time_return_opens_no_charge() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(0, dec!(1.50));
        let borrow_date = Utc::now() - Duration::days(3);
        let borrowing = fixtures::borrowing(
            &book,
            requester.user_id,
            borrow_date,
            borrow_date + Duration::days(7),
            None,
        );
        let borrowing_id = borrowing.id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        let (found, shelf) = (borrowing.clone(), book.clone());
        borrowing_repo
            .expect_find_borrowing()
            .returning(move |_| Ok(Some((found.clone(), shelf.clone()))));
        borrowing_repo
            .expect_return_borrowing()
            .withf(|_, _, fine| fine.is_none())
            .times(1)
            .returning(move |_, returned_at, _| {
                let returned = BorrowingEntity {
                    actual_return_date: Some(returned_at),
                    ..borrowing.clone()
                };
                let book = BookEntity {
                    inventory: book.inventory + 1,
                    ..book.clone()
                };
                Ok(Some((returned, book, None)))
            });

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let outcome = usecase.return_borrowing(&requester, borrowing_id).await.unwrap();

        assert_eq!(outcome.borrowing.book.inventory, 1);
        assert!(outcome.payment.is_none());
    }

    #[tokio::test]
    async fn staff_return_bills_the_fine_to_the_borrower() {
        let staff = fixtures::requester(true);
        let borrower = Uuid::new_v4();
        let book = fixtures::book(3, dec!(1.50));
        let borrow_date = Utc::now() - Duration::days(10);
        let borrowing = fixtures::borrowing(
            &book,
            borrower,
            borrow_date,
            borrow_date + Duration::days(7),
            None,
        );
        let borrowing_id = borrowing.id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        let (found, shelf) = (borrowing.clone(), book.clone());
        borrowing_repo
            .expect_find_borrowing()
            .returning(move |_| Ok(Some((found.clone(), shelf.clone()))));
        borrowing_repo
            .expect_return_borrowing()
            .times(1)
            .returning(move |_, returned_at, fine| {
                let returned = BorrowingEntity {
                    actual_return_date: Some(returned_at),
                    ..borrowing.clone()
                };
                let fine_row = fine.map(|charge| {
                    fixtures::payment(
                        returned.id,
                        charge.payment_type,
                        PaymentStatus::Pending,
                        None,
                        charge.money_to_pay,
                    )
                });
                Ok(Some((returned, book.clone(), fine_row)))
            });

        let expected_description = format!("User '{borrower}' book 'Dune' for '3' days.");
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_session()
            .withf(move |request| request.description == expected_description)
            .times(1)
            .returning(|_| {
                Ok(CheckoutSession {
                    session_id: "cs_test_staff".to_string(),
                    session_url: "https://checkout.stripe.com/c/pay/cs_test_staff".to_string(),
                })
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_upsert_session()
            .times(1)
            .returning(|entity| Ok(fixtures::upserted(entity)));

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            payment_repo,
            gateway,
            MockNotificationSink::new(),
        );

        let outcome = usecase.return_borrowing(&staff, borrowing_id).await.unwrap();

        let fine = outcome.payment.unwrap();
        assert_eq!(fine.money_to_pay, dec!(9.00));
        assert_eq!(fine.session_id.as_deref(), Some("cs_test_staff"));
    }

    #[tokio::test]
    async fn borrow_then_return_puts_the_copy_back() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(10, dec!(1.50));
        let shelf = Arc::new(Mutex::new(book.clone()));
        let ledger: Arc<Mutex<Option<BorrowingEntity>>> = Arc::new(Mutex::new(None));

        let mut book_repo = MockBookRepository::new();
        let books = Arc::clone(&shelf);
        book_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(books.lock().unwrap().clone())));

        let mut borrowing_repo = MockBorrowingRepository::new();
        let (books, rows) = (Arc::clone(&shelf), Arc::clone(&ledger));
        borrowing_repo
            .expect_create_borrowing()
            .times(1)
            .returning(move |entity, charge| {
                let mut book = books.lock().unwrap();
                let (borrowing, taken, payment) = created_rows(&book, entity, charge);
                *book = taken.clone();
                *rows.lock().unwrap() = Some(borrowing.clone());
                Ok(Some((borrowing, taken, payment)))
            });
        let (books, rows) = (Arc::clone(&shelf), Arc::clone(&ledger));
        borrowing_repo.expect_find_borrowing().returning(move |id| {
            let row = rows.lock().unwrap().clone().filter(|row| row.id == id);
            Ok(row.map(|row| (row, books.lock().unwrap().clone())))
        });
        let (books, rows) = (Arc::clone(&shelf), Arc::clone(&ledger));
        borrowing_repo
            .expect_return_borrowing()
            .withf(|_, _, fine| fine.is_none())
            .times(1)
            .returning(move |id, returned_at, _| {
                let mut stored = rows.lock().unwrap();
                let Some(row) = stored
                    .as_mut()
                    .filter(|row| row.id == id && row.actual_return_date.is_none())
                else {
                    return Ok(None);
                };
                row.actual_return_date = Some(returned_at);
                let mut book = books.lock().unwrap();
                book.inventory += 1;
                Ok(Some((row.clone(), book.clone(), None)))
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_outstanding_for_user()
            .returning(|_| Ok(None));
        payment_repo
            .expect_upsert_session()
            .times(1)
            .returning(|entity| Ok(fixtures::upserted(entity)));

        let usecase = usecase(
            borrowing_repo,
            book_repo,
            payment_repo,
            gateway_returning("cs_test_trip"),
            accepting_notifier(),
        );

        let borrowed = usecase
            .create_borrowing(
                &requester,
                CreateBorrowingRequest {
                    book_id: book.id,
                    expected_return_date: Utc::now() + Duration::days(14),
                },
            )
            .await
            .unwrap();
        assert_eq!(borrowed.borrowing.book.inventory, 9);
        assert_eq!(shelf.lock().unwrap().inventory, 9);

        let returned = usecase
            .return_borrowing(&requester, borrowed.borrowing.id)
            .await
            .unwrap();

        assert_eq!(returned.borrowing.id, borrowed.borrowing.id);
        assert_eq!(returned.borrowing.book.inventory, book.inventory);
        assert_eq!(shelf.lock().unwrap().inventory, 10);
        assert!(returned.payment.is_none());
    }

    #[tokio::test]
    async fn second_return_reports_the_first_return_date() {
        let requester = fixtures::requester(false);
        let book = fixtures::book(5, dec!(1.50));
        let borrow_date = Utc::now() - Duration::days(5);
        let returned_at = borrow_date + Duration::days(2);
        let borrowing = fixtures::borrowing(
            &book,
            requester.user_id,
            borrow_date,
            borrow_date + Duration::days(4),
            Some(returned_at),
        );
        let borrowing_id = borrowing.id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo
            .expect_find_borrowing()
            .returning(move |_| Ok(Some((borrowing.clone(), book.clone()))));
        borrowing_repo.expect_return_borrowing().never();

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        match usecase.return_borrowing(&requester, borrowing_id).await {
            Err(BorrowingError::AlreadyReturned { returned_at: first }) => {
                assert_eq!(first, returned_at)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn borrowing_detail_is_scoped_to_owner_unless_staff() {
        let owner = Uuid::new_v4();
        let book = fixtures::book(5, dec!(1.50));
        let now = Utc::now();
        let borrowing = fixtures::borrowing(&book, owner, now, now + Duration::days(2), None);
        let borrowing_id = borrowing.id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo
            .expect_find_borrowing()
            .with(eq(borrowing_id))
            .returning(move |_| Ok(Some((borrowing.clone(), book.clone()))));

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        assert!(matches!(
            usecase
                .get_borrowing(&fixtures::requester(false), borrowing_id)
                .await,
            Err(BorrowingError::BorrowingNotFound)
        ));

        let found = usecase
            .get_borrowing(&fixtures::requester(true), borrowing_id)
            .await
            .unwrap();
        assert_eq!(found.user_id, owner);
    }

    #[tokio::test]
    async fn members_cannot_list_other_users_borrowings() {
        let requester = fixtures::requester(false);
        let own_id = requester.user_id;

        let mut borrowing_repo = MockBorrowingRepository::new();
        borrowing_repo
            .expect_list_borrowings()
            .withf(move |filter| filter.user_id == Some(own_id) && filter.is_active == Some(true))
            .times(1)
            .returning(|_| Ok(vec![]));

        let usecase = usecase(
            borrowing_repo,
            MockBookRepository::new(),
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
            MockNotificationSink::new(),
        );

        let listed = usecase
            .list_borrowings(
                &requester,
                ListBorrowingsFilter {
                    is_active: Some(true),
                    user_id: Some(Uuid::new_v4()),
                },
            )
            .await
            .unwrap();

        assert!(listed.is_empty());
    }
}
