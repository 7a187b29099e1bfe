pub mod books;
pub mod borrowings;
pub mod enums;
pub mod iam;
pub mod payments;
